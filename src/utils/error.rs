use std::io::Error as IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// Zero message type, malformed chunk header, broken control payload
    #[error("Protocol corruption: {0}")]
    ProtocolCorruption(String),

    /// Inbound media went backwards or jumped too far ahead
    #[error("Timestamp violation: {0}")]
    TimestampViolation(String),

    /// Publish or play refused by configuration or a policy hook
    #[error("Policy rejection: {0}")]
    PolicyRejection(String),

    #[error("Handshake error: {0}")]
    Handshake(String),

    /// Unknown or malformed AMF command
    #[error("Command error: {0}")]
    Command(String),

    /// Peer closed or could not be reached
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("AMF decode error: {0}")]
    AmfDecode(String),

    #[error("AMF encode error: {0}")]
    AmfEncode(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a protocol corruption error
    pub fn protocol_corruption(msg: impl Into<String>) -> Self {
        Error::ProtocolCorruption(msg.into())
    }

    /// Create a timestamp violation error
    pub fn timestamp_violation(msg: impl Into<String>) -> Self {
        Error::TimestampViolation(msg.into())
    }

    /// Create a policy rejection error
    pub fn policy_rejection(msg: impl Into<String>) -> Self {
        Error::PolicyRejection(msg.into())
    }

    /// Create a handshake error
    pub fn handshake(msg: impl Into<String>) -> Self {
        Error::Handshake(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Error::Command(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// Create an AMF decode error
    pub fn amf_decode(msg: impl Into<String>) -> Self {
        Error::AmfDecode(msg.into())
    }

    /// Create an AMF encode error
    pub fn amf_encode(msg: impl Into<String>) -> Self {
        Error::AmfEncode(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Errors that end a session quietly, without an error log line.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Cancelled | Error::Timeout(_) | Error::Io(_)
        )
    }

    /// Errors that abort the session after the farewell sequence.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ProtocolCorruption(_) | Error::TimestampViolation(_)
        )
    }
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::protocol_corruption("zero message type");
        assert_eq!(format!("{}", err), "Protocol corruption: zero message type");

        let err = Error::handshake("Version mismatch");
        assert_eq!(format!("{}", err), "Handshake error: Version mismatch");
    }

    #[test]
    fn test_error_conversion() {
        use std::io::{Error as IoError, ErrorKind};

        let io_err = IoError::new(ErrorKind::UnexpectedEof, "EOF");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => assert!(err.is_silent()),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::timestamp_violation("rewind").is_fatal());
        assert!(Error::protocol_corruption("bad header").is_fatal());
        assert!(!Error::command("unknown").is_fatal());
        assert!(Error::Cancelled.is_silent());
        assert!(Error::transport("closed").is_silent());
        assert!(!Error::policy_rejection("no").is_silent());
    }
}
