use crate::connection::Role;
use crate::protocol::{DEFAULT_WINDOW_SIZE, NEGOTIATED_CHUNK_SIZE};
use std::collections::HashMap;
use std::time::Duration;

/// Which directions a listener serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acceptable {
    /// Publishers and players
    #[default]
    Both,
    /// Players only; incoming pushes are rejected
    OutgoingOnly,
    /// Publishers only; playback is rejected
    IncomingOnly,
}

impl Acceptable {
    /// Map the numeric connector setting (0, 1, 2)
    pub fn from_setting(value: u8) -> Self {
        match value {
            1 => Acceptable::OutgoingOnly,
            2 => Acceptable::IncomingOnly,
            _ => Acceptable::Both,
        }
    }

    pub fn allows_publish(&self) -> bool {
        *self != Acceptable::OutgoingOnly
    }

    pub fn allows_play(&self) -> bool {
        *self != Acceptable::IncomingOnly
    }
}

/// Settings a session runs with, derived from the server or client config
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub acceptable: Acceptable,

    /// Inbound rate ceiling in kilobits per second, 0 for none
    pub max_kbps: u64,

    /// Chunk size announced after `connect` and `play`
    pub chunk_size: u32,

    /// Window acknowledgement size announced after `connect`
    pub window_ack_size: u32,

    /// Peer bandwidth announced after `connect`
    pub peer_bandwidth: u32,

    pub handshake_timeout: Duration,

    /// How often playback data is pulled from the host
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            acceptable: Acceptable::Both,
            max_kbps: 0,
            chunk_size: NEGOTIATED_CHUNK_SIZE,
            window_ack_size: DEFAULT_WINDOW_SIZE,
            peer_bandwidth: DEFAULT_WINDOW_SIZE,
            handshake_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl SessionConfig {
    /// Inbound byte rate above which the session slows down
    pub fn max_bytes_per_sec(&self) -> Option<u64> {
        (self.max_kbps > 0).then(|| self.max_kbps * 128)
    }
}

/// What a session learned about its peer and stream
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub role: Role,

    /// Application path from `tcUrl` (or the `app` property)
    pub app_name: String,

    /// URL the peer connected to, extended with the stream name on publish/play
    pub request_url: String,

    pub flash_version: String,

    /// Object encoding announced in `connect`, echoed in the reply
    pub object_encoding: f64,

    /// Local stream name
    pub stream_name: String,

    /// Stream name on the remote server when pushing
    pub stream_out: String,

    /// Query parameters of a `play` request
    pub target_params: HashMap<String, String>,

    pub client_host: String,

    /// Push chain already issued
    pub push_started: bool,
}

impl SessionContext {
    fn new(role: Role, client_host: impl Into<String>) -> Self {
        SessionContext {
            role,
            app_name: String::new(),
            request_url: String::new(),
            flash_version: String::new(),
            object_encoding: 0.0,
            stream_name: String::new(),
            stream_out: String::new(),
            target_params: HashMap::new(),
            client_host: client_host.into(),
            push_started: false,
        }
    }

    /// Context of an accepted connection
    pub fn listener(client_host: impl Into<String>) -> Self {
        Self::new(Role::Listener, client_host)
    }

    /// Context of an outgoing push of `stream_name` to `app`/`stream_out`
    pub fn pusher(
        server_host: impl Into<String>,
        app_name: impl Into<String>,
        tc_url: impl Into<String>,
        stream_name: impl Into<String>,
        stream_out: impl Into<String>,
    ) -> Self {
        SessionContext {
            app_name: app_name.into(),
            request_url: tc_url.into(),
            stream_name: stream_name.into(),
            stream_out: stream_out.into(),
            ..Self::new(Role::Pusher, server_host)
        }
    }

    pub fn is_pusher(&self) -> bool {
        self.role == Role::Pusher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptable_modes() {
        assert_eq!(Acceptable::from_setting(0), Acceptable::Both);
        assert!(!Acceptable::from_setting(1).allows_publish());
        assert!(Acceptable::from_setting(1).allows_play());
        assert!(!Acceptable::from_setting(2).allows_play());
        assert!(Acceptable::from_setting(2).allows_publish());
    }

    #[test]
    fn test_rate_limit() {
        let mut config = SessionConfig::default();
        assert_eq!(config.max_bytes_per_sec(), None);
        config.max_kbps = 1000;
        assert_eq!(config.max_bytes_per_sec(), Some(128_000));
    }
}
