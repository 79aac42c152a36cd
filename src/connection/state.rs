/// Session lifecycle. Commands that arrive in an unexpected state are
/// logged and processed anyway, so transitions are advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Performing handshake
    Handshaking,

    /// Handshake done, waiting for `connect`
    Idle,

    /// `connect` accepted
    Connected,

    /// Receiving media from the peer
    Publishing,

    /// Sending media to the peer
    Playing,

    /// Connection closing
    Closing,

    /// Connection closed
    Closed,
}

impl SessionState {
    /// Check if past `connect`
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            SessionState::Connected | SessionState::Publishing | SessionState::Playing
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Closing | SessionState::Closed)
    }

    /// Whether `next` is an expected successor
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (*self, next) {
            (SessionState::Handshaking, SessionState::Idle) => true,
            (SessionState::Idle, SessionState::Connected) => true,
            (SessionState::Connected, SessionState::Publishing) => true,
            (SessionState::Connected, SessionState::Playing) => true,
            (SessionState::Playing, SessionState::Playing) => true,
            (SessionState::Publishing, SessionState::Connected) => true,
            (SessionState::Playing, SessionState::Connected) => true,
            (_, SessionState::Closing) => true,
            (SessionState::Closing, SessionState::Closed) => true,
            _ => false,
        }
    }
}

/// Which side opened the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepted by the server; the peer publishes or plays
    Listener,

    /// Opened by us to push a stream to a remote server
    Pusher,
}
