use crate::client::PushTarget;
use crate::connection::SessionConfig;
use crate::protocol::NEGOTIATED_CHUNK_SIZE;
use crate::{Error, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `rtmp://` or `rtmps://` URL to push to
    pub target: String,

    /// Local stream to push; also the remote name when the URL has none
    pub stream_name: String,

    pub connect_timeout: Duration,

    pub handshake_timeout: Duration,

    /// Chunk size announced after `connect`
    pub chunk_size: u32,

    /// Inbound rate ceiling in kbps, 0 for none
    pub max_kbps: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            target: String::new(),
            stream_name: String::new(),
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            chunk_size: NEGOTIATED_CHUNK_SIZE,
            max_kbps: 0,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream_name.is_empty() {
            return Err(Error::config("Missing local stream name"));
        }

        PushTarget::parse(&self.target, &self.stream_name)?;

        if self.chunk_size < 128 {
            return Err(Error::config("Chunk size must be at least 128"));
        }

        if self.chunk_size > NEGOTIATED_CHUNK_SIZE {
            return Err(Error::config("Chunk size must not exceed 65536"));
        }

        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_kbps: self.max_kbps,
            chunk_size: self.chunk_size,
            handshake_timeout: self.handshake_timeout,
            ..SessionConfig::default()
        }
    }
}

pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        ClientConfigBuilder {
            config: ClientConfig::default(),
        }
    }

    pub fn target(mut self, url: impl Into<String>) -> Self {
        self.config.target = url.into();
        self
    }

    pub fn stream_name(mut self, name: impl Into<String>) -> Self {
        self.config.stream_name = name.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn chunk_size(mut self, size: u32) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn max_kbps(mut self, kbps: u64) -> Self {
        self.config.max_kbps = kbps;
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_validates() {
        let config = ClientConfig::builder()
            .target("rtmp://example.com/live/out")
            .stream_name("cam")
            .max_kbps(500)
            .build()
            .unwrap();
        assert_eq!(config.session_config().chunk_size, 65536);
        assert_eq!(config.session_config().max_bytes_per_sec(), Some(64_000));

        assert!(ClientConfig::builder().target("rtmp://example.com/live").build().is_err());
        assert!(ClientConfig::builder()
            .target("srt://example.com/live")
            .stream_name("cam")
            .build()
            .is_err());
        assert!(ClientConfig::builder()
            .target("rtmp://example.com/live")
            .stream_name("cam")
            .chunk_size(100)
            .build()
            .is_err());
    }
}
