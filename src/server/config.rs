use crate::connection::{Acceptable, SessionConfig};
use crate::protocol::{DEFAULT_PORT, DEFAULT_WINDOW_SIZE, NEGOTIATED_CHUNK_SIZE};
use crate::stream::PushPolicy;
use crate::{Error, Result};
use ipnet::IpNet;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    pub max_connections: usize,

    pub max_connections_per_ip: usize,

    /// Directions this listener serves
    pub acceptable: Acceptable,

    /// Inbound rate ceiling per connection in kbps, 0 for none
    pub max_kbps: u64,

    /// Chunk size announced after `connect`
    pub chunk_size: u32,

    /// Window acknowledgement size
    pub window_ack_size: u32,

    /// Peer bandwidth
    pub peer_bandwidth: u32,

    pub handshake_timeout: Duration,

    /// Networks allowed to publish; empty allows everyone
    pub allowed_publishers: Vec<IpNet>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connections: 1000,
            max_connections_per_ip: 10,
            acceptable: Acceptable::Both,
            max_kbps: 0,
            chunk_size: NEGOTIATED_CHUNK_SIZE,
            window_ack_size: DEFAULT_WINDOW_SIZE,
            peer_bandwidth: DEFAULT_WINDOW_SIZE,
            handshake_timeout: Duration::from_secs(10),
            allowed_publishers: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::config("Invalid max_connections: 0"));
        }

        if self.max_connections_per_ip == 0 {
            return Err(Error::config("Invalid max_connections_per_ip: 0"));
        }

        if self.chunk_size < 128 {
            return Err(Error::config("Chunk size must be at least 128"));
        }

        if self.chunk_size > NEGOTIATED_CHUNK_SIZE {
            return Err(Error::config("Chunk size must not exceed 65536"));
        }

        if self.window_ack_size == 0 || self.peer_bandwidth == 0 {
            return Err(Error::config("Window sizes must be non-zero"));
        }

        if self.handshake_timeout.is_zero() {
            return Err(Error::config("Handshake timeout must be non-zero"));
        }

        Ok(())
    }

    /// Address to bind, as `host:port`
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Settings handed to each accepted session
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            acceptable: self.acceptable,
            max_kbps: self.max_kbps,
            chunk_size: self.chunk_size,
            window_ack_size: self.window_ack_size,
            peer_bandwidth: self.peer_bandwidth,
            handshake_timeout: self.handshake_timeout,
            ..SessionConfig::default()
        }
    }

    pub fn push_policy(&self) -> PushPolicy {
        PushPolicy::new(self.allowed_publishers.clone())
    }
}

pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        ServerConfigBuilder {
            config: ServerConfig::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Port 0 binds an ephemeral port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn max_connections_per_ip(mut self, max: usize) -> Self {
        self.config.max_connections_per_ip = max;
        self
    }

    pub fn acceptable(mut self, acceptable: Acceptable) -> Self {
        self.config.acceptable = acceptable;
        self
    }

    pub fn max_kbps(mut self, kbps: u64) -> Self {
        self.config.max_kbps = kbps;
        self
    }

    pub fn chunk_size(mut self, size: u32) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn window_ack_size(mut self, size: u32) -> Self {
        self.config.window_ack_size = size;
        self
    }

    pub fn peer_bandwidth(mut self, size: u32) -> Self {
        self.config.peer_bandwidth = size;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn allow_publisher(mut self, network: IpNet) -> Self {
        self.config.allowed_publishers.push(network);
        self
    }

    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::builder().build().unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:1935");

        let session = config.session_config();
        assert_eq!(session.chunk_size, 65536);
        assert_eq!(session.window_ack_size, 5_000_000);
        assert_eq!(session.max_bytes_per_sec(), None);
    }

    #[test]
    fn test_validation() {
        assert!(ServerConfig::builder().chunk_size(64).build().is_err());
        assert!(ServerConfig::builder().chunk_size(1 << 20).build().is_err());
        assert!(ServerConfig::builder().max_connections(0).build().is_err());
        assert!(matches!(
            ServerConfig::builder().handshake_timeout(Duration::ZERO).build(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_session_settings_follow_server() {
        let config = ServerConfig::builder()
            .host("::1")
            .port(19350)
            .acceptable(Acceptable::IncomingOnly)
            .max_kbps(100)
            .allow_publisher("10.0.0.0/8".parse().unwrap())
            .build()
            .unwrap();

        assert_eq!(config.bind_address(), "[::1]:19350");
        let session = config.session_config();
        assert_eq!(session.acceptable, Acceptable::IncomingOnly);
        assert_eq!(session.max_bytes_per_sec(), Some(12_800));
        assert!(config.push_policy().allows("10.1.2.3"));
        assert!(!config.push_policy().allows("192.168.1.1"));
    }
}
