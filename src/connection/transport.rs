use crate::{Error, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector;

/// Byte pipe a session runs over
#[async_trait]
pub trait Transport: Send {
    /// Write a whole frame; returns once every byte is handed to the OS
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Append available bytes to `buffer`, returning how many arrived.
    /// Zero means the peer closed the connection.
    async fn receive(&mut self, buffer: &mut Vec<u8>) -> Result<usize>;

    fn is_connected(&self) -> bool;

    /// Host (IP address) of the remote end
    fn peer_host(&self) -> String;

    async fn close(&mut self) -> Result<()>;
}

trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for S {}

/// TCP transport, optionally wrapped in TLS for `rtmps`
pub struct TcpTransport {
    stream: Box<dyn AsyncStream>,
    peer_host: String,
    connected: bool,
    read_buffer: Vec<u8>,
}

impl TcpTransport {
    /// Wrap an accepted or connected TCP stream
    pub fn new(stream: TcpStream) -> Self {
        let peer_host = stream
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default();
        Self::from_stream(Box::new(stream), peer_host)
    }

    /// Run a TLS client handshake on `stream` for `domain`
    pub async fn connect_tls(stream: TcpStream, domain: &str) -> Result<Self> {
        let peer_host = stream
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default();
        let connector = TlsConnector::from(native_tls::TlsConnector::new()?);
        let tls = connector.connect(domain, stream).await?;
        Ok(Self::from_stream(Box::new(tls), peer_host))
    }

    /// Wrap any async byte stream, e.g. one half of `tokio::io::duplex`
    pub fn from_io<S>(stream: S, peer_host: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::from_stream(Box::new(stream), peer_host.into())
    }

    fn from_stream(stream: Box<dyn AsyncStream>, peer_host: String) -> Self {
        TcpTransport {
            stream,
            peer_host,
            connected: true,
            read_buffer: vec![0u8; 64 * 1024],
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let result = async {
            self.stream.write_all(data).await?;
            self.stream.flush().await
        }
        .await;

        result.map_err(|e| {
            self.connected = false;
            Error::transport(format!("Failed to write to {}: {}", self.peer_host, e))
        })
    }

    async fn receive(&mut self, buffer: &mut Vec<u8>) -> Result<usize> {
        let n = self.stream.read(&mut self.read_buffer).await.map_err(|e| {
            self.connected = false;
            Error::transport(format!("Failed to read from {}: {}", self.peer_host, e))
        })?;
        if n == 0 {
            self.connected = false;
        }
        buffer.extend_from_slice(&self.read_buffer[..n]);
        Ok(n)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn peer_host(&self) -> String {
        self.peer_host.clone()
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.stream.shutdown().await?;
        Ok(())
    }
}
