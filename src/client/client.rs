use crate::client::config::ClientConfig;
use crate::client::PushTarget;
use crate::connection::{Session, SessionContext, TcpTransport, Transport};
use crate::stream::MediaHost;
use crate::utils::Shutdown;
use crate::{Error, Result};
use log::{debug, info};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Pushes a local stream to a remote RTMP server
pub struct PushClient {
    config: ClientConfig,
    target: PushTarget,
}

impl PushClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let target = PushTarget::parse(&config.target, &config.stream_name)?;
        Ok(PushClient { config, target })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn target(&self) -> &PushTarget {
        &self.target
    }

    /// Open the TCP (or TLS) connection to the target
    pub async fn connect(&self) -> Result<TcpTransport> {
        let addr = format!("{}:{}", self.target.host, self.target.port);
        debug!("Connecting to {}", addr);

        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Error::transport(format!("Failed to connect to {}: {}", addr, e))),
            Err(_) => return Err(Error::timeout(format!("Connecting to {} timed out", addr))),
        };
        stream.set_nodelay(true)?;

        if self.target.secure {
            TcpTransport::connect_tls(stream, &self.target.host).await
        } else {
            Ok(TcpTransport::new(stream))
        }
    }

    /// Connect and push until the source ends, the server goes away or
    /// shutdown fires. Returns the host for reuse.
    pub async fn push<H: MediaHost>(&self, host: H, shutdown: Shutdown) -> Result<H> {
        let transport = self.connect().await?;
        self.push_over(Box::new(transport), host, shutdown).await
    }

    /// Push over an already connected transport
    pub async fn push_over<H: MediaHost>(
        &self,
        transport: Box<dyn Transport>,
        mut host: H,
        shutdown: Shutdown,
    ) -> Result<H> {
        if !host.select_stream(&self.config.stream_name) {
            return Err(Error::command(format!(
                "Stream '{}' is not available for pushing",
                self.config.stream_name
            )));
        }

        let context = SessionContext::pusher(
            self.target.host.as_str(),
            self.target.app.as_str(),
            self.target.tc_url.as_str(),
            self.config.stream_name.as_str(),
            self.target.stream_out.as_str(),
        );
        info!(
            "Pushing '{}' to {} as '{}'",
            self.config.stream_name, self.target.tc_url, self.target.stream_out
        );

        let mut session = Session::new(transport, host, self.config.session_config(), context, shutdown);
        session.run().await?;
        Ok(session.into_host())
    }
}
