use crate::connection::{Session, TcpTransport};
use crate::server::bind_server;
use crate::server::config::ServerConfig;
use crate::server::context::ServerContext;
use crate::stream::HostFactory;
use crate::utils::Shutdown;
use crate::Result;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Accepts RTMP connections and runs a listener session for each one
pub struct RtmpServer<F: HostFactory> {
    config: Arc<ServerConfig>,
    context: Arc<ServerContext>,
    factory: Arc<F>,
    shutdown: Shutdown,
}

impl<F: HostFactory> RtmpServer<F> {
    pub fn new(config: ServerConfig, factory: F, shutdown: Shutdown) -> Self {
        let config = Arc::new(config);
        let context = Arc::new(ServerContext::new(config.clone()));

        RtmpServer {
            config,
            context,
            factory: Arc::new(factory),
            shutdown,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn context(&self) -> Arc<ServerContext> {
        self.context.clone()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Bind the configured address and serve until shutdown
    pub async fn listen(&self) -> Result<()> {
        let listener = bind_server(&self.config).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        info!("RTMP server listening on {}", local);

        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.handle_connection(stream, peer).await,
                        Err(e) => warn!("Accept error: {}", e),
                    }
                }
                _ = shutdown.triggered() => break,
            }
        }

        info!("RTMP server on {} stopped", local);
        Ok(())
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let ip = peer.ip();
        if !self.context.try_admit(ip).await {
            warn!("Connection limit reached, rejecting {}", peer);
            return;
        }

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
        }
        debug!("New connection from {}", peer);

        let transport = Box::new(TcpTransport::new(stream));
        let host = self.factory.create_host();
        let mut session = Session::listener(transport, host, self.config.session_config(), self.shutdown.clone());
        let context = self.context.clone();

        tokio::spawn(async move {
            if let Err(e) = session.run().await {
                debug!("Session {} from {} failed: {}", session.id(), peer, e);
            }
            context.release(ip).await;
            debug!("Connection from {} closed", peer);
        });
    }
}
