use crate::{Error, Result};
use tokio::net::TcpListener;

mod server;
mod config;
mod context;

pub use server::RtmpServer;
pub use config::{ServerConfig, ServerConfigBuilder};
pub use context::ServerContext;

/// Bind the listening socket with SO_REUSEADDR
pub async fn bind_server(config: &ServerConfig) -> Result<TcpListener> {
    let addr = config.bind_address();

    let socket = match addr.parse::<std::net::SocketAddr>() {
        Ok(addr) => {
            let socket = if addr.is_ipv4() {
                tokio::net::TcpSocket::new_v4()?
            } else {
                tokio::net::TcpSocket::new_v6()?
            };

            socket.set_reuseaddr(true)?;
            socket.bind(addr)?;
            socket
        }
        Err(e) => {
            return Err(Error::config(format!("Invalid address {}: {}", addr, e)));
        }
    };

    Ok(socket.listen(1024)?)
}
