mod utils;
mod amf;
mod protocol;
mod handshake;
mod chunk;
mod connection;
mod server;
mod client;
mod handlers;
mod stream;
mod processing;

// Re-export commonly used types at crate root
pub use utils::*;
pub use amf::*;
pub use protocol::*;
pub use connection::*;
pub use chunk::*;
pub use handshake::*;
pub use handlers::*;

// Server exports
pub use server::{bind_server, RtmpServer, ServerConfig, ServerConfigBuilder, ServerContext};

// Client exports
pub use client::{ClientConfig, ClientConfigBuilder, PushClient, PushTarget};

// Stream exports
pub use stream::*;

// Processing exports
pub use processing::*;
