// Simple RTMP Server Example
//
// Publishers push into an in-memory stream registry; players on the same
// server play those streams back.
//
// Usage:
//   cargo run --example simple_server
//   ffmpeg -re -i input.flv -c copy -f flv rtmp://127.0.0.1/live/demo
//   ffplay rtmp://127.0.0.1/live/demo

use log::{error, info};
use rtmp::{MemoryHostFactory, Result, RtmpServer, ServerConfig, ShutdownHandle, StreamRegistry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = ServerConfig::builder()
        .host("0.0.0.0")
        .port(1935)
        .max_connections(100)
        .build()?;

    info!("Starting RTMP server on {}", config.bind_address());
    info!("  - Max connections: {}", config.max_connections);
    info!("  - Chunk size: {}", config.chunk_size);
    info!("  - Acceptable: {:?}", config.acceptable);

    let registry = Arc::new(StreamRegistry::new());
    let factory = MemoryHostFactory::new(registry, config.push_policy());
    let (shutdown, signal) = ShutdownHandle::new();
    let server = RtmpServer::new(config, factory, signal);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down server...");
                shutdown.trigger();
            }
            Err(err) => error!("Error setting up signal handler: {}", err),
        }
    });

    info!("Press Ctrl+C to stop");
    server.listen().await?;

    info!("Server stopped");
    Ok(())
}
