// Push Relay Example
//
// Runs a local server and pushes one of its streams on to another RTMP
// server as soon as it is being published.
//
// Usage:
//   cargo run --example push_relay -- <stream> <rtmp://remote/app/name>

use log::{error, info, warn};
use rtmp::{
    ClientConfig, Error, MemoryHost, MemoryHostFactory, PushClient, PushPolicy, Result, RtmpServer, ServerConfig,
    ShutdownHandle, StreamRegistry,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(stream), Some(target)) = (args.next(), args.next()) else {
        return Err(Error::config("usage: push_relay <stream> <rtmp://remote/app/name>"));
    };

    let registry = Arc::new(StreamRegistry::new());
    let (shutdown, signal) = ShutdownHandle::new();

    let config = ServerConfig::builder().port(1935).build()?;
    let server = RtmpServer::new(
        config,
        MemoryHostFactory::new(registry.clone(), PushPolicy::allow_all()),
        shutdown.subscribe(),
    );
    tokio::spawn(async move {
        if let Err(e) = server.listen().await {
            error!("Server failed: {}", e);
        }
    });

    let client = PushClient::new(ClientConfig::builder().target(target).stream_name(stream.as_str()).build()?)?;
    info!("Waiting for '{}' to be published", stream);
    while !registry.is_publishing(&stream) {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping");
            shutdown.trigger();
        }
    });

    let host = MemoryHost::new(registry, PushPolicy::allow_all());
    match client.push(host, signal).await {
        Ok(_) => info!("Push of '{}' ended", stream),
        Err(e) => warn!("Push of '{}' failed: {}", stream, e),
    }
    Ok(())
}
