mod client;
mod config;
mod target;

pub use client::PushClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use target::PushTarget;
