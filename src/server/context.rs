use crate::server::config::ServerConfig;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// State shared by the accept loop and the session tasks it spawns
pub struct ServerContext {
    config: Arc<ServerConfig>,

    accepted: AtomicU64,
    active: AtomicUsize,

    /// Open connections per peer address
    ip_counts: RwLock<HashMap<IpAddr, usize>>,
}

impl ServerContext {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        ServerContext {
            config,
            accepted: AtomicU64::new(0),
            active: AtomicUsize::new(0),
            ip_counts: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Connections accepted since start
    pub fn accepted_count(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Sessions currently running
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Reserve a slot for a connection from `ip`. Returns false when either
    /// the global or the per-address limit is reached.
    pub async fn try_admit(&self, ip: IpAddr) -> bool {
        let mut counts = self.ip_counts.write().await;
        let count = counts.get(&ip).copied().unwrap_or(0);
        if count >= self.config.max_connections_per_ip
            || self.active.load(Ordering::SeqCst) >= self.config.max_connections
        {
            return false;
        }

        *counts.entry(ip).or_insert(0) += 1;
        self.active.fetch_add(1, Ordering::SeqCst);
        self.accepted.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Give back the slot taken by `try_admit`
    pub async fn release(&self, ip: IpAddr) {
        let mut counts = self.ip_counts.write().await;
        if let Some(count) = counts.get_mut(&ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&ip);
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub async fn connections_from(&self, ip: IpAddr) -> usize {
        self.ip_counts.read().await.get(&ip).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_per_ip_limit() {
        let config = ServerConfig::builder().max_connections_per_ip(2).build().unwrap();
        let context = ServerContext::new(Arc::new(config));
        let ip: IpAddr = "192.0.2.7".parse().unwrap();

        assert!(context.try_admit(ip).await);
        assert!(context.try_admit(ip).await);
        assert!(!context.try_admit(ip).await);
        assert!(context.try_admit("192.0.2.8".parse().unwrap()).await);
        assert_eq!(context.active_count(), 3);

        context.release(ip).await;
        assert_eq!(context.connections_from(ip).await, 1);
        assert!(context.try_admit(ip).await);
        assert_eq!(context.accepted_count(), 4);
    }

    #[tokio::test]
    async fn test_global_limit() {
        let config = ServerConfig::builder().max_connections(1).build().unwrap();
        let context = ServerContext::new(Arc::new(config));

        assert!(context.try_admit("192.0.2.1".parse().unwrap()).await);
        assert!(!context.try_admit("192.0.2.2".parse().unwrap()).await);
    }
}
