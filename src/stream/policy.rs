use ipnet::IpNet;
use log::debug;
use std::net::IpAddr;

/// Which peers may publish. An empty allow list admits everyone.
#[derive(Debug, Clone, Default)]
pub struct PushPolicy {
    allowed: Vec<IpNet>,
}

impl PushPolicy {
    pub fn new(allowed: Vec<IpNet>) -> Self {
        PushPolicy { allowed }
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn allows(&self, client_host: &str) -> bool {
        if self.allowed.is_empty() {
            return true;
        }

        match client_host.parse::<IpAddr>() {
            Ok(addr) => self.allowed.iter().any(|net| net.contains(&addr)),
            Err(_) => {
                debug!("Cannot parse publisher address '{}'", client_host);
                false
            }
        }
    }
}
