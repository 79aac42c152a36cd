use crate::connection::Transport;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MemoryInner {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<u8>,
    closed: bool,
}

/// In-memory transport. Clones share the same pipe, so a test can keep one
/// handle to feed input and inspect output while a session owns another.
/// Once the queued input runs out the transport reports the peer as gone.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryInner>>,
    peer_host: String,
}

impl MemoryTransport {
    pub fn new(peer_host: impl Into<String>) -> Self {
        MemoryTransport {
            inner: Arc::new(Mutex::new(MemoryInner::default())),
            peer_host: peer_host.into(),
        }
    }

    /// Queue bytes for the session to receive
    pub fn push_inbound(&self, data: impl Into<Vec<u8>>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.inbound.push_back(data.into());
        }
    }

    /// Everything the session sent so far
    pub fn sent(&self) -> Vec<u8> {
        self.inner.lock().map(|inner| inner.sent.clone()).unwrap_or_default()
    }

    /// Drain the sent bytes
    pub fn take_sent(&self) -> Vec<u8> {
        self.inner
            .lock()
            .map(|mut inner| std::mem::take(&mut inner.sent))
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().map(|inner| inner.closed).unwrap_or(true)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| Error::transport("Memory transport poisoned"))?;
        if inner.closed {
            return Err(Error::transport("Memory transport closed"));
        }
        inner.sent.extend_from_slice(data);
        Ok(())
    }

    async fn receive(&mut self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| Error::transport("Memory transport poisoned"))?;
        match inner.inbound.pop_front() {
            Some(data) if !inner.closed => {
                buffer.extend_from_slice(&data);
                Ok(data.len())
            }
            _ => {
                inner.closed = true;
                Ok(0)
            }
        }
    }

    fn is_connected(&self) -> bool {
        !self.is_closed()
    }

    fn peer_host(&self) -> String {
        self.peer_host.clone()
    }

    async fn close(&mut self) -> Result<()> {
        if let Ok(mut inner) = self.inner.lock() {
            inner.closed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_transport_round_trip() {
        let handle = MemoryTransport::new("10.0.0.1");
        let mut transport = handle.clone();
        handle.push_inbound(vec![1, 2, 3]);

        let mut buffer = vec![0];
        assert_eq!(transport.receive(&mut buffer).await.unwrap(), 3);
        assert_eq!(buffer, vec![0, 1, 2, 3]);

        transport.send(&[9, 9]).await.unwrap();
        assert_eq!(handle.sent(), vec![9, 9]);
        assert_eq!(transport.peer_host(), "10.0.0.1");

        assert_eq!(transport.receive(&mut buffer).await.unwrap(), 0);
        assert!(!transport.is_connected());
        assert!(transport.send(&[1]).await.is_err());
    }
}
