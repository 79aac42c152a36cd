mod state;
mod c0c1;
mod s0s1s2;

pub use state::*;
pub use c0c1::*;
pub use s0s1s2::*;

use crate::connection::{FlowControl, Transport};
use crate::utils::Shutdown;
use crate::{Error, Result};
use log::debug;
use std::time::Duration;

/// Performs the handshake for either side of a connection. Every wait is
/// bounded by the transport staying open, the shutdown signal and a timeout.
#[derive(Debug, Clone)]
pub struct HandshakeEngine {
    timeout: Duration,
}

impl HandshakeEngine {
    pub fn new(timeout: Duration) -> Self {
        HandshakeEngine { timeout }
    }

    /// Listener side. Bytes read past the handshake stay in `input`.
    pub async fn listen(
        &self,
        transport: &mut dyn Transport,
        input: &mut Vec<u8>,
        flow: &mut FlowControl,
        shutdown: &mut Shutdown,
    ) -> Result<HandshakeOutcome> {
        self.wait_for(transport, input, 1 + HANDSHAKE_SIZE, shutdown).await?;
        let c0c1 = C0C1::parse(&input[..1 + HANDSHAKE_SIZE])?;
        input.drain(..1 + HANDSHAKE_SIZE);
        flow.record_received(1 + HANDSHAKE_SIZE);

        let Some((scheme, digest)) = c0c1.validate() else {
            debug!("Handshake failed (this is not a problem, usually)");
            return Ok(HandshakeOutcome::Degraded);
        };

        let response = S0S1S2::generate(scheme, &digest)?.encode();
        transport.send(&response).await?;
        flow.record_sent(response.len());
        debug!("Handshake success ({:?})", scheme);

        self.wait_for(transport, input, HANDSHAKE_SIZE, shutdown).await?;
        input.drain(..HANDSHAKE_SIZE);
        flow.record_received(HANDSHAKE_SIZE);

        Ok(HandshakeOutcome::Complete(scheme))
    }

    /// Pusher side: send the fixed hello and discard the server's reply
    pub async fn push(
        &self,
        transport: &mut dyn Transport,
        input: &mut Vec<u8>,
        flow: &mut FlowControl,
        shutdown: &mut Shutdown,
    ) -> Result<()> {
        let hello = push_hello();
        transport.send(&hello).await?;

        self.wait_for(transport, input, hello.len(), shutdown).await?;
        input.drain(..hello.len());
        flow.record_received(hello.len());
        flow.record_sent(hello.len());

        debug!("Push out handshake completed");
        Ok(())
    }

    /// Receive until `input` holds at least `needed` bytes
    async fn wait_for(
        &self,
        transport: &mut dyn Transport,
        input: &mut Vec<u8>,
        needed: usize,
        shutdown: &mut Shutdown,
    ) -> Result<()> {
        let wait = async {
            while input.len() < needed {
                tokio::select! {
                    received = transport.receive(input) => {
                        if received? == 0 {
                            return Err(Error::transport("Peer closed during handshake"));
                        }
                    }
                    _ = shutdown.triggered() => return Err(Error::Cancelled),
                }
            }
            Ok(())
        };

        tokio::time::timeout(self.timeout, wait)
            .await
            .map_err(|_| Error::timeout(format!("Handshake did not complete within {:?}", self.timeout)))?
    }
}
