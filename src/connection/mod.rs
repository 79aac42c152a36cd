mod flow_control;
mod transport;
mod state;
mod context;
mod session;
#[cfg(test)]
mod memory_transport;

pub use flow_control::*;
pub use transport::*;
pub use state::*;
pub use context::*;
pub use session::*;
#[cfg(test)]
pub(crate) use memory_transport::MemoryTransport;
