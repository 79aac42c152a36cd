mod buffer;
mod error;
mod crypto;
mod time;
mod shutdown;
pub mod names;

pub use buffer::*;
pub use error::*;
pub use crypto::*;
pub use time::*;
pub use shutdown::*;
