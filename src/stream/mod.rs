mod track;
mod host;
mod memory;
mod policy;

pub use track::*;
pub use host::*;
pub use memory::*;
pub use policy::*;
