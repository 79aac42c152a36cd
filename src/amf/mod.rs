mod amf0;
mod encoder;
mod decoder;

pub use amf0::*;
pub use encoder::*;
pub use decoder::*;
