mod audio;
mod video;
mod metadata;
mod relay;

pub use audio::*;
pub use video::*;
pub use metadata::*;
pub use relay::*;
