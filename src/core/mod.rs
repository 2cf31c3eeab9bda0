pub mod algorithm;
pub mod codec;
pub mod error;
pub mod midi;
pub mod patch;

pub use error::CodecError;
pub use patch::Patch;
