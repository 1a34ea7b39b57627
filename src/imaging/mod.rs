pub mod buffer;
pub mod codec;
pub mod ops;
