pub mod client;
pub mod process;
pub mod protocol;
