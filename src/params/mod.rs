pub mod cache;
pub mod parameter;
