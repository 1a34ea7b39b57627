pub mod bridge;
pub mod delegate;
pub mod login;
pub mod memory;
pub mod prompt;
