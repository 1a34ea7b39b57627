pub mod decl;
pub mod plugin;
