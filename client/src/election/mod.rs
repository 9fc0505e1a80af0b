pub mod config;
pub mod scope_leadership;
