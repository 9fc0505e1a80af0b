pub mod config;
pub mod error;
pub mod session_connection;
