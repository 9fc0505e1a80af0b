pub mod component;
pub mod config;
pub mod delta;
pub mod engine;
pub mod entity;
pub mod entity_table;
pub mod error;
pub mod patch_sink;
