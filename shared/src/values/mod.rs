pub mod replicated_value;
pub mod vector;
