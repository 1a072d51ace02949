pub mod args;
pub mod error;
pub mod signal;
pub mod types;
