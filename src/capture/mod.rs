pub mod producer;
pub mod reader;
pub mod sampler;
