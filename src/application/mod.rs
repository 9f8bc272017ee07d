// Application layer - Engine state and use cases
pub mod aggregate;
pub mod buffer;
pub mod connection;
pub mod downsample;
pub mod engine;
pub mod source;
pub mod viewport;
