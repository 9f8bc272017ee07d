// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod live_source;
pub mod synthetic;
pub mod wire;
