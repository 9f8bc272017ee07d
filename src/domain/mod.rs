// Domain layer - Core value types
pub mod connection;
pub mod sample;
