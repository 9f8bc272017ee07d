// Presentation layer - HTTP surface for the dashboard frontend
pub mod app_state;
pub mod handlers;
