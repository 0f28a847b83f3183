// Presentation layer - JSON control API
pub mod app_state;
pub mod handlers;
