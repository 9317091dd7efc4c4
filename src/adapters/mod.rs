// Adapters layer: concrete implementations for external systems
pub mod http;
pub mod server;
