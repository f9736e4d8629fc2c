// Frameworks layer: runtime configuration and server bootstrap.

pub mod config;
pub mod server;
