// Network adapter modules: the per-socket client task and the shared
// admission registry.

pub mod client;
pub mod registry;

pub use client::ws_handler;
pub use registry::{AdmissionError, ClientRegistry};
