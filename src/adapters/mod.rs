// Adapters layer: clients for external systems.

pub mod http;
