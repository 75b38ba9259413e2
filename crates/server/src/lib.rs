//! heating-machine-server — the read-only HTTP surface around the load
//! engine and work queue metrics.

mod http;

pub use http::Server;
