//! Factories for the default flightdeck collaborators.

pub mod http_transport;
pub use http_transport::{HttpTransport, HttpTransportFactory};

mod tracing_collab;
pub use tracing_collab::*;
