#![deny(missing_docs)]
//! Flightdeck API contains the request orchestration traits and the basic
//! types required to define the api of those traits.
//!
//! If you want the orchestrator itself, please see the flightdeck_core crate.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub mod builder;
pub mod config;

mod error;
pub use error::*;

pub mod id;
pub use id::{compute_id, RequestId};

pub mod notify;
pub use notify::*;

pub mod request;
pub use request::*;

pub mod response;
pub use response::*;

pub mod transport;
pub use transport::*;
