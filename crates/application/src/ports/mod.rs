//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the runner and external systems.
//! Each port is a trait implemented by adapters in the infrastructure layer.

mod http_transport;

pub use http_transport::{HttpClientError, HttpTransport, OutgoingRequest, TransportResponse};
