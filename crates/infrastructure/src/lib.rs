//! apitrial infrastructure - adapters and entry points
//!
//! This crate provides the reqwest-backed transport, a recording test
//! context and tracing setup, plus [`construct`] to get a ready handler.

use std::sync::Arc;

use apitrial_application::ports::HttpClientError;
use apitrial_application::{Handler, HandlerConfig};

pub mod adapters;
pub mod telemetry;
pub mod testing;

pub use adapters::{ReqwestResponse, ReqwestTransport};
pub use telemetry::init_tracing;
pub use testing::{ContextEntry, RecordingContext};

/// Builds a handler bound to `base_url` with a fresh default HTTP client.
///
/// No request is sent.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn construct(base_url: impl Into<String>) -> Result<Handler<ReqwestTransport>, HttpClientError> {
    Ok(Handler::new(base_url, Arc::new(ReqwestTransport::new()?)))
}

/// Builds a handler from a full configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn construct_with_config(
    config: &HandlerConfig,
) -> Result<Handler<ReqwestTransport>, HttpClientError> {
    let transport = ReqwestTransport::from_config(config)?;
    Ok(Handler::from_config(config, Arc::new(transport)))
}
