//! apitrial application - the trial runner
//!
//! This crate sequences trials into HTTP requests and hands every response
//! to the assertion callback of its test case. The HTTP stack itself sits
//! behind the [`ports::HttpTransport`] port.

pub mod config;
pub mod error;
pub mod handler;
pub mod ports;

pub use config::{ConfigError, HandlerConfig, default_user_agent};
pub use error::CaseError;
pub use handler::Handler;
