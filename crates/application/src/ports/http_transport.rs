//! HTTP transport port

use std::collections::BTreeMap;

use apitrial_domain::HttpMethod;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by an HTTP transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpClientError {
    /// The composed URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A header name or value is not valid HTTP.
    #[error("Invalid header '{name}': {message}")]
    InvalidHeader {
        /// Header name as given.
        name: String,
        /// Parser message.
        message: String,
    },

    /// The client-level timeout elapsed.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// A timeout elapsed that was not configured through this crate.
    #[error("Request timed out: {0}")]
    TimedOut(String),

    /// Host name resolution failed.
    #[error("DNS lookup failed for '{host}': {message}")]
    DnsError {
        /// Host that failed to resolve.
        host: String,
        /// Resolver message.
        message: String,
    },

    /// Nothing is listening on the target port.
    #[error("Connection refused by {host}:{port}")]
    ConnectionRefused {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// Any other connection-level failure.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The response body could not be read to the end.
    #[error("Failed to read body: {0}")]
    BodyRead(String),

    /// Anything else reported by the underlying client.
    #[error("{0}")]
    Other(String),
}

/// A request as the runner describes it, before transport-specific building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Fully composed URL.
    pub url: String,
    /// Encoded body; empty when the case supplies none.
    pub body: Vec<u8>,
    /// Headers that replace any default of the same name.
    pub headers: BTreeMap<String, String>,
}

/// A received response whose body has not been read yet.
#[async_trait]
pub trait TransportResponse: Send {
    /// HTTP status code.
    fn status(&self) -> u16;

    /// Reads the whole body into memory, releasing the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails mid-body.
    async fn read_body(self) -> Result<Vec<u8>, HttpClientError>;
}

/// Port for building and sending HTTP requests.
///
/// Building and sending are separate steps so that the runner can tell a
/// malformed request apart from a delivery failure. Implementations are
/// shared by every test case of a run and must only be read from.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Transport-specific request ready to be sent.
    type Request: Send;

    /// Transport-specific response.
    type Response: TransportResponse;

    /// Builds a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or a header is invalid.
    fn build_request(&self, request: OutgoingRequest) -> Result<Self::Request, HttpClientError>;

    /// Sends a built request and waits for the response head.
    ///
    /// # Errors
    ///
    /// Returns an error on connection, DNS or timeout failures.
    async fn send(&self, request: Self::Request) -> Result<Self::Response, HttpClientError>;
}
