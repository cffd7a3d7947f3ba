//! Per-case failure types

use apitrial_domain::Severity;
use thiserror::Error;

use crate::ports::HttpClientError;

/// Why a single test case stopped before its assertion callback ran.
#[derive(Debug, Error)]
pub enum CaseError {
    /// The body returned by the params provider is not representable as JSON.
    #[error("Failed to encode body params: {0}")]
    EncodeParams(#[source] serde_json::Error),

    /// The request could not be constructed.
    #[error("Failed to create HTTP request: {0}")]
    BuildRequest(#[source] HttpClientError),

    /// The request could not be delivered.
    #[error("Failed to send request to '{url}': {source}")]
    Send {
        /// Target URL.
        url: String,
        /// Transport failure.
        #[source]
        source: HttpClientError,
    },

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    ReadBody(#[source] HttpClientError),
}

impl CaseError {
    /// Severity reported to the test context.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::EncodeParams(_) | Self::BuildRequest(_) | Self::Send { .. } => Severity::Hard,
            Self::ReadBody(_) => Severity::Soft,
        }
    }
}
