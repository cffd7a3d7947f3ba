//! Per-case request parameters
//!
//! A test case may carry a provider that produces the body, URL suffix and
//! headers for its request. The body is kept as a type-erased serializable
//! value so that encoding happens inside the runner, where a failure can be
//! reported against the case.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

type EncodeFn = Box<dyn FnOnce() -> Result<Vec<u8>, serde_json::Error> + Send>;

/// A request body that is encoded to JSON when the request is built.
pub struct JsonBody {
    encode: EncodeFn,
}

impl JsonBody {
    /// Wraps any serializable value.
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + 'static,
    {
        Self {
            encode: Box::new(move || serde_json::to_vec(&value)),
        }
    }

    /// Encodes the wrapped value to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the value cannot be represented as JSON.
    pub fn encode(self) -> Result<Vec<u8>, serde_json::Error> {
        (self.encode)()
    }
}

impl fmt::Debug for JsonBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonBody").finish_non_exhaustive()
    }
}

/// Body, URL suffix and headers for one request.
#[derive(Debug, Default)]
pub struct RequestParams {
    /// Body to send, if any.
    pub body: Option<JsonBody>,
    /// Appended verbatim to `base_url + path`.
    pub url_suffix: String,
    /// Headers applied to the request, replacing defaults of the same name.
    pub headers: BTreeMap<String, String>,
}

impl RequestParams {
    /// Creates empty parameters: no body, no suffix, no headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body<T>(mut self, value: T) -> Self
    where
        T: Serialize + Send + 'static,
    {
        self.body = Some(JsonBody::new(value));
        self
    }

    /// Sets the URL suffix (query string, trailing path segment, ...).
    #[must_use]
    pub fn with_url_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.url_suffix = suffix.into();
        self
    }

    /// Adds a header. A later call with the same name wins.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Joins base URL, API path and suffix by plain concatenation.
///
/// No escaping or slash normalisation is performed; `compose_url("http://x",
/// "/a", "?q=1")` is `"http://x/a?q=1"`.
#[must_use]
pub fn compose_url(base_url: &str, path: &str, url_suffix: &str) -> String {
    format!("{base_url}{path}{url_suffix}")
}
