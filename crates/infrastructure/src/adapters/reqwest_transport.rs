//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port on top of a single
//! `reqwest::Client`, shared by every test case of a run.

use std::time::Duration;

use apitrial_application::HandlerConfig;
use apitrial_application::default_user_agent;
use apitrial_application::ports::{
    HttpClientError, HttpTransport, OutgoingRequest, TransportResponse,
};
use apitrial_domain::HttpMethod;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, HeaderName, HeaderValue};
use reqwest::{Client, Method, Request, Response};

const MAX_REDIRECTS: usize = 10;

/// HTTP transport backed by `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_ms: Option<u64>,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    ///
    /// Default configuration:
    /// - No timeout
    /// - Follow redirects: up to 10
    /// - TLS verification: enabled
    /// - User-Agent: `apitrial/<version>`
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new() -> Result<Self, HttpClientError> {
        Self::build(&default_user_agent(), None)
    }

    /// Creates a transport honouring the timeout and User-Agent of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn from_config(config: &HandlerConfig) -> Result<Self, HttpClientError> {
        Self::build(&config.user_agent, config.timeout_ms)
    }

    /// Wraps an already configured reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout_ms: None,
        }
    }

    fn build(user_agent: &str, timeout_ms: Option<u64>) -> Result<Self, HttpClientError> {
        let mut builder = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
        if let Some(timeout_ms) = timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| HttpClientError::Other(e.to_string()))?;

        Ok(Self { client, timeout_ms })
    }

    /// Methods whose empty body is announced with `Content-Length: 0`.
    const fn expects_length(method: HttpMethod) -> bool {
        matches!(method, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
            HttpMethod::Trace => Method::TRACE,
        }
    }

    /// Maps reqwest errors to the port's `HttpClientError`.
    fn map_error(&self, error: &reqwest::Error) -> HttpClientError {
        if error.is_timeout() {
            return match self.timeout_ms {
                Some(timeout_ms) => HttpClientError::Timeout { timeout_ms },
                None => HttpClientError::TimedOut(error.to_string()),
            };
        }

        if error.is_connect() {
            let message = error.to_string();
            let host = error
                .url()
                .and_then(|u| u.host_str())
                .unwrap_or("unknown")
                .to_string();
            let lowered = format!("{error:?}").to_lowercase();
            if lowered.contains("dns") || lowered.contains("resolve") {
                return HttpClientError::DnsError { host, message };
            }
            if lowered.contains("refused") {
                return HttpClientError::ConnectionRefused {
                    host,
                    port: error
                        .url()
                        .and_then(reqwest::Url::port_or_known_default)
                        .unwrap_or(80),
                };
            }
            return HttpClientError::ConnectionFailed(message);
        }

        if error.is_redirect() {
            return HttpClientError::Other(format!(
                "stopped after {MAX_REDIRECTS} redirects: {error}"
            ));
        }

        HttpClientError::Other(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    type Request = Request;
    type Response = ReqwestResponse;

    fn build_request(&self, request: OutgoingRequest) -> Result<Request, HttpClientError> {
        let OutgoingRequest {
            method,
            url,
            body,
            headers,
        } = request;

        let announce_empty = body.is_empty() && Self::expects_length(method);
        let mut built = self
            .client
            .request(Self::to_reqwest_method(method), url.as_str())
            .body(body)
            .build()
            .map_err(|e| HttpClientError::InvalidUrl(format!("{e}: {url}")))?;

        // hyper omits the header for a zero-sized body
        if announce_empty {
            built
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        }

        for (name, value) in &headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| HttpClientError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| HttpClientError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            built.headers_mut().insert(header_name, header_value);
        }

        Ok(built)
    }

    async fn send(&self, request: Request) -> Result<ReqwestResponse, HttpClientError> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| self.map_error(&e))?;
        Ok(ReqwestResponse(response))
    }
}

/// Response received through [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestResponse(Response);

#[async_trait]
impl TransportResponse for ReqwestResponse {
    fn status(&self) -> u16 {
        self.0.status().as_u16()
    }

    async fn read_body(self) -> Result<Vec<u8>, HttpClientError> {
        let bytes = self
            .0
            .bytes()
            .await
            .map_err(|e| HttpClientError::BodyRead(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
