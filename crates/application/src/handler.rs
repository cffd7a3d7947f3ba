//! Trial runner.
//!
//! Walks trials, API definitions and test cases in declared order and runs
//! every case as one independent request/response cycle. Nothing runs in
//! parallel and nothing is retried.

use std::sync::Arc;

use apitrial_domain::{
    ApiDefinition, HttpMethod, JsonBody, RequestParams, TestCase, TestContext, Trial, compose_url,
};

use crate::config::HandlerConfig;
use crate::error::CaseError;
use crate::ports::{HttpTransport, OutgoingRequest, TransportResponse};

/// Runs trials against one base URL through a shared transport.
#[derive(Debug)]
pub struct Handler<T> {
    base_url: String,
    transport: Arc<T>,
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: HttpTransport> Handler<T> {
    /// Creates a handler. No I/O is performed.
    pub fn new(base_url: impl Into<String>, transport: Arc<T>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    /// Creates a handler bound to the configured base URL.
    pub fn from_config(config: &HandlerConfig, transport: Arc<T>) -> Self {
        Self::new(config.base_url.clone(), transport)
    }

    /// Prefix of every request URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Runs every case of every trial.
    ///
    /// Each trial is resolved against `ctx` when the run reaches it; its
    /// definitions and their cases then run in the order returned.
    pub async fn run_all<E>(&self, ctx: &mut dyn TestContext, trials: &[&dyn Trial<E>]) {
        for trial in trials {
            let apis = trial.apis(ctx);
            tracing::info!(trial = trial.name(), apis = apis.len(), "running trial");
            for api in &apis {
                self.run_api(ctx, trial.name(), api).await;
            }
        }
    }

    /// Runs the cases of an explicit list of definitions.
    ///
    /// `label` only identifies the run in log lines.
    pub async fn run_selected<E>(
        &self,
        ctx: &mut dyn TestContext,
        label: &str,
        apis: &[ApiDefinition<E>],
    ) {
        tracing::info!(trial = label, apis = apis.len(), "running selected apis");
        for api in apis {
            self.run_api(ctx, label, api).await;
        }
    }

    async fn run_api<E>(&self, ctx: &mut dyn TestContext, label: &str, api: &ApiDefinition<E>) {
        let (method, path, description) = api.desc();
        for case in &api.test_cases {
            ctx.log(&format!(
                "Case: {} of {} ({})",
                case.description, description, label
            ));
            if let Err(err) = self.run_case(ctx, case, method, path).await {
                tracing::warn!(case = %case.description, error = %err, "test case failed");
                ctx.report(err.severity(), &err.to_string());
            }
        }
    }

    async fn run_case<E>(
        &self,
        ctx: &mut dyn TestContext,
        case: &TestCase<E>,
        method: HttpMethod,
        path: &str,
    ) -> Result<(), CaseError> {
        let RequestParams {
            body,
            url_suffix,
            headers,
        } = case
            .params
            .as_ref()
            .map_or_else(RequestParams::default, |params| params());

        let url = compose_url(&self.base_url, path, &url_suffix);
        ctx.log(&format!("{method} {url}"));
        tracing::debug!(%method, %url, "sending request");

        let body = body
            .map(JsonBody::encode)
            .transpose()
            .map_err(CaseError::EncodeParams)?
            .unwrap_or_default();

        let request = self
            .transport
            .build_request(OutgoingRequest {
                method,
                url: url.clone(),
                body,
                headers,
            })
            .map_err(CaseError::BuildRequest)?;

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| CaseError::Send { url, source })?;

        let status = response.status();
        let body = response.read_body().await.map_err(CaseError::ReadBody)?;

        if let Some(assert) = &case.assert {
            assert(&mut *ctx, &case.expected, body.as_slice(), status);
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::significant_drop_tightening)]
mod tests {
    use super::*;
    use crate::ports::HttpClientError;
    use apitrial_domain::TrialGroup;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde::Serializer;
    use serde::ser::Error as _;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    enum Scripted {
        Reply { status: u16, body: &'static str },
        SendFails(HttpClientError),
        BodyFails { status: u16 },
    }

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<OutgoingRequest>>,
        script: Mutex<VecDeque<Scripted>>,
    }

    impl MockTransport {
        fn scripted(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::default(),
                script: Mutex::new(script.into_iter().collect()),
            })
        }

        fn sent(&self) -> Vec<OutgoingRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    struct MockResponse {
        status: u16,
        body: Result<Vec<u8>, HttpClientError>,
    }

    #[async_trait]
    impl TransportResponse for MockResponse {
        fn status(&self) -> u16 {
            self.status
        }

        async fn read_body(self) -> Result<Vec<u8>, HttpClientError> {
            self.body
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        type Request = OutgoingRequest;
        type Response = MockResponse;

        fn build_request(
            &self,
            request: OutgoingRequest,
        ) -> Result<OutgoingRequest, HttpClientError> {
            if request.url.contains(' ') {
                return Err(HttpClientError::InvalidUrl(request.url));
            }
            Ok(request)
        }

        async fn send(&self, request: OutgoingRequest) -> Result<MockResponse, HttpClientError> {
            self.sent.lock().unwrap().push(request);
            match self.script.lock().unwrap().pop_front() {
                None => Ok(MockResponse {
                    status: 200,
                    body: Ok(Vec::new()),
                }),
                Some(Scripted::Reply { status, body }) => Ok(MockResponse {
                    status,
                    body: Ok(body.as_bytes().to_vec()),
                }),
                Some(Scripted::SendFails(err)) => Err(err),
                Some(Scripted::BodyFails { status }) => Ok(MockResponse {
                    status,
                    body: Err(HttpClientError::BodyRead("connection reset".to_string())),
                }),
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        logs: Vec<String>,
        errors: Vec<String>,
        fatals: Vec<String>,
    }

    impl TestContext for Recorder {
        fn log(&mut self, line: &str) {
            self.logs.push(line.to_string());
        }

        fn error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }

        fn fail_now(&mut self, message: &str) {
            self.fatals.push(message.to_string());
        }
    }

    struct Unencodable;

    impl serde::Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cyclic reference"))
        }
    }

    type Calls<E> = Arc<Mutex<Vec<(E, Vec<u8>, u16)>>>;

    fn recording_case<E>(description: &str, expected: E, calls: &Calls<E>) -> TestCase<E>
    where
        E: Clone + Send + Sync + 'static,
    {
        let calls = Arc::clone(calls);
        TestCase::new(description, expected).with_assert(move |_, expected, body, status| {
            calls
                .lock()
                .unwrap()
                .push((expected.clone(), body.to_vec(), status));
        })
    }

    #[tokio::test]
    async fn test_case_without_params_sends_empty_body() {
        let transport = MockTransport::scripted([]);
        let handler = Handler::new("http://x", Arc::clone(&transport));
        let api: ApiDefinition<()> =
            ApiDefinition::new(HttpMethod::Post, "/sessions", "open session")
                .with_case(TestCase::new("no params", ()));

        let mut ctx = Recorder::default();
        handler.run_selected(&mut ctx, "SessionTrial", &[api]).await;

        assert_eq!(
            transport.sent(),
            vec![OutgoingRequest {
                method: HttpMethod::Post,
                url: "http://x/sessions".to_string(),
                body: Vec::new(),
                headers: BTreeMap::new(),
            }]
        );
        assert!(ctx.fatals.is_empty());
    }

    #[tokio::test]
    async fn test_params_shape_the_request() {
        let transport = MockTransport::scripted([]);
        let handler = Handler::new("http://x", Arc::clone(&transport));
        let api: ApiDefinition<()> = ApiDefinition::new(HttpMethod::Post, "/a", "create")
            .with_case(TestCase::new("with params", ()).with_params(|| {
                RequestParams::new()
                    .with_body(serde_json::json!({"name": "alice", "tags": [1, 2]}))
                    .with_url_suffix("?q=1")
                    .with_header("Authorization", "Bearer abc")
                    .with_header("X-Trace", "t-1")
            }));

        let mut ctx = Recorder::default();
        handler.run_selected(&mut ctx, "Create", &[api]).await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://x/a?q=1");
        assert_eq!(
            sent[0].body,
            serde_json::to_vec(&serde_json::json!({"name": "alice", "tags": [1, 2]})).unwrap()
        );
        assert_eq!(
            sent[0].headers,
            BTreeMap::from([
                ("Authorization".to_string(), "Bearer abc".to_string()),
                ("X-Trace".to_string(), "t-1".to_string()),
            ])
        );
    }

    #[tokio::test]
    async fn test_only_caller_headers_are_sent() {
        let transport = MockTransport::scripted([]);
        let handler = Handler::new("http://x", Arc::clone(&transport));
        let api: ApiDefinition<()> = ApiDefinition::new(HttpMethod::Put, "/doc", "replace doc")
            .with_case(
                TestCase::new("untyped", ()).with_params(|| RequestParams::new().with_body("plain")),
            )
            .with_case(TestCase::new("custom type", ()).with_params(|| {
                RequestParams::new()
                    .with_body("plain")
                    .with_header("content-type", "application/merge-patch+json")
            }));

        let mut ctx = Recorder::default();
        handler.run_selected(&mut ctx, "Docs", &[api]).await;

        let sent = transport.sent();
        assert!(sent[0].headers.is_empty());
        assert_eq!(
            sent[1].headers,
            BTreeMap::from([(
                "content-type".to_string(),
                "application/merge-patch+json".to_string()
            )])
        );
    }

    #[tokio::test]
    async fn test_assert_receives_response_exactly_once() {
        let transport = MockTransport::scripted([Scripted::Reply {
            status: 200,
            body: "pong",
        }]);
        let handler = Handler::new("http://x", Arc::clone(&transport));
        let calls: Calls<u16> = Arc::default();
        let api = ApiDefinition::new(HttpMethod::Get, "/ping", "health check")
            .with_case(recording_case("ok", 200_u16, &calls));

        let mut ctx = Recorder::default();
        handler.run_selected(&mut ctx, "HealthTrial", &[api]).await;

        assert_eq!(*calls.lock().unwrap(), vec![(200, b"pong".to_vec(), 200)]);
        assert_eq!(
            ctx.logs,
            vec!["Case: ok of health check (HealthTrial)", "GET http://x/ping"]
        );
    }

    #[tokio::test]
    async fn test_encode_failure_is_fatal_before_sending() {
        let transport = MockTransport::scripted([]);
        let handler = Handler::new("http://x", Arc::clone(&transport));
        let calls: Calls<()> = Arc::default();
        let api = ApiDefinition::new(HttpMethod::Post, "/loop", "cyclic body").with_case(
            recording_case("bad body", (), &calls)
                .with_params(|| RequestParams::new().with_body(Unencodable)),
        );

        let mut ctx = Recorder::default();
        handler.run_selected(&mut ctx, "Cycles", &[api]).await;

        assert!(transport.sent().is_empty());
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(ctx.fatals.len(), 1);
        assert!(ctx.fatals[0].starts_with("Failed to encode body params"));
        assert!(ctx.errors.is_empty());
    }

    #[tokio::test]
    async fn test_body_read_failure_does_not_leak_into_next_case() {
        let transport = MockTransport::scripted([
            Scripted::BodyFails { status: 200 },
            Scripted::Reply {
                status: 201,
                body: "created",
            },
        ]);
        let handler = Handler::new("http://x", Arc::clone(&transport));
        let calls: Calls<&'static str> = Arc::default();
        let api = ApiDefinition::new(HttpMethod::Post, "/items", "create item")
            .with_case(recording_case("first", "a", &calls))
            .with_case(recording_case("second", "b", &calls));

        let mut ctx = Recorder::default();
        handler.run_selected(&mut ctx, "Items", &[api]).await;

        assert_eq!(transport.sent().len(), 2);
        assert_eq!(*calls.lock().unwrap(), vec![("b", b"created".to_vec(), 201)]);
        assert_eq!(
            ctx.errors,
            vec!["Failed to read response body: Failed to read body: connection reset"]
        );
        assert!(ctx.fatals.is_empty());
    }

    #[tokio::test]
    async fn test_send_and_build_failures_are_fatal_per_case() {
        let transport = MockTransport::scripted([
            Scripted::SendFails(HttpClientError::ConnectionRefused {
                host: "x".to_string(),
                port: 80,
            }),
            Scripted::Reply {
                status: 204,
                body: "",
            },
        ]);
        let handler = Handler::new("http://x", Arc::clone(&transport));
        let calls: Calls<u16> = Arc::default();
        let api = ApiDefinition::new(HttpMethod::Delete, "/items/1", "delete item")
            .with_case(recording_case("refused", 0, &calls))
            .with_case(
                recording_case("bad url", 0, &calls)
                    .with_params(|| RequestParams::new().with_url_suffix("?q=a b")),
            )
            .with_case(recording_case("deleted", 204, &calls));

        let mut ctx = Recorder::default();
        handler.run_selected(&mut ctx, "Items", &[api]).await;

        assert_eq!(transport.sent().len(), 2);
        assert_eq!(*calls.lock().unwrap(), vec![(204, Vec::new(), 204)]);
        assert_eq!(
            ctx.fatals,
            vec![
                "Failed to send request to 'http://x/items/1': Connection refused by x:80",
                "Failed to create HTTP request: Invalid URL: http://x/items/1?q=a b",
            ]
        );
    }

    #[tokio::test]
    async fn test_run_all_without_trials_sends_nothing() {
        let transport = MockTransport::scripted([]);
        let handler = Handler::new("http://x", Arc::clone(&transport));

        let mut ctx = Recorder::default();
        let trials: [&dyn Trial<()>; 0] = [];
        handler.run_all(&mut ctx, &trials).await;

        assert!(transport.sent().is_empty());
        assert!(ctx.logs.is_empty());
        assert!(ctx.fatals.is_empty() && ctx.errors.is_empty());
    }

    struct StagingOnly {
        staging: bool,
    }

    impl Trial<()> for StagingOnly {
        fn name(&self) -> &str {
            "StagingOnly"
        }

        fn apis(&self, ctx: &mut dyn TestContext) -> Vec<ApiDefinition<()>> {
            if !self.staging {
                ctx.log("skipping staging-only endpoints");
                return Vec::new();
            }
            vec![
                ApiDefinition::new(HttpMethod::Get, "/debug", "debug info")
                    .with_case(TestCase::new("reachable", ())),
            ]
        }
    }

    #[tokio::test]
    async fn test_run_all_keeps_trial_api_and_case_order() {
        let transport = MockTransport::scripted([]);
        let handler = Handler::new("http://x", Arc::clone(&transport));

        let users: TrialGroup<()> = TrialGroup::new("UserTrial")
            .with_api(
                ApiDefinition::new(HttpMethod::Get, "/users", "list users")
                    .with_case(TestCase::new("page 1", ()).with_params(|| {
                        RequestParams::new().with_url_suffix("?page=1")
                    }))
                    .with_case(TestCase::new("page 2", ()).with_params(|| {
                        RequestParams::new().with_url_suffix("?page=2")
                    })),
            )
            .with_api(
                ApiDefinition::new(HttpMethod::Delete, "/users/7", "delete user")
                    .with_case(TestCase::new("exists", ())),
            );
        let production = StagingOnly { staging: false };
        let staging = StagingOnly { staging: true };

        let trials: [&dyn Trial<()>; 3] = [&users, &production, &staging];
        let mut ctx = Recorder::default();
        handler.run_all(&mut ctx, &trials).await;

        let urls: Vec<_> = transport
            .sent()
            .into_iter()
            .map(|r| format!("{} {}", r.method, r.url))
            .collect();
        assert_eq!(
            urls,
            vec![
                "GET http://x/users?page=1",
                "GET http://x/users?page=2",
                "DELETE http://x/users/7",
                "GET http://x/debug",
            ]
        );
        assert_eq!(
            ctx.logs,
            vec![
                "Case: page 1 of list users (UserTrial)",
                "GET http://x/users?page=1",
                "Case: page 2 of list users (UserTrial)",
                "GET http://x/users?page=2",
                "Case: exists of delete user (UserTrial)",
                "DELETE http://x/users/7",
                "skipping staging-only endpoints",
                "Case: reachable of debug info (StagingOnly)",
                "GET http://x/debug",
            ]
        );
    }

    #[test]
    fn test_handler_from_config() {
        let transport = MockTransport::scripted([]);
        let config = HandlerConfig::new("http://api.local").with_timeout_ms(100);
        let handler = Handler::from_config(&config, transport);
        assert_eq!(handler.base_url(), "http://api.local");
    }
}
