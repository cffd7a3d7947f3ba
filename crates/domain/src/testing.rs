//! Trials, API definitions and test cases.
//!
//! These are pure declarations. A [`Trial`] resolves to an ordered list of
//! [`ApiDefinition`]s, each of which owns the [`TestCase`]s that exercise it.
//! Pass/fail is never judged here: assertion callbacks report through the
//! [`TestContext`] they are handed.

use std::fmt;
use std::sync::Arc;

use crate::error::DomainResult;
use crate::request::{HttpMethod, RequestParams};

/// How hard a failure hits the test case that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recorded; the case stops at this point.
    Hard,
    /// Recorded as an error; execution of later cases is unaffected.
    Soft,
}

/// Failure reporting and logging handle of the host test framework.
pub trait TestContext: Send {
    /// Writes one log line.
    fn log(&mut self, line: &str);

    /// Records a failure without aborting anything.
    fn error(&mut self, message: &str);

    /// Records an unconditional failure. The runner abandons the current
    /// case right after calling this.
    fn fail_now(&mut self, message: &str);

    /// Records a failure with the given severity.
    fn report(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Hard => self.fail_now(message),
            Severity::Soft => self.error(message),
        }
    }
}

/// Produces the parameters of a request right before it is built.
pub type ParamsFn = Arc<dyn Fn() -> RequestParams + Send + Sync>;

/// Checks a response: `(ctx, expected, body, status)`.
pub type AssertFn<E> = Arc<dyn Fn(&mut dyn TestContext, &E, &[u8], u16) + Send + Sync>;

/// One request/response scenario against an API.
pub struct TestCase<E = serde_json::Value> {
    /// Human readable description.
    pub description: String,
    /// Parameter provider; absent means no body, no suffix and no headers.
    pub params: Option<ParamsFn>,
    /// Handed to the assertion callback untouched.
    pub expected: E,
    /// Assertion callback; absent means the response is not checked.
    pub assert: Option<AssertFn<E>>,
}

impl<E> TestCase<E> {
    /// Creates a case with no parameters and no assertion.
    pub fn new(description: impl Into<String>, expected: E) -> Self {
        Self {
            description: description.into(),
            params: None,
            expected,
            assert: None,
        }
    }

    /// Sets the parameter provider.
    #[must_use]
    pub fn with_params<F>(mut self, params: F) -> Self
    where
        F: Fn() -> RequestParams + Send + Sync + 'static,
    {
        self.params = Some(Arc::new(params));
        self
    }

    /// Sets the assertion callback.
    #[must_use]
    pub fn with_assert<F>(mut self, assert: F) -> Self
    where
        F: Fn(&mut dyn TestContext, &E, &[u8], u16) + Send + Sync + 'static,
    {
        self.assert = Some(Arc::new(assert));
        self
    }
}

impl<E: Clone> Clone for TestCase<E> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            params: self.params.clone(),
            expected: self.expected.clone(),
            assert: self.assert.clone(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for TestCase<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("description", &self.description)
            .field("params", &self.params.is_some())
            .field("expected", &self.expected)
            .field("assert", &self.assert.is_some())
            .finish()
    }
}

/// One HTTP endpoint and the cases that exercise it.
#[derive(Debug, Clone)]
pub struct ApiDefinition<E = serde_json::Value> {
    method: HttpMethod,
    path: String,
    description: String,
    /// Cases in execution order.
    pub test_cases: Vec<TestCase<E>>,
}

impl<E> ApiDefinition<E> {
    /// Creates a definition with no test cases.
    pub fn new(method: HttpMethod, path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            description: description.into(),
            test_cases: Vec::new(),
        }
    }

    /// Creates a definition from a method name such as `"get"` or `"POST"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the method is not one of [`HttpMethod`].
    pub fn parse(
        method: &str,
        path: impl Into<String>,
        description: impl Into<String>,
    ) -> DomainResult<Self> {
        Ok(Self::new(method.parse()?, path, description))
    }

    /// Appends a test case.
    #[must_use]
    pub fn with_case(mut self, case: TestCase<E>) -> Self {
        self.test_cases.push(case);
        self
    }

    /// Appends several test cases, keeping their order.
    #[must_use]
    pub fn with_cases(mut self, cases: impl IntoIterator<Item = TestCase<E>>) -> Self {
        self.test_cases.extend(cases);
        self
    }

    /// Returns `(method, path, description)`.
    #[must_use]
    pub fn desc(&self) -> (HttpMethod, &str, &str) {
        (self.method, &self.path, &self.description)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path appended to the base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Description used in log lines.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A named group of API definitions, resolved when the run reaches it.
pub trait Trial<E = serde_json::Value>: Send + Sync {
    /// Display name used in log lines.
    fn name(&self) -> &str;

    /// Resolves the definitions to run. May consult or log to the context,
    /// e.g. to skip endpoints that the target environment does not serve.
    fn apis(&self, ctx: &mut dyn TestContext) -> Vec<ApiDefinition<E>>;
}

/// A trial backed by a fixed list of definitions.
#[derive(Debug, Clone)]
pub struct TrialGroup<E = serde_json::Value> {
    name: String,
    apis: Vec<ApiDefinition<E>>,
}

impl<E> TrialGroup<E> {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            apis: Vec::new(),
        }
    }

    /// Appends a definition.
    #[must_use]
    pub fn with_api(mut self, api: ApiDefinition<E>) -> Self {
        self.apis.push(api);
        self
    }
}

impl<E: Clone + Send + Sync> Trial<E> for TrialGroup<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apis(&self, _ctx: &mut dyn TestContext) -> Vec<ApiDefinition<E>> {
        self.apis.clone()
    }
}
