//! apitrial domain - declarative HTTP API trial types
//!
//! This crate defines what a trial run is made of: HTTP methods, request
//! parameters, test cases, API definitions, trials and the test context
//! contract. All types here are pure Rust with no I/O dependencies.

pub mod error;
pub mod request;
pub mod testing;

pub use error::{DomainError, DomainResult};
pub use request::{HttpMethod, JsonBody, RequestParams, compose_url};
pub use testing::{
    ApiDefinition, AssertFn, ParamsFn, Severity, TestCase, TestContext, Trial, TrialGroup,
};
