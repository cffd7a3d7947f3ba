//! HTTP request domain types

mod method;
mod params;

pub use method::HttpMethod;
pub use params::{JsonBody, RequestParams, compose_url};
