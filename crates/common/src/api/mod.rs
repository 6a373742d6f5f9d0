//! Coordinator HTTP API
//!
//! Each endpoint is a request type implementing [`ApiRequest`]; the
//! [`ApiClient`] sends it and decodes the typed response.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}
