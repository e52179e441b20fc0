#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! HTTP client for the conference session API
//!
//! [`HttpClient`] handles authentication, URL resolution and paired
//! request/response logging; [`ApiClient`] layers typed calls on top and
//! normalizes the response shapes the API returns

pub mod body;
mod client;
pub mod error;
mod http;
pub mod types;

pub use body::{FilePart, FormPart, MultipartPayload, RequestBody, ResponseBody};
pub use client::ApiClient;
pub use error::{ClientError, Result};
pub use http::{ApiRequest, HttpClient, join_url};
pub use types::*;
