//! Request extractors whose rejections render as [`ServiceError`].
//!
//! axum's own `Json` and `Query` reject with plain-text 4xx responses. These
//! wrappers run the same extraction and convert the rejection, so a
//! malformed body or query string gets the usual `{ "error": ... }` 400.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ServiceError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct ApiJson<T>(pub T);

/// Deserialized query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct ApiQuery<T>(pub T);
