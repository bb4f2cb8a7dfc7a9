//! Data Transfer Objects for REST request parsing.
//!
//! Response bodies are the domain views themselves; only request bodies
//! and query strings need their own types.

pub mod catalog_dto;
pub mod rankings_dto;

pub use catalog_dto::*;
pub use rankings_dto::*;
