//! REST endpoint handlers organized by resource.

pub mod catalog;
pub mod rankings;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes the administrative routes nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().merge(catalog::routes())
}
