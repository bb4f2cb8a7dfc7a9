//! Query parameters for the rankings read endpoints.
//!
//! Every parameter arrives as an optional string and is parsed here, so a
//! malformed value becomes a JSON `400` instead of an extractor rejection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{RankingsFilter, RankingsQuery};
use crate::error::ServiceError;

/// Query string of `GET /rankings`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RankingsParams {
    /// 1-based page number; values below 1 read as 1.
    #[param(value_type = Option<i64>)]
    pub page: Option<String>,
    /// Restrict to one collection.
    #[param(value_type = Option<uuid::Uuid>)]
    pub collection_id: Option<String>,
    /// Restrict to one event.
    #[param(value_type = Option<uuid::Uuid>)]
    pub event_id: Option<String>,
}

impl RankingsParams {
    /// Validates the parameters into a [`RankingsQuery`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidInput`] if `page` is not an integer or
    /// an id is not a UUID.
    pub fn into_query(self) -> Result<RankingsQuery, ServiceError> {
        let page = parse_optional::<i64>("page", self.page.as_deref())?.unwrap_or(1);
        let filter = RankingsFilter {
            collection_id: parse_optional("collectionId", self.collection_id.as_deref())?,
            event_id: parse_optional("eventId", self.event_id.as_deref())?,
        };
        Ok(RankingsQuery::new(page, filter))
    }
}

/// Query string of `GET /rankings/global`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GlobalRankingsParams {
    /// Leaderboard size, clamped to `1..=100`. Defaults to 100.
    #[param(value_type = Option<i64>)]
    pub limit: Option<String>,
}

impl GlobalRankingsParams {
    /// Parses `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidInput`] if `limit` is not an integer.
    pub fn limit(&self) -> Result<Option<i64>, ServiceError> {
        parse_optional("limit", self.limit.as_deref())
    }
}

/// Response of `DELETE /api/v1/rankings/cache`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CacheFlushResponse {
    /// Number of cached views dropped.
    pub dropped: usize,
}

/// Parses an optional parameter; a blank value counts as absent.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidInput`] naming `field` if the value does
/// not parse.
pub fn parse_optional<T: FromStr>(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<T>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            ServiceError::InvalidInput(format!("{field} has an invalid value: {value}"))
        }),
    }
}
