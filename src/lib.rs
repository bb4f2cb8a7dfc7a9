//! # poap-rankings
//!
//! Collection rankings and collector leaderboards for proof-of-attendance
//! badges.
//!
//! The service reads a catalog of collections, events, badges and holders
//! from a data store, aggregates per-collection statistics (badge totals,
//! busiest month, top collectors) and serves them over HTTP through a
//! read-through TTL cache. Administrative writes invalidate the cache.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── RankingsService ── Cache (cache)
//!     ├── CatalogService
//!     │
//!     ├── RankingsEngine + aggregation (service/)
//!     │
//!     └── DataStore: InMemoryStore | PostgreSQL (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
