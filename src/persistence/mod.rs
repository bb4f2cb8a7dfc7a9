//! Persistence layer: catalog store traits and their backends.
//!
//! The rankings engine only sees [`DataStore`]. Administrative writes go
//! through [`CatalogStore`]. [`InMemoryStore`] is the default backend and
//! [`PostgresStore`] the durable one, backed by `sqlx::PgPool`.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod seed;
pub mod store;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CatalogStore, DataStore, NewBadge, NewCollection, NewEvent, StoreError};
