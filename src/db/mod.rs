//! Database module: models, schema and the storage layer.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows plus the pin status machine
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `store.rs`: all queries, including the conditional publish transitions

pub mod models;
pub mod schema;
pub mod store;

pub use models::{Connection, DuePin, OauthState, Pin, PinStatus, Project};
pub use schema::SQLITE_INIT;
pub use store::{SqlitePool, Store, connect};
