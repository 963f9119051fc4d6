//! Perch DB - boutique catalog bootstrap
//!
//! Only the `perch seed` operator command touches the database directly;
//! runtime product queries go through the tool-execution proxy. This
//! crate owns the MySQL pool, the schema migrations, and the idempotent
//! catalog fixtures with their verification pass.

pub mod connection;
pub mod fixtures;
pub mod migrations;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{BoutiqueSeed, ProductRow, SeedResult, VerificationResult};
