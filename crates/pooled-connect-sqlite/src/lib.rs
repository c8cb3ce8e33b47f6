//! # pooled-connect-sqlite
//!
//! A SQLite [`Driver`](pooled_connect_core::Driver) for pooled-connect, built on SQLx.
//!
//! SQLx is async; the pool is not. [`SqliteDriver`] bridges the two with its own
//! runtime so a pooled SQLite connection behaves like any blocking driver
//! connection.
//!
//! ## Connect parameters
//!
//! | Name | Type | Default |
//! |---|---|---|
//! | `database` | path, or `:memory:` | required |
//! | `read_only` | bool | `false` |
//! | `create_if_missing` | bool | `true` unless read-only |
//!
//! ## Usage
//!
//! ```no_run
//! use pooled_connect_core::{ConnectParams, PoolManager};
//! use pooled_connect_sqlite::SqliteDriver;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = PoolManager::new(SqliteDriver::new()?, json!({ "POOL_BACKEND": "QueuePool" }));
//! let params = ConnectParams::new().with("database", "app.db");
//!
//! let conn = manager.connect(&params)?;
//! conn.execute("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY)")?;
//! let count = conn.fetch_i64("SELECT COUNT(*) FROM users")?;
//! # Ok(())
//! # }
//! ```
mod connection;
mod driver;
mod error;

pub use connection::SqliteConn;
pub use driver::{CREATE_IF_MISSING_PARAM, DATABASE_PARAM, READ_ONLY_PARAM, SqliteDriver};
pub use error::{Error, Result};
