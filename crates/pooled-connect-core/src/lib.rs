//! # pooled-connect-core
//!
//! Connection pooling for drivers that open one physical connection per
//! connect call, safe to use in processes that fork.
//!
//! ## Core Types
//!
//! - **[`PoolManager`]**: Owns the process pool, builds it lazily from settings and
//!   rebuilds it when the process id changes
//! - **[`PoolInstance`]**: The process pool, one sub-pool per distinct parameter group
//! - **[`Pool`]**: A single pool run by one of five [`Strategy`] variants
//! - **[`PooledConnection`]**: RAII checkout handle that returns its connection on drop
//! - **[`CanonicalKey`]**: Hashable, order-insensitive wrapper for nested parameter maps
//! - **[`Driver`]**: The native connect entry point being pooled
//! - **[`PoolConfig`]** / **[`SettingsSource`]**: Configuration and where it is read from
//! - **[`Error`]**: Error type for pool operations
//!
//! ## Strategies
//!
//! | Name | Behavior |
//! |---|---|
//! | `QueuePool` | bounded, shared, waits up to a timeout when exhausted, recycles by age |
//! | `SingletonThreadPool` | one connection per thread, recycles by age |
//! | `AssertionPool` | one connection, a concurrent second checkout is an error |
//! | `NullPool` | a new connection per checkout, closed on release |
//! | `StaticPool` | one connection shared by everyone |
//!
//! ## Usage
//!
//! ```
//! use pooled_connect_core::{ConnectParams, Driver, PoolManager};
//! use serde_json::json;
//!
//! struct Loopback;
//!
//! impl Driver for Loopback {
//!    type Connection = u32;
//!    type Error = std::io::Error;
//!
//!    fn connect(&self, _params: &ConnectParams) -> Result<u32, std::io::Error> {
//!       Ok(42)
//!    }
//! }
//!
//! let settings = json!({
//!    "POOL_BACKEND": "QueuePool",
//!    "POOL_ARGUMENTS": { "pool_size": 2, "max_overflow": 1, "timeout": 5 },
//! });
//!
//! let manager = PoolManager::new(Loopback, settings);
//! let params = ConnectParams::new().with("user", "app");
//!
//! let conn = manager.connect(&params).unwrap();
//! assert_eq!(*conn, 42);
//! // Returned to the pool on drop
//! drop(conn);
//! ```
mod config;
mod connection;
mod driver;
mod error;
mod key;
mod manager;
mod params;
mod pool;
mod strategy;

// Re-export public types
pub use config::{
   ARGUMENTS_SETTING, BACKEND_SETTING, DEFAULT_RECYCLE_SECS, PoolConfig, RECYCLE_SETTING,
   SettingsSource, Strategy,
};
pub use connection::PooledConnection;
pub use driver::Driver;
pub use error::{DriverError, Error};
pub use key::CanonicalKey;
pub use manager::{PoolInstance, PoolManager, ProcessId};
pub use params::{ConnectParams, ParamValue};
pub use pool::{Pool, PoolStatus};
pub use strategy::Factory;

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
