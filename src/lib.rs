//! # pooled-connect
//!
//! Drop-in pooled replacement for a database driver's connect entry point.
//!
//! Wrap the driver in a [`PooledDriver`] and hand that to the code that used
//! to hold the driver. Each connect call is routed by its parameters to a
//! sub-pool of the process pool; the pool is built lazily from settings and
//! rebuilt transparently if the process forks.
//!
//! - [`PooledDriver`]: the shim, itself a [`Driver`]
//! - [`Builder`]: configure and optionally install a shim process-wide
//! - [`install`] / [`connect`]: process-wide entry point
//!
//! # Example
//!
//! ```
//! use pooled_connect::{Builder, ConnectParams, Driver, ParamValue};
//! use serde_json::json;
//!
//! struct Loopback;
//!
//! impl Driver for Loopback {
//!    type Connection = String;
//!    type Error = std::io::Error;
//!
//!    fn connect(&self, params: &ConnectParams) -> Result<String, std::io::Error> {
//!       Ok(format!("{:?}", params.get("user")))
//!    }
//! }
//!
//! let pooled = Builder::new(Loopback)
//!    .settings(json!({
//!       "POOL_BACKEND": "SingletonThreadPool",
//!       "POOL_RECYCLE": 3600,
//!    }))
//!    .build();
//!
//! let params = ConnectParams::new()
//!    .with("user", "app")
//!    .with("conv", ParamValue::map([(0, "x"), (1, "y")]));
//!
//! let conn = pooled.connect(&params).unwrap();
//! assert!(conn.contains("app"));
//! ```

use tracing::debug;

mod error;
mod global;
mod shim;

pub use error::{Error, Result};
pub use global::{connect, install, installed};
pub use shim::{CONVERSIONS_PARAM, PooledDriver};

pub use pooled_connect_core::{
   ARGUMENTS_SETTING, BACKEND_SETTING, CanonicalKey, ConnectParams, DEFAULT_RECYCLE_SECS, Driver,
   ParamValue, PoolConfig, PoolInstance, PoolManager, PoolStatus, PooledConnection,
   RECYCLE_SETTING, SettingsSource, Strategy,
};

#[cfg(feature = "sqlite")]
pub use pooled_connect_sqlite as sqlite;

type ProcessIdFn = Box<dyn Fn() -> u32 + Send + Sync>;

/// Builder for a [`PooledDriver`].
///
/// Use this to choose where pool settings come from and, optionally, to
/// install the result as the process-wide driver.
///
/// # Example
///
/// ```no_run
/// use pooled_connect::{Builder, ConnectParams, Driver};
///
/// # struct MyDriver;
/// # impl Driver for MyDriver {
/// #    type Connection = ();
/// #    type Error = std::io::Error;
/// #    fn connect(&self, _: &ConnectParams) -> Result<(), std::io::Error> { Ok(()) }
/// # }
/// # fn main() -> pooled_connect::Result<()> {
/// // During startup
/// Builder::new(MyDriver)
///    .settings(serde_json::json!({ "POOL_BACKEND": "QueuePool" }))
///    .install()?;
///
/// // Anywhere later in the process
/// let conn = pooled_connect::connect::<MyDriver>(&ConnectParams::new().with("user", "app"))?;
/// # Ok(())
/// # }
/// ```
pub struct Builder<D: Driver> {
   driver: D,
   settings: Box<dyn SettingsSource>,
   process_id: Option<ProcessIdFn>,
}

impl<D: Driver> Builder<D> {
   /// Create a builder for `driver`, with every pool setting at its default.
   pub fn new(driver: D) -> Self {
      Self {
         driver,
         settings: Box::new(()),
         process_id: None,
      }
   }

   /// Read pool settings from `settings` when the pool is built.
   ///
   /// See [`BACKEND_SETTING`], [`ARGUMENTS_SETTING`] and [`RECYCLE_SETTING`].
   pub fn settings(mut self, settings: impl SettingsSource + 'static) -> Self {
      self.settings = Box::new(settings);
      self
   }

   /// Override how the current process identity is read.
   pub fn process_id<F>(mut self, process_id: F) -> Self
   where
      F: Fn() -> u32 + Send + Sync + 'static,
   {
      self.process_id = Some(Box::new(process_id));
      self
   }

   /// Build the pooled driver.
   pub fn build(self) -> PooledDriver<D> {
      let pooled = PooledDriver::new(self.driver, self.settings);
      match self.process_id {
         Some(process_id) => pooled.with_process_id(process_id),
         None => pooled,
      }
   }

   /// Build the pooled driver and install it for the whole process.
   pub fn install(self) -> Result<()> {
      debug!("Installing process-wide pooled driver");
      install(self.build())
   }
}
