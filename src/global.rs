//! Process-wide connect entry point
//!
//! A host installs one [`PooledDriver`] during startup; every later
//! [`connect`] in the process goes through it, which makes the pool the only
//! path by which the driver is invoked.

use std::any::{Any, type_name};
use std::sync::{Arc, OnceLock};

use pooled_connect_core::{ConnectParams, Driver, PooledConnection};
use tracing::debug;

use crate::shim::PooledDriver;
use crate::{Error, Result};

static INSTALLED: OnceLock<Box<dyn Any + Send + Sync>> = OnceLock::new();

/// Install the process-wide pooled driver. Can only succeed once per process.
pub fn install<D: Driver>(driver: PooledDriver<D>) -> Result<()> {
   INSTALLED
      .set(Box::new(Arc::new(driver)))
      .map_err(|_| Error::AlreadyInstalled)?;
   debug!(driver = type_name::<D>(), "Installed pooled driver");
   Ok(())
}

/// The installed pooled driver for `D`.
pub fn installed<D: Driver>() -> Result<Arc<PooledDriver<D>>> {
   INSTALLED
      .get()
      .ok_or(Error::NotInstalled)?
      .downcast_ref::<Arc<PooledDriver<D>>>()
      .cloned()
      .ok_or(Error::DriverMismatch(type_name::<D>()))
}

/// Check out a connection through the installed pooled driver.
pub fn connect<D: Driver>(params: &ConnectParams) -> Result<PooledConnection<D::Connection>> {
   installed::<D>()?.connect(params)
}
