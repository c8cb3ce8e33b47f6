//! Error types for pooled-connect-core

use std::time::Duration;

use thiserror::Error;

/// Boxed error produced by a [`Driver`](crate::Driver) while opening a physical connection.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that may occur while configuring or using a connection pool
#[derive(Error, Debug)]
pub enum Error {
   /// The configured strategy name does not match any known pool strategy.
   /// Raised when the pool is first built, never defaulted.
   #[error(
      "unknown pool strategy '{0}': expected one of QueuePool, SingletonThreadPool, AssertionPool, NullPool, StaticPool"
   )]
   UnknownStrategy(String),

   /// A setting or pool argument has the wrong shape or an out-of-range value
   #[error("invalid pool setting '{name}': {reason}")]
   InvalidSetting { name: String, reason: String },

   /// Every connection of a queue pool stayed checked out for the whole wait
   #[error("connection pool limit of {limit} reached; timed out after {timeout:?} waiting for a connection")]
   PoolExhausted { limit: usize, timeout: Duration },

   /// A second connection was requested from an assertion pool while the
   /// first one is still checked out
   #[error("connection is already checked out; the assertion pool allows a single outstanding connection")]
   ConcurrentCheckout,

   /// The underlying driver failed to open a connection. The driver's own
   /// error is kept intact and can be recovered with [`Error::driver_error`].
   #[error(transparent)]
   Driver(DriverError),
}

impl Error {
   /// Wrap a driver error without changing it.
   pub fn driver<E>(err: E) -> Self
   where
      E: std::error::Error + Send + Sync + 'static,
   {
      Error::Driver(Box::new(err))
   }

   /// Shorthand for [`Error::InvalidSetting`].
   pub(crate) fn invalid_setting(name: &str, reason: impl Into<String>) -> Self {
      Error::InvalidSetting {
         name: name.to_string(),
         reason: reason.into(),
      }
   }

   /// Borrow the driver's original error if this is a driver failure of type `E`.
   pub fn driver_error<E>(&self) -> Option<&E>
   where
      E: std::error::Error + 'static,
   {
      match self {
         Error::Driver(inner) => inner.downcast_ref::<E>(),
         _ => None,
      }
   }

   /// Whether this error comes from bad configuration rather than runtime conditions.
   pub fn is_configuration_error(&self) -> bool {
      matches!(
         self,
         Error::UnknownStrategy(_) | Error::InvalidSetting { .. }
      )
   }

   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::UnknownStrategy(_) => "UNKNOWN_STRATEGY".to_string(),
         Error::InvalidSetting { .. } => "INVALID_SETTING".to_string(),
         Error::PoolExhausted { .. } => "POOL_EXHAUSTED".to_string(),
         Error::ConcurrentCheckout => "CONCURRENT_CHECKOUT".to_string(),
         Error::Driver(_) => "DRIVER_ERROR".to_string(),
      }
   }
}
