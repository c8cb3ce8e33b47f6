//! The driver capability being pooled

use crate::params::ConnectParams;

/// A database driver's native connect entry point.
///
/// The pool treats connections as opaque: it only opens them through
/// [`Driver::connect`] and closes them by dropping. Connections are shared
/// between checkouts by some strategies, so they must be `Sync`; drivers whose
/// connections need `&mut` access synchronize internally.
pub trait Driver: Send + Sync + 'static {
   type Connection: Send + Sync + 'static;
   type Error: std::error::Error + Send + Sync + 'static;

   /// Open one physical connection.
   fn connect(&self, params: &ConnectParams) -> Result<Self::Connection, Self::Error>;
}
