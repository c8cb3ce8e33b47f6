//! Error types for pooled-connect-sqlite

use thiserror::Error;

/// Errors that may occur when opening or using a SQLite connection
#[derive(Error, Debug)]
pub enum Error {
   /// IO error, including failure to start the driver's runtime
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// The connect parameters did not name a database file
   #[error("missing required connect parameter 'database'")]
   MissingDatabase,

   /// A connect parameter had the wrong type
   #[error("connect parameter '{0}' must be a {1}")]
   InvalidParameter(&'static str, &'static str),

   /// The connection was already closed
   #[error("Connection has been closed")]
   ConnectionClosed,
}

/// Result type alias for SQLite driver operations
pub type Result<T> = std::result::Result<T, Error>;
