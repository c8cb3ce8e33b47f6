use serde::{Serialize, Serializer};

/// Result type alias for shim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for hosts that report errors as data.
#[derive(Serialize)]
struct ErrorResponse {
   code: String,
   message: String,
}

/// Error types for the pooled connect shim.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from the pool: configuration, exhaustion, misuse, or the driver itself.
   #[error(transparent)]
   Pool(#[from] pooled_connect_core::Error),

   /// The process-wide connect entry point was used before a driver was installed.
   #[error("no pooled driver installed; call install() during startup")]
   NotInstalled,

   /// A pooled driver was already installed for this process.
   #[error("a pooled driver is already installed for this process")]
   AlreadyInstalled,

   /// The installed pooled driver wraps a different driver type.
   #[error("installed pooled driver does not wrap {0}")]
   DriverMismatch(&'static str),
}

impl Error {
   /// Borrow the driver's original error if the connect failed in the driver.
   pub fn driver_error<E>(&self) -> Option<&E>
   where
      E: std::error::Error + 'static,
   {
      match self {
         Error::Pool(e) => e.driver_error::<E>(),
         _ => None,
      }
   }

   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for host error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Pool(e) => e.error_code(),
         Error::NotInstalled => "NOT_INSTALLED".to_string(),
         Error::AlreadyInstalled => "ALREADY_INSTALLED".to_string(),
         Error::DriverMismatch(_) => "DRIVER_MISMATCH".to_string(),
      }
   }
}

impl Serialize for Error {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: Serializer,
   {
      let response = ErrorResponse {
         code: self.error_code(),
         message: self.to_string(),
      };
      response.serialize(serializer)
   }
}
