//! Blocking SQLite driver

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use pooled_connect_core::{ConnectParams, Driver, ParamValue};
use sqlx::ConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::connection::SqliteConn;
use crate::error::{Error, Result};

/// Path to the database file. Required.
pub const DATABASE_PARAM: &str = "database";

/// Open the database read-only. Default: false
pub const READ_ONLY_PARAM: &str = "read_only";

/// Create the database file if it does not exist. Default: true unless read-only
pub const CREATE_IF_MISSING_PARAM: &str = "create_if_missing";

/// SQLite driver with a blocking connect entry point.
///
/// The driver owns a small tokio runtime and blocks on sqlx futures with it,
/// so connections can be opened and used from plain threads. Do not call it
/// from inside another async runtime.
///
/// # Example
///
/// ```no_run
/// use pooled_connect_core::{ConnectParams, PoolManager};
/// use pooled_connect_sqlite::SqliteDriver;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = PoolManager::new(SqliteDriver::new()?, ());
/// let params = ConnectParams::new().with("database", "app.db");
///
/// let conn = manager.connect(&params)?;
/// conn.execute("CREATE TABLE IF NOT EXISTS t (x INTEGER)")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqliteDriver {
   runtime: Arc<Runtime>,
}

impl SqliteDriver {
   pub fn new() -> Result<Self> {
      let runtime = Builder::new_multi_thread()
         .worker_threads(1)
         .thread_name("pooled-connect-sqlite")
         .enable_all()
         .build()?;

      Ok(Self {
         runtime: Arc::new(runtime),
      })
   }
}

impl Driver for SqliteDriver {
   type Connection = SqliteConn;
   type Error = Error;

   fn connect(&self, params: &ConnectParams) -> Result<SqliteConn> {
      let database = params
         .get(DATABASE_PARAM)
         .ok_or(Error::MissingDatabase)?
         .as_str()
         .ok_or(Error::InvalidParameter(DATABASE_PARAM, "string"))?;

      let read_only = bool_param(params, READ_ONLY_PARAM)?.unwrap_or(false);
      let create_if_missing = bool_param(params, CREATE_IF_MISSING_PARAM)?.unwrap_or(!read_only);

      let options = if is_memory_database(Path::new(database)) {
         SqliteConnectOptions::from_str("sqlite::memory:")?
      } else {
         SqliteConnectOptions::new()
            .filename(database)
            .create_if_missing(create_if_missing)
            .read_only(read_only)
      };

      debug!(database, read_only, create_if_missing, "Opening SQLite connection");
      let conn = self.runtime.block_on(options.connect())?;

      Ok(SqliteConn::new(Arc::clone(&self.runtime), conn))
   }
}

fn bool_param(params: &ConnectParams, name: &'static str) -> Result<Option<bool>> {
   match params.get(name) {
      None | Some(ParamValue::Null) => Ok(None),
      Some(value) => value
         .as_bool()
         .map(Some)
         .ok_or(Error::InvalidParameter(name, "bool")),
   }
}

fn is_memory_database(path: &Path) -> bool {
   path.as_os_str() == ":memory:"
}
