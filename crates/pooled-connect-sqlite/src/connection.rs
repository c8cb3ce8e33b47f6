use std::sync::Arc;

use parking_lot::Mutex;
use sqlx::Connection;
use sqlx::sqlite::SqliteConnection;
use tokio::runtime::Runtime;
use tracing::{trace, warn};

use crate::error::{Error, Result};

/// A physical SQLite connection with blocking query methods.
///
/// Statements are serialized by an internal lock, so one connection can be
/// shared across threads by the pool strategies that share connections.
/// The connection is closed when dropped.
pub struct SqliteConn {
   runtime: Arc<Runtime>,
   conn: Mutex<Option<SqliteConnection>>,
}

impl SqliteConn {
   pub(crate) fn new(runtime: Arc<Runtime>, conn: SqliteConnection) -> Self {
      Self {
         runtime,
         conn: Mutex::new(Some(conn)),
      }
   }

   /// Execute a statement and return the number of rows affected
   pub fn execute(&self, sql: &str) -> Result<u64> {
      let mut guard = self.conn.lock();
      let conn = guard.as_mut().ok_or(Error::ConnectionClosed)?;

      let result = self.runtime.block_on(sqlx::query(sql).execute(&mut *conn))?;
      Ok(result.rows_affected())
   }

   /// Run a query and return the first column of its first row as an integer
   pub fn fetch_i64(&self, sql: &str) -> Result<i64> {
      let mut guard = self.conn.lock();
      let conn = guard.as_mut().ok_or(Error::ConnectionClosed)?;

      let value = self
         .runtime
         .block_on(sqlx::query_scalar::<_, i64>(sql).fetch_one(&mut *conn))?;
      Ok(value)
   }

   /// Close the connection now instead of on drop
   pub fn close(&self) -> Result<()> {
      let Some(conn) = self.conn.lock().take() else {
         return Ok(());
      };

      trace!("Closing SQLite connection");
      self.runtime.block_on(conn.close())?;
      Ok(())
   }
}

impl Drop for SqliteConn {
   fn drop(&mut self) {
      if let Err(e) = self.close() {
         warn!(error = %e, "Failed to close SQLite connection cleanly");
      }
   }
}
