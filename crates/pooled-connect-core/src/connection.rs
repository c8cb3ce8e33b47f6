//! Checkout handle for pooled connections

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

/// A physical connection together with its creation time
pub(crate) struct ConnectionRecord<C> {
   pub(crate) conn: Arc<C>,
   pub(crate) created_at: Instant,
}

impl<C> ConnectionRecord<C> {
   pub(crate) fn new(conn: C) -> Self {
      Self {
         conn: Arc::new(conn),
         created_at: Instant::now(),
      }
   }

   pub(crate) fn age(&self) -> Duration {
      self.created_at.elapsed()
   }

   /// Whether the connection is older than the recycle interval.
   pub(crate) fn is_expired(&self, recycle: Option<Duration>) -> bool {
      recycle.is_some_and(|max_age| self.age() > max_age)
   }

   /// Give up the connection without running its destructor.
   ///
   /// Used after a fork: the socket still belongs to the parent process and
   /// closing it from the child would end the parent's session.
   pub(crate) fn abandon(self) {
      std::mem::forget(self.conn);
   }
}

impl<C> Clone for ConnectionRecord<C> {
   fn clone(&self) -> Self {
      Self {
         conn: Arc::clone(&self.conn),
         created_at: self.created_at,
      }
   }
}

/// Where a checked-out connection goes back to
pub(crate) trait Checkin<C>: Send + Sync {
   /// Return a connection after use.
   fn checkin(&self, record: ConnectionRecord<C>);

   /// Discard a connection the caller found to be broken.
   fn invalidate(&self, record: ConnectionRecord<C>);
}

/// A connection checked out of a pool.
///
/// Derefs to the driver connection. Dropping the handle returns the
/// connection to the pool it came from, which decides (per strategy and
/// recycle interval) whether to keep or close it.
pub struct PooledConnection<C: Send + Sync + 'static> {
   record: Option<ConnectionRecord<C>>,
   pool: Arc<dyn Checkin<C>>,
}

impl<C: Send + Sync + 'static> PooledConnection<C> {
   pub(crate) fn new(record: ConnectionRecord<C>, pool: Arc<dyn Checkin<C>>) -> Self {
      trace!("Checked out connection");
      Self {
         record: Some(record),
         pool,
      }
   }

   fn record(&self) -> &ConnectionRecord<C> {
      self
         .record
         .as_ref()
         .expect("record is present until the handle is consumed")
   }

   /// Time since the physical connection was opened.
   pub fn age(&self) -> Duration {
      self.record().age()
   }

   /// Whether two handles refer to the same physical connection.
   pub fn same_connection(&self, other: &Self) -> bool {
      Arc::ptr_eq(&self.record().conn, &other.record().conn)
   }

   /// Return the connection to its pool now. Same as dropping the handle.
   pub fn release(self) {
      drop(self);
   }

   /// Discard the physical connection instead of returning it, e.g. after a
   /// network error left it unusable.
   pub fn invalidate(mut self) {
      if let Some(record) = self.record.take() {
         trace!("Invalidating connection");
         self.pool.invalidate(record);
      }
   }
}

impl<C: Send + Sync + 'static> Deref for PooledConnection<C> {
   type Target = C;

   fn deref(&self) -> &Self::Target {
      &self.record().conn
   }
}

impl<C: Send + Sync + 'static> Drop for PooledConnection<C> {
   fn drop(&mut self) {
      if let Some(record) = self.record.take() {
         trace!("Returning connection to pool");
         self.pool.checkin(record);
      }
   }
}

impl<C: Send + Sync + 'static> fmt::Debug for PooledConnection<C> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("PooledConnection")
         .field("age", &self.record.as_ref().map(ConnectionRecord::age))
         .finish()
   }
}
