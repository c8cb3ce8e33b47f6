//! A single connection shared by every caller

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use super::Factory;
use crate::Result;
use crate::config::Strategy;
use crate::connection::{Checkin, ConnectionRecord, PooledConnection};
use crate::pool::PoolStatus;

/// Opens exactly one connection, on first checkout, and hands it to every
/// caller without exclusion. Release is a no-op.
pub(crate) struct StaticPool<C> {
   factory: Factory<C>,
   conn: Mutex<Option<ConnectionRecord<C>>>,
   abandoned: AtomicBool,
}

impl<C: Send + Sync + 'static> StaticPool<C> {
   pub(crate) fn new(factory: Factory<C>) -> Self {
      Self {
         factory,
         conn: Mutex::new(None),
         abandoned: AtomicBool::new(false),
      }
   }

   pub(crate) fn acquire(self: &Arc<Self>) -> Result<PooledConnection<C>> {
      let record = {
         let mut slot = self.conn.lock();
         match slot.as_ref() {
            Some(record) => record.clone(),
            None => {
               let record = ConnectionRecord::new((self.factory)()?);
               debug!("Opened static connection");
               *slot = Some(record.clone());
               record
            }
         }
      };

      Ok(PooledConnection::new(
         record,
         Arc::clone(self) as Arc<dyn Checkin<C>>,
      ))
   }

   pub(crate) fn status(&self) -> PoolStatus {
      let slot = self.conn.lock();
      let total = usize::from(slot.is_some());
      let checked_out = slot
         .as_ref()
         .map_or(0, |record| Arc::strong_count(&record.conn) - 1);
      PoolStatus {
         strategy: Strategy::Static,
         idle: total - usize::from(checked_out > 0),
         checked_out,
         total,
      }
   }

   /// Forget the shared connection; it closes once its last user releases it
   /// and the next checkout opens a new one.
   pub(crate) fn dispose(&self) {
      let disposed = self.conn.lock().take();
      drop(disposed);
   }

   pub(crate) fn abandon(&self) {
      self.abandoned.store(true, Ordering::SeqCst);
      if let Some(record) = self.conn.lock().take() {
         record.abandon();
      }
   }
}

impl<C: Send + Sync + 'static> Checkin<C> for StaticPool<C> {
   fn checkin(&self, record: ConnectionRecord<C>) {
      if self.abandoned.load(Ordering::SeqCst) {
         record.abandon();
      }
   }

   fn invalidate(&self, record: ConnectionRecord<C>) {
      if self.abandoned.load(Ordering::SeqCst) {
         record.abandon();
         return;
      }
      let mut slot = self.conn.lock();
      if slot
         .as_ref()
         .is_some_and(|tracked| Arc::ptr_eq(&tracked.conn, &record.conn))
      {
         *slot = None;
      }
   }
}
