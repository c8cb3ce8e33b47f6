//! No pooling at all

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::Factory;
use crate::Result;
use crate::config::Strategy;
use crate::connection::{Checkin, ConnectionRecord, PooledConnection};
use crate::pool::PoolStatus;

/// Opens a new connection for every checkout and closes it on release.
pub(crate) struct NullPool<C> {
   factory: Factory<C>,
   checked_out: AtomicUsize,
   abandoned: AtomicBool,
}

impl<C: Send + Sync + 'static> NullPool<C> {
   pub(crate) fn new(factory: Factory<C>) -> Self {
      Self {
         factory,
         checked_out: AtomicUsize::new(0),
         abandoned: AtomicBool::new(false),
      }
   }

   pub(crate) fn acquire(self: &Arc<Self>) -> Result<PooledConnection<C>> {
      let record = ConnectionRecord::new((self.factory)()?);
      self.checked_out.fetch_add(1, Ordering::SeqCst);
      Ok(PooledConnection::new(
         record,
         Arc::clone(self) as Arc<dyn Checkin<C>>,
      ))
   }

   pub(crate) fn status(&self) -> PoolStatus {
      let checked_out = self.checked_out.load(Ordering::SeqCst);
      PoolStatus {
         strategy: Strategy::Null,
         idle: 0,
         checked_out,
         total: checked_out,
      }
   }

   pub(crate) fn abandon(&self) {
      self.abandoned.store(true, Ordering::SeqCst);
   }
}

impl<C: Send + Sync + 'static> Checkin<C> for NullPool<C> {
   fn checkin(&self, record: ConnectionRecord<C>) {
      self.checked_out.fetch_sub(1, Ordering::SeqCst);
      if self.abandoned.load(Ordering::SeqCst) {
         record.abandon();
      }
   }

   fn invalidate(&self, record: ConnectionRecord<C>) {
      self.checkin(record);
   }
}
