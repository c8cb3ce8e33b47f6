//! Single-connection pool that treats concurrent use as a bug

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use super::Factory;
use crate::Result;
use crate::config::Strategy;
use crate::connection::{Checkin, ConnectionRecord, PooledConnection};
use crate::error::Error;
use crate::pool::PoolStatus;

struct AssertionState<C> {
   conn: Option<ConnectionRecord<C>>,
   checked_out: bool,
}

/// Holds at most one connection and allows one checkout at a time.
///
/// A second checkout while the first is outstanding fails immediately with
/// [`Error::ConcurrentCheckout`]; it never waits. Useful for tests that must
/// prove code paths do not hold two connections at once.
pub(crate) struct AssertionPool<C> {
   factory: Factory<C>,
   state: Mutex<AssertionState<C>>,
   abandoned: AtomicBool,
}

impl<C: Send + Sync + 'static> AssertionPool<C> {
   pub(crate) fn new(factory: Factory<C>) -> Self {
      Self {
         factory,
         state: Mutex::new(AssertionState {
            conn: None,
            checked_out: false,
         }),
         abandoned: AtomicBool::new(false),
      }
   }

   pub(crate) fn acquire(self: &Arc<Self>) -> Result<PooledConnection<C>> {
      let existing = {
         let mut state = self.state.lock();
         if state.checked_out {
            warn!("Assertion pool checkout while its connection is in use");
            return Err(Error::ConcurrentCheckout);
         }
         // Claimed before connecting so a concurrent caller fails without waiting
         state.checked_out = true;
         state.conn.clone()
      };

      let record = match existing {
         Some(record) => record,
         None => match (self.factory)() {
            Ok(conn) => {
               let record = ConnectionRecord::new(conn);
               self.state.lock().conn = Some(record.clone());
               record
            }
            Err(e) => {
               self.state.lock().checked_out = false;
               return Err(e);
            }
         },
      };

      Ok(PooledConnection::new(
         record,
         Arc::clone(self) as Arc<dyn Checkin<C>>,
      ))
   }

   pub(crate) fn status(&self) -> PoolStatus {
      let state = self.state.lock();
      let total = usize::from(state.conn.is_some());
      let checked_out = usize::from(state.checked_out);
      PoolStatus {
         strategy: Strategy::Assertion,
         idle: total.saturating_sub(checked_out),
         checked_out,
         total,
      }
   }

   /// Close the connection unless it is checked out.
   pub(crate) fn dispose(&self) {
      let mut state = self.state.lock();
      if !state.checked_out {
         state.conn = None;
      }
   }

   pub(crate) fn abandon(&self) {
      self.abandoned.store(true, Ordering::SeqCst);
      if let Some(record) = self.state.lock().conn.take() {
         record.abandon();
      }
   }
}

impl<C: Send + Sync + 'static> Checkin<C> for AssertionPool<C> {
   fn checkin(&self, record: ConnectionRecord<C>) {
      if self.abandoned.load(Ordering::SeqCst) {
         record.abandon();
         return;
      }
      self.state.lock().checked_out = false;
   }

   fn invalidate(&self, record: ConnectionRecord<C>) {
      if self.abandoned.load(Ordering::SeqCst) {
         record.abandon();
         return;
      }
      let mut state = self.state.lock();
      state.checked_out = false;
      state.conn = None;
      drop(state);
      drop(record);
   }
}
