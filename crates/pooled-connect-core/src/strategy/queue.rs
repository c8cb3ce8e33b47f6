//! Bounded pool shared across callers

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use super::Factory;
use crate::Result;
use crate::config::Strategy;
use crate::connection::{Checkin, ConnectionRecord, PooledConnection};
use crate::error::Error;
use crate::pool::PoolStatus;

struct QueueState<C> {
   idle: VecDeque<ConnectionRecord<C>>,
   /// Open connections, idle or checked out, plus slots reserved for connects in flight
   live: usize,
}

/// Keeps up to `pool_size` idle connections and opens up to `max_overflow`
/// more under load. When every allowed connection is checked out, callers
/// wait up to `timeout` for one to come back.
pub(crate) struct QueuePool<C> {
   factory: Factory<C>,
   pool_size: usize,
   limit: Option<usize>,
   timeout: Duration,
   recycle: Option<Duration>,
   state: Mutex<QueueState<C>>,
   available: Condvar,
   abandoned: AtomicBool,
}

impl<C: Send + Sync + 'static> QueuePool<C> {
   pub(crate) fn new(
      factory: Factory<C>,
      pool_size: usize,
      max_overflow: Option<usize>,
      timeout: Duration,
      recycle: Option<Duration>,
   ) -> Self {
      Self {
         factory,
         pool_size,
         limit: max_overflow.map(|overflow| pool_size.saturating_add(overflow)),
         timeout,
         recycle,
         state: Mutex::new(QueueState {
            idle: VecDeque::new(),
            live: 0,
         }),
         available: Condvar::new(),
         abandoned: AtomicBool::new(false),
      }
   }

   pub(crate) fn acquire(self: &Arc<Self>) -> Result<PooledConnection<C>> {
      // A timeout past what the clock can represent waits without a deadline
      let deadline = Instant::now().checked_add(self.timeout);
      // Declared before the guard so expired connections close after the lock is released
      let mut expired = Vec::new();
      let mut state = self.state.lock();

      loop {
         if let Some(record) = self.pop_fresh(&mut state, &mut expired) {
            return Ok(self.checkout(record));
         }

         if self.limit.is_none_or(|limit| state.live < limit) {
            // Reserve the slot, then connect without holding the lock
            state.live += 1;
            drop(state);
            drop(expired);

            return match (self.factory)() {
               Ok(conn) => {
                  trace!("Opened new connection");
                  Ok(self.checkout(ConnectionRecord::new(conn)))
               }
               Err(e) => {
                  let mut state = self.state.lock();
                  state.live -= 1;
                  self.available.notify_one();
                  Err(e)
               }
            };
         }

         trace!(live = state.live, "Pool exhausted, waiting for a connection");
         let timed_out = match deadline {
            Some(deadline) => self.available.wait_until(&mut state, deadline).timed_out(),
            None => {
               self.available.wait(&mut state);
               false
            }
         };

         if timed_out
            && state.idle.is_empty()
            && let Some(limit) = self.limit
            && state.live >= limit
         {
            return Err(Error::PoolExhausted {
               limit,
               timeout: self.timeout,
            });
         }
      }
   }

   /// Pop the first idle connection that has not outlived the recycle interval.
   fn pop_fresh(
      &self,
      state: &mut QueueState<C>,
      expired: &mut Vec<ConnectionRecord<C>>,
   ) -> Option<ConnectionRecord<C>> {
      while let Some(record) = state.idle.pop_front() {
         if !record.is_expired(self.recycle) {
            return Some(record);
         }
         state.live -= 1;
         debug!(age = ?record.age(), "Recycling expired connection on checkout");
         expired.push(record);
      }
      None
   }

   fn checkout(self: &Arc<Self>, record: ConnectionRecord<C>) -> PooledConnection<C> {
      let pool: Arc<dyn Checkin<C>> = Arc::clone(self) as Arc<dyn Checkin<C>>;
      PooledConnection::new(record, pool)
   }

   pub(crate) fn status(&self) -> PoolStatus {
      let state = self.state.lock();
      PoolStatus {
         strategy: Strategy::Queue,
         idle: state.idle.len(),
         checked_out: state.live - state.idle.len(),
         total: state.live,
      }
   }

   /// Close every idle connection. Checked-out connections are unaffected.
   pub(crate) fn dispose(&self) {
      let closed: Vec<_> = {
         let mut state = self.state.lock();
         let closed: Vec<_> = state.idle.drain(..).collect();
         state.live -= closed.len();
         closed
      };
      debug!(count = closed.len(), "Disposed idle connections");
      self.available.notify_all();
   }

   pub(crate) fn abandon(&self) {
      self.abandoned.store(true, Ordering::SeqCst);
      let mut state = self.state.lock();
      let idle = state.idle.len();
      state.live -= idle;
      state.idle.drain(..).for_each(ConnectionRecord::abandon);
   }
}

impl<C: Send + Sync + 'static> Checkin<C> for QueuePool<C> {
   fn checkin(&self, record: ConnectionRecord<C>) {
      if self.abandoned.load(Ordering::SeqCst) {
         record.abandon();
         return;
      }

      let mut state = self.state.lock();
      if record.is_expired(self.recycle) {
         debug!(age = ?record.age(), "Recycling expired connection on release");
         state.live -= 1;
      } else if state.idle.len() >= self.pool_size {
         trace!("Closing overflow connection");
         state.live -= 1;
      } else {
         state.idle.push_back(record);
         self.available.notify_one();
         return;
      }

      // The slot freed up for someone else to open a new connection
      self.available.notify_one();
      drop(state);
   }

   fn invalidate(&self, record: ConnectionRecord<C>) {
      if self.abandoned.load(Ordering::SeqCst) {
         record.abandon();
         return;
      }

      let mut state = self.state.lock();
      state.live -= 1;
      self.available.notify_one();
      drop(state);
      drop(record);
   }
}
