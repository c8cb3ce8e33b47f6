//! One connection per thread

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::Factory;
use crate::Result;
use crate::config::Strategy;
use crate::connection::{Checkin, ConnectionRecord, PooledConnection};
use crate::pool::PoolStatus;

/// Gives every calling thread its own connection, never shared with another
/// thread. Repeated checkouts on one thread share that thread's connection.
///
/// At most `pool_size` thread connections are tracked; when a new thread
/// pushes past that, connections of other threads that are not in use are
/// closed.
pub(crate) struct SingletonThreadPool<C> {
   factory: Factory<C>,
   pool_size: usize,
   recycle: Option<Duration>,
   threads: Mutex<HashMap<ThreadId, ConnectionRecord<C>>>,
   abandoned: AtomicBool,
}

/// The map's own reference plus nothing else means the connection is idle.
fn in_use<C>(record: &ConnectionRecord<C>) -> bool {
   Arc::strong_count(&record.conn) > 1
}

impl<C: Send + Sync + 'static> SingletonThreadPool<C> {
   pub(crate) fn new(factory: Factory<C>, pool_size: usize, recycle: Option<Duration>) -> Self {
      Self {
         factory,
         pool_size,
         recycle,
         threads: Mutex::new(HashMap::new()),
         abandoned: AtomicBool::new(false),
      }
   }

   pub(crate) fn acquire(self: &Arc<Self>) -> Result<PooledConnection<C>> {
      let id = thread::current().id();

      let existing = {
         let mut threads = self.threads.lock();
         match threads.get(&id) {
            Some(record) if in_use(record) || !record.is_expired(self.recycle) => {
               Some(record.clone())
            }
            Some(_) => {
               debug!(thread = ?id, "Recycling expired thread connection");
               threads.remove(&id);
               None
            }
            None => None,
         }
      };

      let record = match existing {
         Some(record) => record,
         None => {
            // Only this thread ever inserts under its own id, so connecting
            // outside the lock cannot race with another insert for `id`.
            let record = ConnectionRecord::new((self.factory)()?);
            trace!(thread = ?id, "Opened thread connection");
            let evicted = {
               let mut threads = self.threads.lock();
               threads.insert(id, record.clone());
               self.evict_idle(&mut threads, id)
            };
            drop(evicted);
            record
         }
      };

      Ok(PooledConnection::new(
         record,
         Arc::clone(self) as Arc<dyn Checkin<C>>,
      ))
   }

   /// Drop idle connections of other threads while over `pool_size`.
   fn evict_idle(
      &self,
      threads: &mut HashMap<ThreadId, ConnectionRecord<C>>,
      keep: ThreadId,
   ) -> Vec<ConnectionRecord<C>> {
      let mut evicted = Vec::new();
      if threads.len() <= self.pool_size {
         return evicted;
      }

      let candidates: Vec<ThreadId> = threads
         .iter()
         .filter(|(id, record)| **id != keep && !in_use(record))
         .map(|(id, _)| *id)
         .collect();

      for id in candidates {
         if threads.len() <= self.pool_size {
            break;
         }
         if let Some(record) = threads.remove(&id) {
            evicted.push(record);
         }
      }
      debug!(count = evicted.len(), "Evicted idle thread connections");
      evicted
   }

   pub(crate) fn status(&self) -> PoolStatus {
      let threads = self.threads.lock();
      let checked_out = threads.values().filter(|record| in_use(record)).count();
      PoolStatus {
         strategy: Strategy::SingletonThread,
         idle: threads.len() - checked_out,
         checked_out,
         total: threads.len(),
      }
   }

   /// Stop tracking every thread connection. Idle ones close now, checked-out
   /// ones close when released.
   pub(crate) fn dispose(&self) {
      let disposed: Vec<_> = self.threads.lock().drain().collect();
      debug!(count = disposed.len(), "Disposed thread connections");
   }

   pub(crate) fn abandon(&self) {
      self.abandoned.store(true, Ordering::SeqCst);
      self
         .threads
         .lock()
         .drain()
         .for_each(|(_, record)| record.abandon());
   }

   /// Remove `record` from its thread slot if it is still the tracked one.
   fn untrack(&self, record: &ConnectionRecord<C>) -> Option<ConnectionRecord<C>> {
      let mut threads = self.threads.lock();
      let id = threads
         .iter()
         .find(|(_, tracked)| Arc::ptr_eq(&tracked.conn, &record.conn))
         .map(|(id, _)| *id)?;
      threads.remove(&id)
   }
}

impl<C: Send + Sync + 'static> Checkin<C> for SingletonThreadPool<C> {
   fn checkin(&self, record: ConnectionRecord<C>) {
      if self.abandoned.load(Ordering::SeqCst) {
         record.abandon();
         return;
      }

      // Tracked copy plus this one: nobody else on the thread still uses it
      if Arc::strong_count(&record.conn) == 2 && record.is_expired(self.recycle) {
         debug!(age = ?record.age(), "Recycling expired thread connection on release");
         let tracked = self.untrack(&record);
         drop(tracked);
      }
   }

   fn invalidate(&self, record: ConnectionRecord<C>) {
      if self.abandoned.load(Ordering::SeqCst) {
         record.abandon();
         return;
      }
      let tracked = self.untrack(&record);
      drop(tracked);
   }
}
