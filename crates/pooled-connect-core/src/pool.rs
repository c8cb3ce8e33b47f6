//! Strategy-selected connection pool

use std::sync::Arc;

use serde::Serialize;

use crate::Result;
use crate::config::{PoolConfig, Strategy};
use crate::connection::PooledConnection;
use crate::strategy::{
   AssertionPool, Factory, NullPool, QueuePool, SingletonThreadPool, StaticPool,
};

/// Point-in-time counts for a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
   pub strategy: Strategy,
   /// Open connections nobody is using
   pub idle: usize,
   /// Connections currently handed out
   pub checked_out: usize,
   /// All open connections the pool tracks
   pub total: usize,
}

enum Inner<C> {
   Queue(Arc<QueuePool<C>>),
   SingletonThread(Arc<SingletonThreadPool<C>>),
   Assertion(Arc<AssertionPool<C>>),
   Null(Arc<NullPool<C>>),
   Static(Arc<StaticPool<C>>),
}

/// A pool of connections produced by one factory, run by the configured
/// [`Strategy`]. Cloning is cheap and shares the pool.
pub struct Pool<C: Send + Sync + 'static> {
   inner: Inner<C>,
}

impl<C: Send + Sync + 'static> Clone for Pool<C> {
   fn clone(&self) -> Self {
      let inner = match &self.inner {
         Inner::Queue(pool) => Inner::Queue(Arc::clone(pool)),
         Inner::SingletonThread(pool) => Inner::SingletonThread(Arc::clone(pool)),
         Inner::Assertion(pool) => Inner::Assertion(Arc::clone(pool)),
         Inner::Null(pool) => Inner::Null(Arc::clone(pool)),
         Inner::Static(pool) => Inner::Static(Arc::clone(pool)),
      };
      Self { inner }
   }
}

impl<C: Send + Sync + 'static> Pool<C> {
   /// Build an empty pool; no connection is opened until the first checkout.
   pub fn new(config: &PoolConfig, factory: Factory<C>) -> Self {
      let recycle = if config.strategy.recycles() {
         config.recycle
      } else {
         None
      };

      let inner = match config.strategy {
         Strategy::Queue => Inner::Queue(Arc::new(QueuePool::new(
            factory,
            config.pool_size,
            config.max_overflow,
            config.timeout,
            recycle,
         ))),
         Strategy::SingletonThread => Inner::SingletonThread(Arc::new(SingletonThreadPool::new(
            factory,
            config.pool_size,
            recycle,
         ))),
         Strategy::Assertion => Inner::Assertion(Arc::new(AssertionPool::new(factory))),
         Strategy::Null => Inner::Null(Arc::new(NullPool::new(factory))),
         Strategy::Static => Inner::Static(Arc::new(StaticPool::new(factory))),
      };
      Self { inner }
   }

   /// Check a connection out. Only a queue pool ever blocks here.
   pub fn acquire(&self) -> Result<PooledConnection<C>> {
      match &self.inner {
         Inner::Queue(pool) => pool.acquire(),
         Inner::SingletonThread(pool) => pool.acquire(),
         Inner::Assertion(pool) => pool.acquire(),
         Inner::Null(pool) => pool.acquire(),
         Inner::Static(pool) => pool.acquire(),
      }
   }

   pub fn strategy(&self) -> Strategy {
      match &self.inner {
         Inner::Queue(_) => Strategy::Queue,
         Inner::SingletonThread(_) => Strategy::SingletonThread,
         Inner::Assertion(_) => Strategy::Assertion,
         Inner::Null(_) => Strategy::Null,
         Inner::Static(_) => Strategy::Static,
      }
   }

   pub fn status(&self) -> PoolStatus {
      match &self.inner {
         Inner::Queue(pool) => pool.status(),
         Inner::SingletonThread(pool) => pool.status(),
         Inner::Assertion(pool) => pool.status(),
         Inner::Null(pool) => pool.status(),
         Inner::Static(pool) => pool.status(),
      }
   }

   /// Close idle connections. The pool stays usable and checked-out
   /// connections are closed or kept as usual when released.
   pub fn dispose(&self) {
      match &self.inner {
         Inner::Queue(pool) => pool.dispose(),
         Inner::SingletonThread(pool) => pool.dispose(),
         Inner::Assertion(pool) => pool.dispose(),
         Inner::Null(_) => {}
         Inner::Static(pool) => pool.dispose(),
      }
   }

   /// Let go of every connection without closing it. Connections checked out
   /// now are let go of when released.
   pub(crate) fn abandon(&self) {
      match &self.inner {
         Inner::Queue(pool) => pool.abandon(),
         Inner::SingletonThread(pool) => pool.abandon(),
         Inner::Assertion(pool) => pool.abandon(),
         Inner::Null(pool) => pool.abandon(),
         Inner::Static(pool) => pool.abandon(),
      }
   }
}
