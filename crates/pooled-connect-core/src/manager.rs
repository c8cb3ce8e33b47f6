//! Process-wide pool that is rebuilt after a fork
//!
//! Forking duplicates open sockets. A pooled connection used by both parent
//! and child desynchronizes the wire protocol for both, and drivers offer no
//! fork hook, so the manager records the process id the pool was built in and
//! compares it on every lookup. On a mismatch the inherited pool is abandoned
//! (its connections are never reused, nor closed from the child) and a fresh
//! one is built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::Result;
use crate::config::{PoolConfig, SettingsSource};
use crate::connection::PooledConnection;
use crate::driver::Driver;
use crate::error::Error;
use crate::key::CanonicalKey;
use crate::params::ConnectParams;
use crate::pool::{Pool, PoolStatus};

/// Reads an opaque, comparable identity of the current process
pub type ProcessId = Arc<dyn Fn() -> u32 + Send + Sync>;

/// The process pool: one sub-pool per distinct parameter group, all sharing
/// one configuration and one driver.
pub struct PoolInstance<D: Driver> {
   driver: Arc<D>,
   config: PoolConfig,
   pid: u32,
   pools: Mutex<HashMap<CanonicalKey, Pool<D::Connection>>>,
}

impl<D: Driver> PoolInstance<D> {
   fn new(driver: Arc<D>, config: PoolConfig, pid: u32) -> Self {
      Self {
         driver,
         config,
         pid,
         pools: Mutex::new(HashMap::new()),
      }
   }

   /// Process id recorded when this instance was built.
   pub fn pid(&self) -> u32 {
      self.pid
   }

   pub fn config(&self) -> &PoolConfig {
      &self.config
   }

   /// Check out a connection for `params`.
   ///
   /// Parameter sets that are equal after normalization share a sub-pool;
   /// the sub-pool opens connections by calling the driver with a copy of the
   /// parameters that created it.
   pub fn connect(&self, params: &ConnectParams) -> Result<PooledConnection<D::Connection>> {
      self.pool_for(params).acquire()
   }

   fn pool_for(&self, params: &ConnectParams) -> Pool<D::Connection> {
      let key = CanonicalKey::from_params(params);
      let mut pools = self.pools.lock();
      pools
         .entry(key)
         .or_insert_with(|| {
            debug!(
               strategy = %self.config.strategy,
               "Creating pool for new parameter group"
            );
            let driver = Arc::clone(&self.driver);
            let params = params.clone();
            Pool::new(
               &self.config,
               Arc::new(move || driver.connect(&params).map_err(Error::driver)),
            )
         })
         .clone()
   }

   /// Number of distinct parameter groups seen so far.
   pub fn sub_pool_count(&self) -> usize {
      self.pools.lock().len()
   }

   /// Status of the sub-pool serving `params`, if one exists.
   pub fn status(&self, params: &ConnectParams) -> Option<PoolStatus> {
      let key = CanonicalKey::from_params(params);
      self.pools.lock().get(&key).map(Pool::status)
   }

   /// Close idle connections of every sub-pool.
   pub fn dispose(&self) {
      for pool in self.pools.lock().values() {
         pool.dispose();
      }
   }

   fn abandon(&self) {
      for pool in self.pools.lock().drain().map(|(_, pool)| pool) {
         pool.abandon();
      }
   }
}

impl<D: Driver> fmt::Debug for PoolInstance<D> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("PoolInstance")
         .field("pid", &self.pid)
         .field("config", &self.config)
         .field("sub_pools", &self.sub_pool_count())
         .finish()
   }
}

/// Owns the process pool: builds it lazily from settings on first use and
/// rebuilds it when the process identity changes.
///
/// Construction and rebuild happen under a mutex, so concurrent first use
/// from several threads builds exactly one instance.
///
/// # Example
///
/// ```
/// use pooled_connect_core::{ConnectParams, Driver, PoolManager};
/// use std::sync::Arc;
///
/// struct Echo;
///
/// impl Driver for Echo {
///    type Connection = String;
///    type Error = std::io::Error;
///
///    fn connect(&self, params: &ConnectParams) -> Result<String, std::io::Error> {
///       Ok(format!("{params:?}"))
///    }
/// }
///
/// let manager = PoolManager::new(Echo, ());
/// let first = manager.get_pool().unwrap();
/// let second = manager.get_pool().unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
///
/// let conn = first.connect(&ConnectParams::new().with("user", "app")).unwrap();
/// assert!(conn.contains("app"));
/// ```
pub struct PoolManager<D: Driver> {
   driver: Arc<D>,
   settings: Box<dyn SettingsSource>,
   process_id: ProcessId,
   instance: Mutex<Option<Arc<PoolInstance<D>>>>,
}

impl<D: Driver> PoolManager<D> {
   /// Create a manager. Nothing is built until the first [`get_pool`](Self::get_pool).
   pub fn new(driver: D, settings: impl SettingsSource + 'static) -> Self {
      Self {
         driver: Arc::new(driver),
         settings: Box::new(settings),
         process_id: Arc::new(std::process::id),
         instance: Mutex::new(None),
      }
   }

   /// Replace how the current process identity is read.
   pub fn with_process_id<F>(mut self, process_id: F) -> Self
   where
      F: Fn() -> u32 + Send + Sync + 'static,
   {
      self.process_id = Arc::new(process_id);
      self
   }

   pub fn driver(&self) -> &D {
      &self.driver
   }

   /// Return the process pool, building it if absent or if it was built by
   /// another process.
   ///
   /// Fails with a configuration error if the settings name an unknown
   /// strategy or carry malformed arguments.
   pub fn get_pool(&self) -> Result<Arc<PoolInstance<D>>> {
      let pid = (self.process_id)();
      let mut slot = self.instance.lock();

      if let Some(existing) = slot.as_ref() {
         if existing.pid() == pid {
            return Ok(Arc::clone(existing));
         }

         warn!(
            built_in = existing.pid(),
            current = pid,
            "Process identity changed; abandoning inherited connection pool"
         );
         existing.abandon();
         *slot = None;
      }

      let config = PoolConfig::from_settings(self.settings.as_ref())?;
      debug!(
         pid,
         strategy = %config.strategy,
         pool_size = config.pool_size,
         recycle = ?config.recycle,
         "Building process connection pool"
      );

      let instance = Arc::new(PoolInstance::new(Arc::clone(&self.driver), config, pid));
      *slot = Some(Arc::clone(&instance));
      Ok(instance)
   }

   /// Check out a connection from the process pool.
   pub fn connect(&self, params: &ConnectParams) -> Result<PooledConnection<D::Connection>> {
      self.get_pool()?.connect(params)
   }
}

impl<D: Driver> fmt::Debug for PoolManager<D> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("PoolManager")
         .field("instance", &*self.instance.lock())
         .finish()
   }
}
