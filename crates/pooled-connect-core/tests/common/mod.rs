#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pooled_connect_core::{ConnectParams, Driver, Factory, ParamValue};

/// Route pool logging to the test harness output
pub fn init_tracing() {
   let _ = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::TRACE)
      .with_test_writer()
      .try_init();
}

/// Counts physical connections opened and closed
#[derive(Default)]
pub struct Counters {
   opened: AtomicUsize,
   closed: AtomicUsize,
}

impl Counters {
   pub fn opened(&self) -> usize {
      self.opened.load(Ordering::SeqCst)
   }

   pub fn closed(&self) -> usize {
      self.closed.load(Ordering::SeqCst)
   }

   pub fn open(self: &Arc<Self>, user: Option<String>) -> MockConnection {
      let id = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
      MockConnection {
         id,
         user,
         counters: Arc::clone(self),
      }
   }
}

pub struct MockConnection {
   pub id: usize,
   pub user: Option<String>,
   counters: Arc<Counters>,
}

impl Drop for MockConnection {
   fn drop(&mut self) {
      self.counters.closed.fetch_add(1, Ordering::SeqCst);
   }
}

#[derive(Debug, thiserror::Error)]
#[error("access denied for user '{0}'")]
pub struct AccessDenied(pub String);

/// Driver that refuses the user "denied" and counts everything else
#[derive(Clone, Default)]
pub struct MockDriver {
   pub counters: Arc<Counters>,
}

impl Driver for MockDriver {
   type Connection = MockConnection;
   type Error = AccessDenied;

   fn connect(&self, params: &ConnectParams) -> Result<MockConnection, AccessDenied> {
      let user = params
         .get("user")
         .and_then(ParamValue::as_str)
         .map(str::to_string);

      if user.as_deref() == Some("denied") {
         return Err(AccessDenied("denied".into()));
      }
      Ok(self.counters.open(user))
   }
}

/// A pool factory backed by fresh counters
pub fn counting_factory() -> (Factory<MockConnection>, Arc<Counters>) {
   let counters = Arc::new(Counters::default());
   let factory_counters = Arc::clone(&counters);
   let factory: Factory<MockConnection> = Arc::new(move || Ok(factory_counters.open(None)));
   (factory, counters)
}
