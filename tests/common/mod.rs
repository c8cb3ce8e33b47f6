#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pooled_connect::{ConnectParams, Driver, ParamValue};

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
}

/// Physical connection that remembers the parameters it was opened with
pub struct FakeConnection {
   pub id: usize,
   pub params: ConnectParams,
   counters: Arc<Counters>,
}

impl Drop for FakeConnection {
   fn drop(&mut self) {
      self.counters.closed.fetch_add(1, Ordering::SeqCst);
   }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown database '{0}'")]
pub struct UnknownDatabase(pub String);

/// Driver that only knows the database "app"
#[derive(Clone, Default)]
pub struct FakeDriver {
   pub counters: Arc<Counters>,
}

impl Driver for FakeDriver {
   type Connection = FakeConnection;
   type Error = UnknownDatabase;

   fn connect(&self, params: &ConnectParams) -> Result<FakeConnection, UnknownDatabase> {
      if let Some(db) = params.get("db").and_then(ParamValue::as_str)
         && db != "app"
      {
         return Err(UnknownDatabase(db.to_string()));
      }

      let id = self.counters.opened.fetch_add(1, Ordering::SeqCst) + 1;
      Ok(FakeConnection {
         id,
         params: params.clone(),
         counters: Arc::clone(&self.counters),
      })
   }
}
