use pooled_connect_core::{
   CanonicalKey, ConnectParams, Driver, ParamValue, PoolInstance, PoolManager, PooledConnection,
   SettingsSource,
};
use std::sync::Arc;
use tracing::trace;

use crate::Result;

/// Parameter carrying the driver's type-conversion table.
///
/// The table is a map with non-string keys, so it is frozen into a
/// [`CanonicalKey`] before the parameters are used to route to a sub-pool.
pub const CONVERSIONS_PARAM: &str = "conv";

/// Pooled stand-in for a driver's native connect entry point.
///
/// `PooledDriver<D>` implements [`Driver`] itself, so any code written against
/// `D` through the trait accepts the pooled version unchanged; hosts swap
/// which value they hold rather than patching the driver.
///
/// # Example
///
/// ```
/// use pooled_connect::{ConnectParams, Driver, ParamValue, PooledDriver};
/// use serde_json::json;
///
/// struct Loopback;
///
/// impl Driver for Loopback {
///    type Connection = String;
///    type Error = std::io::Error;
///
///    fn connect(&self, params: &ConnectParams) -> Result<String, std::io::Error> {
///       Ok(params.get("user").and_then(ParamValue::as_str).unwrap_or_default().to_string())
///    }
/// }
///
/// let pooled = PooledDriver::new(Loopback, json!({ "POOL_BACKEND": "QueuePool" }));
///
/// let conn = pooled
///    .connect(&ConnectParams::new().with("user", "app"))
///    .unwrap();
/// assert_eq!(conn.as_str(), "app");
/// ```
pub struct PooledDriver<D: Driver> {
   manager: PoolManager<D>,
}

impl<D: Driver> PooledDriver<D> {
   /// Wrap `driver`. The process pool is built from `settings` on first connect.
   pub fn new(driver: D, settings: impl SettingsSource + 'static) -> Self {
      Self {
         manager: PoolManager::new(driver, settings),
      }
   }

   /// Replace how the current process identity is read.
   pub fn with_process_id<F>(self, process_id: F) -> Self
   where
      F: Fn() -> u32 + Send + Sync + 'static,
   {
      Self {
         manager: self.manager.with_process_id(process_id),
      }
   }

   pub fn manager(&self) -> &PoolManager<D> {
      &self.manager
   }

   /// The current process pool, built or rebuilt as needed.
   pub fn pool(&self) -> Result<Arc<PoolInstance<D>>> {
      Ok(self.manager.get_pool()?)
   }

   /// Check out a pooled connection for `params`.
   ///
   /// Accepts exactly what the wrapped driver accepts. The conversion table,
   /// if any, is frozen so equal tables route to the same sub-pool however
   /// they were built; an empty table is not forwarded.
   pub fn connect(&self, params: &ConnectParams) -> Result<PooledConnection<D::Connection>> {
      let params = freeze_conversions(params.clone());
      Ok(self.manager.get_pool()?.connect(&params)?)
   }
}

impl<D: Driver> Driver for PooledDriver<D> {
   type Connection = PooledConnection<D::Connection>;
   type Error = crate::Error;

   fn connect(&self, params: &ConnectParams) -> Result<Self::Connection> {
      PooledDriver::connect(self, params)
   }
}

/// Replace the conversion table with its hashable form.
pub(crate) fn freeze_conversions(mut params: ConnectParams) -> ConnectParams {
   let Some(conv) = params.remove(CONVERSIONS_PARAM) else {
      return params;
   };

   if conv.is_empty() {
      trace!("Dropping empty conversion table");
      return params;
   }

   let conv = match CanonicalKey::from_value(&conv) {
      Some(key) => ParamValue::Frozen(key),
      None => conv,
   };
   params.insert(CONVERSIONS_PARAM, conv);
   params
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_freeze_conversions_wraps_map() {
      let params = ConnectParams::new()
         .with("conv", ParamValue::map([(0, "x"), (1, "y")]))
         .with("user", "a");

      let frozen = freeze_conversions(params);

      let Some(ParamValue::Frozen(key)) = frozen.get(CONVERSIONS_PARAM) else {
         panic!("conversion table was not frozen");
      };
      assert_eq!(key.len(), 2);
      assert_eq!(key.get(&ParamValue::from(1)), Some(&ParamValue::from("y")));
      assert_eq!(frozen.get("user"), Some(&ParamValue::from("a")));
   }

   #[test]
   fn test_freeze_conversions_drops_empty_table() {
      for empty in [ParamValue::Null, ParamValue::Map(vec![])] {
         let params = ConnectParams::new().with("user", "a").with("conv", empty);

         let frozen = freeze_conversions(params);

         assert!(!frozen.contains(CONVERSIONS_PARAM));
         assert_eq!(frozen.len(), 1);
      }
   }

   #[test]
   fn test_freeze_conversions_leaves_other_params_alone() {
      let params = ConnectParams::new()
         .with("user", "a")
         .with("options", ParamValue::map([("ssl", true)]));

      assert_eq!(freeze_conversions(params.clone()), params);
   }

   #[test]
   fn test_freeze_conversions_keeps_non_map_tables() {
      let params = ConnectParams::new().with("conv", ParamValue::list([1, 2]));

      let frozen = freeze_conversions(params);

      assert_eq!(frozen.get("conv"), Some(&ParamValue::list([1, 2])));
   }
}
