//! Pool configuration and the settings it is read from

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::Result;
use crate::error::Error;

/// Setting naming the pool strategy, e.g. `"QueuePool"`
pub const BACKEND_SETTING: &str = "POOL_BACKEND";

/// Setting holding an object of strategy arguments
pub const ARGUMENTS_SETTING: &str = "POOL_ARGUMENTS";

/// Setting holding the recycle interval in seconds
pub const RECYCLE_SETTING: &str = "POOL_RECYCLE";

/// Default recycle interval in seconds.
///
/// Needs to be below the server's idle connection timeout; MySQL's common
/// 120 second setting gives 119.
pub const DEFAULT_RECYCLE_SECS: u64 = 119;

/// Read access to the host's configuration.
///
/// Returning `None` means the setting is unset and the documented default applies.
pub trait SettingsSource: Send + Sync {
   fn setting(&self, name: &str) -> Option<JsonValue>;
}

/// No settings at all; every option takes its default.
impl SettingsSource for () {
   fn setting(&self, _name: &str) -> Option<JsonValue> {
      None
   }
}

impl<S: SettingsSource + ?Sized> SettingsSource for Box<S> {
   fn setting(&self, name: &str) -> Option<JsonValue> {
      (**self).setting(name)
   }
}

impl SettingsSource for HashMap<String, JsonValue> {
   fn setting(&self, name: &str) -> Option<JsonValue> {
      self.get(name).cloned()
   }
}

impl SettingsSource for JsonMap<String, JsonValue> {
   fn setting(&self, name: &str) -> Option<JsonValue> {
      self.get(name).cloned()
   }
}

/// Looks settings up as fields of a JSON object; any other value has no settings.
impl SettingsSource for JsonValue {
   fn setting(&self, name: &str) -> Option<JsonValue> {
      self.get(name).cloned()
   }
}

/// Pooling policy, selected by name in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
   /// Bounded set of connections shared across callers (`QueuePool`)
   #[default]
   #[serde(rename = "QueuePool")]
   Queue,
   /// One connection per thread (`SingletonThreadPool`)
   #[serde(rename = "SingletonThreadPool")]
   SingletonThread,
   /// A single connection, concurrent checkout is an error (`AssertionPool`)
   #[serde(rename = "AssertionPool")]
   Assertion,
   /// No pooling (`NullPool`)
   #[serde(rename = "NullPool")]
   Null,
   /// One connection shared by everyone (`StaticPool`)
   #[serde(rename = "StaticPool")]
   Static,
}

impl Strategy {
   pub const ALL: [Strategy; 5] = [
      Strategy::Queue,
      Strategy::SingletonThread,
      Strategy::Assertion,
      Strategy::Null,
      Strategy::Static,
   ];

   /// The configuration name of this strategy.
   pub fn name(self) -> &'static str {
      match self {
         Strategy::Queue => "QueuePool",
         Strategy::SingletonThread => "SingletonThreadPool",
         Strategy::Assertion => "AssertionPool",
         Strategy::Null => "NullPool",
         Strategy::Static => "StaticPool",
      }
   }

   /// Whether connections of this strategy are retired by age.
   pub fn recycles(self) -> bool {
      matches!(self, Strategy::Queue | Strategy::SingletonThread)
   }
}

impl fmt::Display for Strategy {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.name())
   }
}

impl FromStr for Strategy {
   type Err = Error;

   fn from_str(s: &str) -> Result<Self> {
      Strategy::ALL
         .into_iter()
         .find(|strategy| strategy.name() == s)
         .ok_or_else(|| Error::UnknownStrategy(s.to_string()))
   }
}

/// Strategy arguments as they appear in [`ARGUMENTS_SETTING`]
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoolArguments {
   poolclass: Option<String>,
   pool_size: Option<usize>,
   max_overflow: Option<i64>,
   timeout: Option<f64>,
   recycle: Option<i64>,
}

/// Resolved configuration for the process pool
///
/// # Examples
///
/// ```
/// use pooled_connect_core::{PoolConfig, Strategy};
/// use std::time::Duration;
///
/// // Use defaults
/// let config = PoolConfig::default();
/// assert_eq!(config.strategy, Strategy::Queue);
///
/// // Override a few fields
/// let config = PoolConfig::new()
///    .with_strategy(Strategy::SingletonThread)
///    .with_recycle(None);
///
/// // Or read them from settings
/// let settings = serde_json::json!({
///    "POOL_BACKEND": "QueuePool",
///    "POOL_ARGUMENTS": {"pool_size": 2, "max_overflow": 0, "timeout": 0.5},
/// });
/// let config = PoolConfig::from_settings(&settings).unwrap();
/// assert_eq!(config.connection_limit(), Some(2));
/// assert_eq!(config.timeout, Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolConfig {
   /// Pooling policy
   ///
   /// Default: [`Strategy::Queue`]
   pub strategy: Strategy,

   /// Connections kept idle by a queue pool, or threads tracked by a
   /// singleton-thread pool
   ///
   /// Default: 5
   pub pool_size: usize,

   /// Connections a queue pool may open beyond `pool_size`. These are closed
   /// on release instead of kept idle. `None` means unbounded.
   ///
   /// Default: 10
   pub max_overflow: Option<usize>,

   /// How long a queue pool waits for a connection before giving up
   ///
   /// Default: 30 seconds
   pub timeout: Duration,

   /// Maximum connection age. Older connections are closed on release rather
   /// than reused. `None` disables recycling.
   ///
   /// Default: 119 seconds
   pub recycle: Option<Duration>,
}

impl Default for PoolConfig {
   fn default() -> Self {
      Self {
         strategy: Strategy::Queue,
         pool_size: 5,
         max_overflow: Some(10),
         timeout: Duration::from_secs(30),
         recycle: Some(Duration::from_secs(DEFAULT_RECYCLE_SECS)),
      }
   }
}

impl PoolConfig {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn with_strategy(mut self, strategy: Strategy) -> Self {
      self.strategy = strategy;
      self
   }

   pub fn with_pool_size(mut self, pool_size: usize) -> Self {
      self.pool_size = pool_size;
      self
   }

   pub fn with_max_overflow(mut self, max_overflow: Option<usize>) -> Self {
      self.max_overflow = max_overflow;
      self
   }

   pub fn with_timeout(mut self, timeout: Duration) -> Self {
      self.timeout = timeout;
      self
   }

   pub fn with_recycle(mut self, recycle: Option<Duration>) -> Self {
      self.recycle = recycle;
      self
   }

   /// Maximum number of live connections a queue pool may hold, `None` if unbounded.
   pub fn connection_limit(&self) -> Option<usize> {
      self.max_overflow.map(|overflow| self.pool_size.saturating_add(overflow))
   }

   /// Build the configuration from the host's settings.
   ///
   /// The strategy comes from `poolclass` in [`ARGUMENTS_SETTING`], then
   /// [`BACKEND_SETTING`]; the recycle interval from `recycle` in
   /// [`ARGUMENTS_SETTING`], then [`RECYCLE_SETTING`]. Anything unset takes its
   /// default. An unknown strategy name or malformed argument is an error,
   /// never silently defaulted.
   pub fn from_settings(settings: &dyn SettingsSource) -> Result<Self> {
      let defaults = Self::default();

      let arguments = match settings.setting(ARGUMENTS_SETTING) {
         None | Some(JsonValue::Null) => PoolArguments::default(),
         Some(value @ JsonValue::Object(_)) => serde_json::from_value(value)
            .map_err(|e| Error::invalid_setting(ARGUMENTS_SETTING, e.to_string()))?,
         Some(other) => {
            return Err(Error::invalid_setting(
               ARGUMENTS_SETTING,
               format!("expected an object, got {other}"),
            ));
         }
      };

      let strategy = match arguments.poolclass {
         Some(name) => name.parse()?,
         None => match settings.setting(BACKEND_SETTING) {
            None | Some(JsonValue::Null) => defaults.strategy,
            Some(JsonValue::String(name)) => name.parse()?,
            Some(other) => {
               return Err(Error::invalid_setting(
                  BACKEND_SETTING,
                  format!("expected a strategy name, got {other}"),
               ));
            }
         },
      };

      let recycle_secs = match arguments.recycle {
         Some(secs) => secs,
         None => match settings.setting(RECYCLE_SETTING) {
            None | Some(JsonValue::Null) => DEFAULT_RECYCLE_SECS as i64,
            Some(value) => value.as_i64().ok_or_else(|| {
               Error::invalid_setting(
                  RECYCLE_SETTING,
                  format!("expected whole seconds, got {value}"),
               )
            })?,
         },
      };
      let recycle = u64::try_from(recycle_secs).ok().map(Duration::from_secs);

      let timeout = match arguments.timeout {
         None => defaults.timeout,
         Some(secs) => Duration::try_from_secs_f64(secs).map_err(|e| {
            Error::invalid_setting(
               ARGUMENTS_SETTING,
               format!("timeout must be a non-negative number of seconds, got {secs}: {e}"),
            )
         })?,
      };

      let max_overflow = match arguments.max_overflow {
         None => defaults.max_overflow,
         Some(-1) => None,
         Some(n) => Some(usize::try_from(n).map_err(|_| {
            Error::invalid_setting(
               ARGUMENTS_SETTING,
               format!("max_overflow must be -1 or a non-negative count, got {n}"),
            )
         })?),
      };

      let config = Self {
         strategy,
         pool_size: arguments.pool_size.unwrap_or(defaults.pool_size),
         max_overflow,
         timeout,
         recycle,
      };
      config.validate()?;
      Ok(config)
   }

   fn validate(&self) -> Result<()> {
      if self.strategy == Strategy::Queue && self.connection_limit() == Some(0) {
         return Err(Error::invalid_setting(
            ARGUMENTS_SETTING,
            "pool_size and max_overflow together allow no connections",
         ));
      }
      if self.strategy == Strategy::SingletonThread && self.pool_size == 0 {
         return Err(Error::invalid_setting(
            ARGUMENTS_SETTING,
            "pool_size must be at least 1",
         ));
      }
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   #[test]
   fn test_defaults_without_settings() {
      let config = PoolConfig::from_settings(&()).unwrap();

      assert_eq!(config, PoolConfig::default());
      assert_eq!(config.recycle, Some(Duration::from_secs(119)));
      assert_eq!(config.connection_limit(), Some(15));
   }

   #[test]
   fn test_strategy_names_round_trip() {
      for strategy in Strategy::ALL {
         assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
      }
   }

   #[test]
   fn test_unknown_strategy_is_fatal() {
      let settings = json!({ "POOL_BACKEND": "FancyPool" });
      let err = PoolConfig::from_settings(&settings).unwrap_err();

      assert!(matches!(err, Error::UnknownStrategy(name) if name == "FancyPool"));
   }

   #[test]
   fn test_poolclass_argument_overrides_backend() {
      let settings = json!({
         "POOL_BACKEND": "QueuePool",
         "POOL_ARGUMENTS": { "poolclass": "NullPool" },
      });

      let config = PoolConfig::from_settings(&settings).unwrap();
      assert_eq!(config.strategy, Strategy::Null);
   }

   #[test]
   fn test_recycle_precedence() {
      let settings = json!({ "POOL_RECYCLE": 60 });
      let config = PoolConfig::from_settings(&settings).unwrap();
      assert_eq!(config.recycle, Some(Duration::from_secs(60)));

      let settings = json!({ "POOL_RECYCLE": 60, "POOL_ARGUMENTS": { "recycle": 10 } });
      let config = PoolConfig::from_settings(&settings).unwrap();
      assert_eq!(config.recycle, Some(Duration::from_secs(10)));

      let settings = json!({ "POOL_ARGUMENTS": { "recycle": -1 } });
      let config = PoolConfig::from_settings(&settings).unwrap();
      assert_eq!(config.recycle, None);
   }

   #[test]
   fn test_unbounded_overflow() {
      let settings = json!({ "POOL_ARGUMENTS": { "max_overflow": -1 } });
      let config = PoolConfig::from_settings(&settings).unwrap();

      assert_eq!(config.max_overflow, None);
      assert_eq!(config.connection_limit(), None);
   }

   #[test]
   fn test_invalid_arguments() {
      let cases = [
         json!({ "POOL_ARGUMENTS": { "pool_sise": 3 } }),
         json!({ "POOL_ARGUMENTS": "pool_size=3" }),
         json!({ "POOL_ARGUMENTS": { "timeout": -1.0 } }),
         json!({ "POOL_ARGUMENTS": { "timeout": 1e20 } }),
         json!({ "POOL_ARGUMENTS": { "max_overflow": -2 } }),
         json!({ "POOL_ARGUMENTS": { "pool_size": 0, "max_overflow": 0 } }),
         json!({ "POOL_BACKEND": 3 }),
         json!({ "POOL_RECYCLE": "soon" }),
      ];

      for settings in cases {
         let err = PoolConfig::from_settings(&settings).unwrap_err();
         assert!(
            matches!(err, Error::InvalidSetting { .. }),
            "expected invalid setting for {settings}, got {err:?}"
         );
      }
   }

   #[test]
   fn test_huge_counts_saturate_connection_limit() {
      let settings = json!({
         "POOL_ARGUMENTS": { "pool_size": usize::MAX, "max_overflow": 10 },
      });
      let config = PoolConfig::from_settings(&settings).unwrap();

      assert_eq!(config.connection_limit(), Some(usize::MAX));
   }

   #[test]
   fn test_hash_map_settings() {
      let mut settings = HashMap::new();
      settings.insert(BACKEND_SETTING.to_string(), json!("StaticPool"));

      let config = PoolConfig::from_settings(&settings).unwrap();
      assert_eq!(config.strategy, Strategy::Static);
   }
}
