//! Connection parameters passed through to the driver

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::key::CanonicalKey;

/// A single driver parameter value.
///
/// Values may nest arbitrarily. `ParamValue` compares structurally but is not
/// hashable: maps keep their entries in construction order and may hold keys
/// of any shape, so pool routing goes through [`CanonicalKey`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
   Null,
   Bool(bool),
   Int(i64),
   Float(f64),
   Str(String),
   Bytes(Vec<u8>),
   /// Ordered sequence
   List(Vec<ParamValue>),
   /// Ordered mapping with arbitrary keys
   Map(Vec<(ParamValue, ParamValue)>),
   /// A mapping already wrapped for use as a routing key
   Frozen(CanonicalKey),
}

impl ParamValue {
   /// Build a map value from key/value pairs, keeping their order.
   pub fn map<I, K, V>(entries: I) -> Self
   where
      I: IntoIterator<Item = (K, V)>,
      K: Into<ParamValue>,
      V: Into<ParamValue>,
   {
      ParamValue::Map(
         entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
      )
   }

   /// Build a list value.
   pub fn list<I, V>(items: I) -> Self
   where
      I: IntoIterator<Item = V>,
      V: Into<ParamValue>,
   {
      ParamValue::List(items.into_iter().map(Into::into).collect())
   }

   pub fn as_str(&self) -> Option<&str> {
      match self {
         ParamValue::Str(s) => Some(s),
         _ => None,
      }
   }

   pub fn as_bool(&self) -> Option<bool> {
      match self {
         ParamValue::Bool(b) => Some(*b),
         _ => None,
      }
   }

   pub fn as_i64(&self) -> Option<i64> {
      match self {
         ParamValue::Int(i) => Some(*i),
         _ => None,
      }
   }

   /// Whether the value counts as "empty": null, or a collection without items.
   pub fn is_empty(&self) -> bool {
      match self {
         ParamValue::Null => true,
         ParamValue::Str(s) => s.is_empty(),
         ParamValue::Bytes(b) => b.is_empty(),
         ParamValue::List(items) => items.is_empty(),
         ParamValue::Map(entries) => entries.is_empty(),
         ParamValue::Frozen(key) => key.is_empty(),
         ParamValue::Bool(_) | ParamValue::Int(_) | ParamValue::Float(_) => false,
      }
   }
}

impl From<bool> for ParamValue {
   fn from(value: bool) -> Self {
      ParamValue::Bool(value)
   }
}

impl From<i64> for ParamValue {
   fn from(value: i64) -> Self {
      ParamValue::Int(value)
   }
}

impl From<i32> for ParamValue {
   fn from(value: i32) -> Self {
      ParamValue::Int(i64::from(value))
   }
}

impl From<u16> for ParamValue {
   fn from(value: u16) -> Self {
      ParamValue::Int(i64::from(value))
   }
}

impl From<f64> for ParamValue {
   fn from(value: f64) -> Self {
      ParamValue::Float(value)
   }
}

impl From<&str> for ParamValue {
   fn from(value: &str) -> Self {
      ParamValue::Str(value.to_string())
   }
}

impl From<String> for ParamValue {
   fn from(value: String) -> Self {
      ParamValue::Str(value)
   }
}

impl From<Vec<u8>> for ParamValue {
   fn from(value: Vec<u8>) -> Self {
      ParamValue::Bytes(value)
   }
}

impl From<Vec<ParamValue>> for ParamValue {
   fn from(value: Vec<ParamValue>) -> Self {
      ParamValue::List(value)
   }
}

impl From<CanonicalKey> for ParamValue {
   fn from(value: CanonicalKey) -> Self {
      ParamValue::Frozen(value)
   }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
   fn from(value: Option<T>) -> Self {
      value.map_or(ParamValue::Null, Into::into)
   }
}

impl From<JsonValue> for ParamValue {
   fn from(value: JsonValue) -> Self {
      match value {
         JsonValue::Null => ParamValue::Null,
         JsonValue::Bool(b) => ParamValue::Bool(b),
         JsonValue::Number(n) => match n.as_i64() {
            Some(i) => ParamValue::Int(i),
            None => ParamValue::Float(n.as_f64().unwrap_or(f64::NAN)),
         },
         JsonValue::String(s) => ParamValue::Str(s),
         JsonValue::Array(items) => ParamValue::List(items.into_iter().map(Into::into).collect()),
         JsonValue::Object(map) => ParamValue::Map(
            map.into_iter()
               .map(|(k, v)| (ParamValue::Str(k), v.into()))
               .collect(),
         ),
      }
   }
}

/// The named parameters of one connect call, in the order the caller gave them.
///
/// # Example
///
/// ```
/// use pooled_connect_core::{ConnectParams, ParamValue};
///
/// let params = ConnectParams::new()
///    .with("user", "app")
///    .with("port", 3306)
///    .with("conv", ParamValue::map([(0, "x"), (1, "y")]));
///
/// assert_eq!(params.get("user").and_then(ParamValue::as_str), Some("app"));
/// assert_eq!(params.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectParams {
   entries: IndexMap<String, ParamValue>,
}

impl ConnectParams {
   pub fn new() -> Self {
      Self::default()
   }

   /// Builder-style insert.
   pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
      self.insert(name, value);
      self
   }

   /// Insert or replace a parameter, returning the previous value.
   pub fn insert(
      &mut self,
      name: impl Into<String>,
      value: impl Into<ParamValue>,
   ) -> Option<ParamValue> {
      self.entries.insert(name.into(), value.into())
   }

   pub fn get(&self, name: &str) -> Option<&ParamValue> {
      self.entries.get(name)
   }

   /// Remove a parameter, keeping the order of the others.
   pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
      self.entries.shift_remove(name)
   }

   pub fn contains(&self, name: &str) -> bool {
      self.entries.contains_key(name)
   }

   pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
      self.entries.iter().map(|(k, v)| (k.as_str(), v))
   }

   pub fn len(&self) -> usize {
      self.entries.len()
   }

   pub fn is_empty(&self) -> bool {
      self.entries.is_empty()
   }
}

impl<K, V> FromIterator<(K, V)> for ConnectParams
where
   K: Into<String>,
   V: Into<ParamValue>,
{
   fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
      Self {
         entries: iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
      }
   }
}
