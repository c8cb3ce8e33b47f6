//! Hashable keys for parameter structures
//!
//! Drivers accept parameters whose values may be nested, order-carrying maps
//! (a type-conversion table is the usual offender). Such values cannot be used
//! to look up a pool directly. [`CanonicalKey`] keeps the original entries for
//! the driver and derives a normalized form from them; equality, ordering and
//! hashing all go through that single form so they can never disagree.
//!
//! Normalization:
//!
//! - scalars pass through unchanged, except that a float holding a whole
//!   number in `i64` range becomes that integer, so `1` and `1.0` are the
//!   same key; other floats compare by their total-order bits
//! - sequences become tuples of normalized elements, order preserved
//! - maps become tuples of `(key, value)` pairs sorted by normalized key, with
//!   the last entry winning for duplicate keys, so the order in which a table
//!   was built does not matter
//! - an already-frozen key contributes its own normalized form

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::params::{ConnectParams, ParamValue};

/// `f64` with a total order, compared and hashed by bit pattern
#[derive(Debug, Clone, Copy)]
struct TotalF64(f64);

impl PartialEq for TotalF64 {
   fn eq(&self, other: &Self) -> bool {
      self.cmp(other) == Ordering::Equal
   }
}

impl Eq for TotalF64 {}

impl PartialOrd for TotalF64 {
   fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
      Some(self.cmp(other))
   }
}

impl Ord for TotalF64 {
   fn cmp(&self, other: &Self) -> Ordering {
      self.0.total_cmp(&other.0)
   }
}

impl Hash for TotalF64 {
   fn hash<H: Hasher>(&self, state: &mut H) {
      self.0.to_bits().hash(state);
   }
}

/// Normalized tuple form of a parameter value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Canonical {
   Null,
   Bool(bool),
   Int(i64),
   Float(TotalF64),
   Str(String),
   Bytes(Vec<u8>),
   Seq(Vec<Canonical>),
   Pairs(Vec<(Canonical, Canonical)>),
}

impl Canonical {
   fn of(value: &ParamValue) -> Self {
      match value {
         ParamValue::Null => Canonical::Null,
         ParamValue::Bool(b) => Canonical::Bool(*b),
         ParamValue::Int(i) => Canonical::Int(*i),
         ParamValue::Float(f) => Canonical::float(*f),
         ParamValue::Str(s) => Canonical::Str(s.clone()),
         ParamValue::Bytes(b) => Canonical::Bytes(b.clone()),
         ParamValue::List(items) => Canonical::Seq(items.iter().map(Canonical::of).collect()),
         ParamValue::Map(entries) => {
            Canonical::pairs(entries.iter().map(|(k, v)| (Canonical::of(k), Canonical::of(v))))
         }
         ParamValue::Frozen(key) => key.inner.form.clone(),
      }
   }

   fn float(f: f64) -> Self {
      // 2^63 is exact as an f64; the range excludes it since i64::MAX is 2^63 - 1
      const LIMIT: f64 = 9_223_372_036_854_775_808.0;
      if f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
         Canonical::Int(f as i64)
      } else {
         Canonical::Float(TotalF64(f))
      }
   }

   fn pairs(entries: impl Iterator<Item = (Canonical, Canonical)>) -> Self {
      let sorted: BTreeMap<Canonical, Canonical> = entries.collect();
      Canonical::Pairs(sorted.into_iter().collect())
   }
}

#[derive(Debug)]
struct KeyInner {
   entries: Vec<(ParamValue, ParamValue)>,
   form: Canonical,
}

/// An immutable, hashable wrapper around an ordered mapping.
///
/// Two keys are equal iff their mappings are equal entry by entry after
/// normalization (see the module docs); equal keys hash identically.
/// Cloning is cheap.
///
/// # Example
///
/// ```
/// use pooled_connect_core::{CanonicalKey, ParamValue};
///
/// let a = CanonicalKey::wrap([
///    (ParamValue::from(0), ParamValue::from("x")),
///    (ParamValue::list([1, 2]), ParamValue::from("y")),
/// ]);
/// let b = CanonicalKey::wrap([
///    (ParamValue::list([1, 2]), ParamValue::from("y")),
///    (ParamValue::from(0), ParamValue::from("x")),
/// ]);
///
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct CanonicalKey {
   inner: Arc<KeyInner>,
}

impl CanonicalKey {
   /// Wrap an ordered mapping.
   pub fn wrap<I, K, V>(entries: I) -> Self
   where
      I: IntoIterator<Item = (K, V)>,
      K: Into<ParamValue>,
      V: Into<ParamValue>,
   {
      let entries: Vec<(ParamValue, ParamValue)> = entries
         .into_iter()
         .map(|(k, v)| (k.into(), v.into()))
         .collect();

      let form = Canonical::pairs(
         entries
            .iter()
            .map(|(k, v)| (Canonical::of(k), Canonical::of(v))),
      );

      Self {
         inner: Arc::new(KeyInner { entries, form }),
      }
   }

   /// Wrap a map value. Returns `None` for anything that is not a map;
   /// an already-frozen key is returned as is.
   pub fn from_value(value: &ParamValue) -> Option<Self> {
      match value {
         ParamValue::Map(entries) => Some(Self::wrap(entries.iter().cloned())),
         ParamValue::Frozen(key) => Some(key.clone()),
         _ => None,
      }
   }

   /// Key identifying a whole parameter set.
   pub fn from_params(params: &ConnectParams) -> Self {
      Self::wrap(
         params
            .iter()
            .map(|(name, value)| (ParamValue::from(name), value.clone())),
      )
   }

   /// Look up an entry by key, comparing normalized forms.
   pub fn get(&self, key: &ParamValue) -> Option<&ParamValue> {
      let wanted = Canonical::of(key);
      self
         .inner
         .entries
         .iter()
         .rev()
         .find(|(k, _)| Canonical::of(k) == wanted)
         .map(|(_, v)| v)
   }

   /// The original entries, in construction order.
   pub fn iter(&self) -> impl Iterator<Item = (&ParamValue, &ParamValue)> {
      self.inner.entries.iter().map(|(k, v)| (k, v))
   }

   /// Number of distinct keys in the mapping.
   pub fn len(&self) -> usize {
      match &self.inner.form {
         Canonical::Pairs(pairs) => pairs.len(),
         _ => 0,
      }
   }

   pub fn is_empty(&self) -> bool {
      self.len() == 0
   }

   /// Convert back into a plain map value.
   pub fn to_value(&self) -> ParamValue {
      ParamValue::Map(self.inner.entries.clone())
   }
}

impl PartialEq for CanonicalKey {
   fn eq(&self, other: &Self) -> bool {
      Arc::ptr_eq(&self.inner, &other.inner) || self.inner.form == other.inner.form
   }
}

impl Eq for CanonicalKey {}

impl PartialOrd for CanonicalKey {
   fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
      Some(self.cmp(other))
   }
}

impl Ord for CanonicalKey {
   fn cmp(&self, other: &Self) -> Ordering {
      self.inner.form.cmp(&other.inner.form)
   }
}

impl Hash for CanonicalKey {
   fn hash<H: Hasher>(&self, state: &mut H) {
      self.inner.form.hash(state);
   }
}

impl fmt::Debug for CanonicalKey {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_map().entries(self.iter()).finish()
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use std::collections::HashMap;
   use std::collections::hash_map::DefaultHasher;

   fn hash_of(key: &CanonicalKey) -> u64 {
      let mut hasher = DefaultHasher::new();
      key.hash(&mut hasher);
      hasher.finish()
   }

   fn conv_table(reversed: bool) -> Vec<(ParamValue, ParamValue)> {
      let mut entries = vec![
         (ParamValue::from(0), ParamValue::from("x")),
         (ParamValue::list([1, 2]), ParamValue::from("y")),
         (ParamValue::from(7), ParamValue::map([("nested", vec![ParamValue::Int(1)])])),
      ];
      if reversed {
         entries.reverse();
      }
      entries
   }

   #[test]
   fn test_equal_structures_hash_identically() {
      let a = CanonicalKey::wrap(conv_table(false));
      let b = CanonicalKey::wrap(conv_table(true));

      assert_eq!(a, b);
      assert_eq!(hash_of(&a), hash_of(&b));

      // Construction order is still visible to the driver
      assert_eq!(a.iter().next().map(|(k, _)| k), Some(&ParamValue::Int(0)));
      assert_eq!(b.iter().next().map(|(k, _)| k), Some(&ParamValue::Int(7)));
   }

   #[test]
   fn test_nested_map_order_is_ignored() {
      let a = CanonicalKey::wrap([(
         "outer",
         ParamValue::map([("a", 1), ("b", 2)]),
      )]);
      let b = CanonicalKey::wrap([(
         "outer",
         ParamValue::map([("b", 2), ("a", 1)]),
      )]);

      assert_eq!(a, b);
      assert_eq!(hash_of(&a), hash_of(&b));
   }

   #[test]
   fn test_sequence_order_matters() {
      let a = CanonicalKey::wrap([("seq", ParamValue::list([1, 2]))]);
      let b = CanonicalKey::wrap([("seq", ParamValue::list([2, 1]))]);

      assert_ne!(a, b);
   }

   #[test]
   fn test_different_values_are_not_equal() {
      let a = CanonicalKey::wrap([("user", "a")]);
      let b = CanonicalKey::wrap([("user", "b")]);
      let c = CanonicalKey::wrap([("user", ParamValue::list(["a"]))]);

      assert_ne!(a, b);
      assert_ne!(a, c);
   }

   #[test]
   fn test_empty_mapping_is_a_valid_key() {
      let empty = CanonicalKey::wrap(Vec::<(ParamValue, ParamValue)>::new());
      let other = CanonicalKey::wrap(Vec::<(ParamValue, ParamValue)>::new());

      assert!(empty.is_empty());
      assert_eq!(empty, other);
      assert_eq!(hash_of(&empty), hash_of(&other));
      assert_ne!(empty, CanonicalKey::wrap([("a", 1)]));
   }

   #[test]
   fn test_duplicate_keys_last_wins() {
      let key = CanonicalKey::wrap([("a", 1), ("a", 2)]);

      assert_eq!(key.len(), 1);
      assert_eq!(key.get(&ParamValue::from("a")), Some(&ParamValue::Int(2)));
      assert_eq!(key, CanonicalKey::wrap([("a", 2)]));
   }

   #[test]
   fn test_frozen_value_matches_plain_map() {
      let plain = ParamValue::map([(0, "x"), (1, "y")]);
      let frozen = ParamValue::Frozen(CanonicalKey::from_value(&plain).unwrap());

      let a = CanonicalKey::wrap([("conv", plain)]);
      let b = CanonicalKey::wrap([("conv", frozen)]);

      assert_eq!(a, b);
      assert_eq!(hash_of(&a), hash_of(&b));
   }

   #[test]
   fn test_float_keys() {
      let a = CanonicalKey::wrap([("f", f64::NAN)]);
      let b = CanonicalKey::wrap([("f", f64::NAN)]);

      // Total ordering makes NaN equal to itself, so the key stays reflexive
      assert_eq!(a, b);
      assert_eq!(hash_of(&a), hash_of(&b));
   }

   #[test]
   fn test_whole_floats_match_integers() {
      let int = CanonicalKey::wrap([(ParamValue::Int(1), ParamValue::Int(-3))]);
      let float = CanonicalKey::wrap([(ParamValue::Float(1.0), ParamValue::Float(-3.0))]);

      assert_eq!(int, float);
      assert_eq!(hash_of(&int), hash_of(&float));

      let half = CanonicalKey::wrap([(ParamValue::Float(1.5), ParamValue::Int(-3))]);
      assert_ne!(int, half);

      // Outside i64 range a whole float stays a float
      let big = CanonicalKey::wrap([("n", 1e19)]);
      assert_ne!(big, CanonicalKey::wrap([("n", i64::MAX)]));
   }

   #[test]
   fn test_usable_as_hash_map_key() {
      let mut map = HashMap::new();
      map.insert(CanonicalKey::wrap(conv_table(false)), "pool-1");

      assert_eq!(
         map.get(&CanonicalKey::wrap(conv_table(true))),
         Some(&"pool-1")
      );
   }

   #[test]
   fn test_from_value_rejects_scalars() {
      assert!(CanonicalKey::from_value(&ParamValue::Int(3)).is_none());
      assert!(CanonicalKey::from_value(&ParamValue::list([1])).is_none());
   }
}
