mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use common::{FakeDriver, UnknownDatabase};
use pooled_connect::{
   Builder, ConnectParams, Driver, Error, ParamValue, PooledDriver, Strategy,
};
use serde_json::json;

fn conv_forward() -> ParamValue {
   ParamValue::map([
      (ParamValue::from(0), ParamValue::from("x")),
      (ParamValue::list([1, 2]), ParamValue::from("y")),
   ])
}

fn conv_reversed() -> ParamValue {
   ParamValue::map([
      (ParamValue::list([1, 2]), ParamValue::from("y")),
      (ParamValue::from(0), ParamValue::from("x")),
   ])
}

/// Code written against any driver, unaware of pooling
fn open_and_report<D: Driver>(driver: &D, params: &ConnectParams) -> Result<D::Connection, D::Error> {
   driver.connect(params)
}

#[test]
fn test_reordered_conversion_tables_route_to_one_sub_pool() {
   let pooled = PooledDriver::new(FakeDriver::default(), ());

   let first = ConnectParams::new().with("user", "a").with("conv", conv_forward());
   let second = ConnectParams::new().with("conv", conv_reversed()).with("user", "a");

   let first_id = pooled.connect(&first).unwrap().id;
   let second_id = pooled.connect(&second).unwrap().id;

   assert_eq!(first_id, second_id);
   assert_eq!(pooled.pool().unwrap().sub_pool_count(), 1);
   assert_eq!(pooled.manager().driver().counters.opened(), 1);
}

#[test]
fn test_driver_receives_frozen_conversion_table() {
   let pooled = PooledDriver::new(FakeDriver::default(), ());

   let conn = pooled
      .connect(&ConnectParams::new().with("user", "a").with("conv", conv_forward()))
      .unwrap();

   let Some(ParamValue::Frozen(conv)) = conn.params.get("conv") else {
      panic!("driver did not receive a frozen conversion table");
   };
   assert_eq!(conv.get(&ParamValue::list([1, 2])), Some(&ParamValue::from("y")));
   assert_eq!(conn.params.get("user"), Some(&ParamValue::from("a")));
}

#[test]
fn test_empty_conversion_table_is_not_forwarded() {
   let pooled = PooledDriver::new(FakeDriver::default(), ());

   let with_empty = ConnectParams::new()
      .with("user", "a")
      .with("conv", ParamValue::Map(vec![]));
   let without = ConnectParams::new().with("user", "a");

   let conn = pooled.connect(&with_empty).unwrap();
   assert!(!conn.params.contains("conv"));
   drop(conn);

   pooled.connect(&without).unwrap();
   assert_eq!(pooled.pool().unwrap().sub_pool_count(), 1);
}

#[test]
fn test_null_pool_connects_fresh_every_time() {
   let pooled = PooledDriver::new(FakeDriver::default(), json!({ "POOL_BACKEND": "NullPool" }));
   let params = ConnectParams::new().with("user", "a");

   let ids: Vec<_> = (0..100).map(|_| pooled.connect(&params).unwrap().id).collect();

   let counters = &pooled.manager().driver().counters;
   assert_eq!(counters.opened(), 100);
   assert_eq!(counters.closed(), 100);
   assert!(ids.windows(2).all(|pair| pair[0] != pair[1]));
}

#[test]
fn test_unknown_strategy_reported_at_first_connect() {
   let pooled = PooledDriver::new(
      FakeDriver::default(),
      json!({ "POOL_BACKEND": "MysteryPool" }),
   );

   let err = pooled.connect(&ConnectParams::new()).unwrap_err();

   assert_eq!(err.error_code(), "UNKNOWN_STRATEGY");
   assert!(err.to_string().contains("MysteryPool"));
}

#[test]
fn test_driver_errors_reach_the_caller() {
   let pooled = PooledDriver::new(FakeDriver::default(), ());

   let err = pooled
      .connect(&ConnectParams::new().with("db", "missing"))
      .unwrap_err();

   assert_eq!(err.to_string(), "unknown database 'missing'");
   assert_eq!(err.error_code(), "DRIVER_ERROR");
   assert_eq!(err.driver_error::<UnknownDatabase>().unwrap().0, "missing");
}

#[test]
fn test_pooled_driver_substitutes_for_the_driver() {
   let pooled = PooledDriver::new(FakeDriver::default(), ());
   let params = ConnectParams::new().with("user", "a").with("db", "app");

   let id = open_and_report(&pooled, &params).unwrap().id;
   let again = open_and_report(&pooled, &params).unwrap().id;

   assert_eq!(id, again);

   let err: Error = open_and_report(&pooled, &ConnectParams::new().with("db", "other"))
      .err()
      .unwrap();
   assert!(err.driver_error::<UnknownDatabase>().is_some());
}

#[test]
fn test_builder_applies_settings_and_process_id() {
   let pid = Arc::new(AtomicU32::new(7));
   let pid_source = Arc::clone(&pid);

   let pooled = Builder::new(FakeDriver::default())
      .settings(json!({
         "POOL_BACKEND": "QueuePool",
         "POOL_ARGUMENTS": { "poolclass": "StaticPool" },
      }))
      .process_id(move || pid_source.load(Ordering::SeqCst))
      .build();

   let pool = pooled.pool().unwrap();
   assert_eq!(pool.config().strategy, Strategy::Static);
   assert_eq!(pool.pid(), 7);

   let held = pooled.connect(&ConnectParams::new()).unwrap();

   // Fork: the child builds its own pool and never closes the inherited connection
   pid.store(8, Ordering::SeqCst);
   let fresh = pooled.connect(&ConnectParams::new()).unwrap();

   assert_ne!(held.id, fresh.id);
   assert_eq!(pooled.pool().unwrap().pid(), 8);
   drop(held);
   assert_eq!(pooled.manager().driver().counters.closed(), 0);
}

#[test]
fn test_status_serializes_for_reporting() {
   let pooled = PooledDriver::new(FakeDriver::default(), ());
   let params = ConnectParams::new().with("user", "a");

   let _conn = pooled.connect(&params).unwrap();
   let status = pooled.pool().unwrap().status(&params).unwrap();

   let value = serde_json::to_value(status).unwrap();
   assert_eq!(value["checked_out"], json!(1));
   assert_eq!(value["idle"], json!(0));
}
