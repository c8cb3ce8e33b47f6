use pooled_connect_core::{ConnectParams, Driver, PoolManager};
use pooled_connect_sqlite::{Error, SqliteDriver};
use serde_json::json;
use tempfile::TempDir;

fn params_for(dir: &TempDir, name: &str) -> ConnectParams {
   let path = dir.path().join(name);
   ConnectParams::new().with("database", path.to_string_lossy().into_owned())
}

#[test]
fn test_connect_creates_database_file() {
   let dir = TempDir::new().unwrap();
   let driver = SqliteDriver::new().unwrap();

   let conn = driver.connect(&params_for(&dir, "created.db")).unwrap();
   conn.execute("CREATE TABLE t (x INTEGER)").unwrap();

   assert!(dir.path().join("created.db").exists());
   assert_eq!(conn.execute("INSERT INTO t VALUES (1), (2)").unwrap(), 2);
   assert_eq!(conn.fetch_i64("SELECT SUM(x) FROM t").unwrap(), 3);
}

#[test]
fn test_missing_database_parameter() {
   let driver = SqliteDriver::new().unwrap();

   let result = driver.connect(&ConnectParams::new().with("read_only", true));

   assert!(matches!(result, Err(Error::MissingDatabase)));
}

#[test]
fn test_read_only_refuses_missing_file() {
   let dir = TempDir::new().unwrap();
   let driver = SqliteDriver::new().unwrap();

   let params = params_for(&dir, "absent.db").with("read_only", true);

   assert!(matches!(driver.connect(&params), Err(Error::Sqlx(_))));
   assert!(!dir.path().join("absent.db").exists());
}

#[test]
fn test_queue_pool_reuses_in_memory_connection() {
   let manager = PoolManager::new(SqliteDriver::new().unwrap(), ());
   let params = ConnectParams::new().with("database", ":memory:");

   {
      let conn = manager.connect(&params).unwrap();
      conn.execute("CREATE TABLE kv (k TEXT, v INTEGER)").unwrap();
      conn.execute("INSERT INTO kv VALUES ('a', 7)").unwrap();
   }

   // Same physical connection, so the in-memory table is still there
   let conn = manager.connect(&params).unwrap();
   assert_eq!(conn.fetch_i64("SELECT v FROM kv WHERE k = 'a'").unwrap(), 7);
}

#[test]
fn test_null_pool_opens_fresh_connections() {
   let manager = PoolManager::new(
      SqliteDriver::new().unwrap(),
      json!({ "POOL_BACKEND": "NullPool" }),
   );
   let params = ConnectParams::new().with("database", ":memory:");

   {
      let conn = manager.connect(&params).unwrap();
      conn.execute("CREATE TABLE kv (k TEXT)").unwrap();
   }

   let conn = manager.connect(&params).unwrap();
   assert_eq!(
      conn
         .fetch_i64("SELECT COUNT(*) FROM sqlite_master WHERE name = 'kv'")
         .unwrap(),
      0
   );
}

#[test]
fn test_driver_error_passes_through_pool() {
   let manager = PoolManager::new(SqliteDriver::new().unwrap(), ());

   let err = manager.connect(&ConnectParams::new()).unwrap_err();

   assert!(matches!(
      err.driver_error::<Error>(),
      Some(Error::MissingDatabase)
   ));
}

#[test]
fn test_close_is_idempotent() {
   let driver = SqliteDriver::new().unwrap();
   let conn = driver
      .connect(&ConnectParams::new().with("database", ":memory:"))
      .unwrap();

   conn.close().unwrap();
   conn.close().unwrap();

   assert!(matches!(conn.execute("SELECT 1"), Err(Error::ConnectionClosed)));
}
