//! Pooling policies
//!
//! Each strategy hands out [`PooledConnection`](crate::PooledConnection)s
//! built from a connection factory and takes them back through
//! [`Checkin`](crate::connection::Checkin). [`Pool`](crate::Pool) selects one
//! of them by configuration.

mod assertion;
mod null;
mod queue;
mod singleton_thread;
mod static_pool;

use std::sync::Arc;

use crate::Result;

pub(crate) use assertion::AssertionPool;
pub(crate) use null::NullPool;
pub(crate) use queue::QueuePool;
pub(crate) use singleton_thread::SingletonThreadPool;
pub(crate) use static_pool::StaticPool;

/// Opens a new physical connection
pub type Factory<C> = Arc<dyn Fn() -> Result<C> + Send + Sync>;
