//! # Session Module
//!
//! A `Session` is a unit of work over one pooled connection. It begins a
//! transaction lazily on its first statement; `commit` makes the work durable,
//! `rollback` discards it, and `close` discards anything still uncommitted.
//!
//! ## Scoped acquisition
//!
//! [`scoped`] and [`scoped_with_engine`] wrap a body so that, whatever the body
//! returns:
//!
//! 1. connectivity is checked with `SELECT 1` before the body runs;
//! 2. on error, the error is logged and a rollback is attempted (a failing
//!    rollback is logged, never returned);
//! 3. the session is closed, and the engine disposed, each on its own, so one
//!    failing cleanup never skips the other;
//! 4. the body's original error, or its value, is returned.
//!
//! ```rust,ignore
//! let accounts = db
//!     .scoped(|s| Box::pin(async move { s.scan::<Account>().await }))
//!     .await?;
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use std::fmt::Display;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{
    any::{AnyArguments, AnyRow},
    Any, AnyPool, FromRow,
};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{database::Drivers, model::Model, query_builder, Error};

// ============================================================================
// Lifecycle Traits
// ============================================================================

/// The session half of a scope.
#[async_trait]
pub trait ScopedSession: Send {
    /// Trivial round-trip proving the connection works.
    async fn ping(&mut self) -> Result<(), Error>;

    /// Discards uncommitted work.
    async fn rollback(&mut self) -> Result<(), Error>;

    /// Releases the session's connection.
    async fn close(&mut self) -> Result<(), Error>;
}

/// The engine half of a scope.
#[async_trait]
pub trait Disposable: Sync {
    /// Releases every resource held by the engine.
    async fn dispose(&self) -> Result<(), Error>;
}

// ============================================================================
// Scoped Acquisition
// ============================================================================

/// Runs `body` against `session`, then closes it.
pub async fn scoped<S, T, E, F>(mut session: S, body: F) -> Result<T, E>
where
    S: ScopedSession,
    E: From<Error> + Display + Send,
    F: for<'s> FnOnce(&'s mut S) -> BoxFuture<'s, Result<T, E>>,
{
    let outcome = match session.ping().await {
        Ok(()) => body(&mut session).await,
        Err(err) => Err(E::from(err)),
    };

    if let Err(err) = &outcome {
        log::error!("database session error: {}", err);
        if let Err(rollback_err) = session.rollback().await {
            log::error!("error during rollback: {}", rollback_err);
        }
    }

    if let Err(err) = session.close().await {
        log::error!("error closing session: {}", err);
    }

    outcome
}

/// Runs `body` against `session`, then closes the session and disposes
/// `engine`.
pub async fn scoped_with_engine<D, S, T, E, F>(engine: &D, session: S, body: F) -> Result<T, E>
where
    D: Disposable,
    S: ScopedSession,
    E: From<Error> + Display + Send,
    F: for<'s> FnOnce(&'s mut S) -> BoxFuture<'s, Result<T, E>>,
{
    let outcome = scoped(session, body).await;

    if let Err(err) = engine.dispose().await {
        log::error!("error disposing engine: {}", err);
    }

    outcome
}

// ============================================================================
// Session
// ============================================================================

/// A unit of work against one database.
pub struct Session {
    pool: AnyPool,
    driver: Drivers,
    tx: Option<sqlx::Transaction<'static, Any>>,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("driver", &self.driver)
            .field("in_transaction", &self.tx.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Session {
    pub(crate) fn new(pool: AnyPool, driver: Drivers) -> Self {
        Self { pool, driver, tx: None, closed: false }
    }

    /// Driver of the engine this session came from.
    pub fn driver(&self) -> Drivers {
        self.driver
    }

    /// Whether [`Session::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The open transaction, begun on first use.
    async fn tx(&mut self) -> Result<&mut sqlx::Transaction<'static, Any>, Error> {
        if self.closed {
            return Err(Error::invalid_argument("session is closed"));
        }
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };
        Ok(self.tx.insert(tx))
    }

    /// Runs `SELECT 1`.
    pub async fn ping(&mut self) -> Result<(), Error> {
        let tx = self.tx().await.map_err(|e| match e {
            Error::Database(source) => Error::Connectivity(source),
            other => other,
        })?;
        sqlx::query("SELECT 1").execute(&mut **tx).await.map_err(Error::Connectivity)?;
        Ok(())
    }

    /// Inserts one row built from `model`. Returns the number of rows affected.
    pub async fn insert<T: Model>(&mut self, model: &T) -> Result<u64, Error> {
        let values = model.to_map();
        let columns: Vec<&str> = T::active_columns().into_iter().filter(|c| values.contains_key(*c)).collect();

        if columns.is_empty() {
            return Err(Error::invalid_data("nothing to insert"));
        }

        let mut args = AnyArguments::default();
        for col in &columns {
            let sql_type = T::column(col).map(|c| c.sql_type).unwrap_or("TEXT");
            query_builder::bind_value(&mut args, &values[*col], sql_type)?;
        }

        let sql = query_builder::insert_sql(self.driver, T::table_name(), &columns);
        let tx = self.tx().await?;
        let result = sqlx::query_with(&sql, args).execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    /// Fetches every row of `T`'s table.
    pub async fn scan<T>(&mut self) -> Result<Vec<T>, Error>
    where
        T: Model + for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        let sql = query_builder::select_sql(self.driver, T::table_name(), &T::active_columns(), None);
        let tx = self.tx().await?;
        Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&mut **tx).await?)
    }

    /// Fetches the rows whose `column` equals `value`.
    pub async fn filter_eq<T>(&mut self, column: &str, value: &str) -> Result<Vec<T>, Error>
    where
        T: Model + for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        let info = T::column(column)
            .ok_or_else(|| Error::InvalidArgument(format!("{} has no column {}", T::table_name(), column)))?;

        let mut args = AnyArguments::default();
        query_builder::bind_value(&mut args, value, info.sql_type)?;

        let sql = query_builder::select_sql(self.driver, T::table_name(), &T::active_columns(), Some(info.name));
        let tx = self.tx().await?;
        Ok(sqlx::query_as_with::<_, T, _>(&sql, args).fetch_all(&mut **tx).await?)
    }

    /// Counts the rows of `T`'s table.
    pub async fn count<T: Model>(&mut self) -> Result<i64, Error> {
        let sql = query_builder::count_sql(self.driver, T::table_name());
        let tx = self.tx().await?;
        Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut **tx).await?)
    }

    /// Commits the open transaction, if any. The next statement begins a new one.
    pub async fn commit(&mut self) -> Result<(), Error> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Rolls back the open transaction, if any.
    pub async fn rollback(&mut self) -> Result<(), Error> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    /// Discards uncommitted work and returns the connection to the pool.
    /// Further statements fail with `InvalidArgument`.
    pub async fn close(&mut self) -> Result<(), Error> {
        self.closed = true;
        self.rollback().await
    }
}

#[async_trait]
impl ScopedSession for Session {
    async fn ping(&mut self) -> Result<(), Error> {
        Session::ping(self).await
    }

    async fn rollback(&mut self) -> Result<(), Error> {
        Session::rollback(self).await
    }

    async fn close(&mut self) -> Result<(), Error> {
        Session::close(self).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[derive(Default)]
    struct Calls {
        pings: AtomicUsize,
        rollbacks: AtomicUsize,
        closes: AtomicUsize,
        disposes: AtomicUsize,
    }

    struct SpySession {
        calls: Arc<Calls>,
        fail_ping: bool,
        fail_rollback: bool,
        fail_close: bool,
    }

    impl SpySession {
        fn new(calls: &Arc<Calls>) -> Self {
            Self { calls: calls.clone(), fail_ping: false, fail_rollback: false, fail_close: false }
        }
    }

    #[async_trait]
    impl ScopedSession for SpySession {
        async fn ping(&mut self) -> Result<(), Error> {
            self.calls.pings.fetch_add(1, Ordering::SeqCst);
            if self.fail_ping {
                return Err(Error::Connectivity(sqlx::Error::PoolTimedOut));
            }
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), Error> {
            self.calls.rollbacks.fetch_add(1, Ordering::SeqCst);
            if self.fail_rollback {
                return Err(Error::Database(sqlx::Error::PoolClosed));
            }
            Ok(())
        }

        async fn close(&mut self) -> Result<(), Error> {
            self.calls.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(Error::Database(sqlx::Error::PoolClosed));
            }
            Ok(())
        }
    }

    struct SpyEngine {
        calls: Arc<Calls>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl Disposable for SpyEngine {
        async fn dispose(&self) -> Result<(), Error> {
            self.calls.disposes.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Database(sqlx::Error::PoolClosed));
            }
            Ok(())
        }
    }

    fn engine(calls: &Arc<Calls>, fail: bool) -> SpyEngine {
        SpyEngine { calls: calls.clone(), fail: AtomicBool::new(fail) }
    }

    #[tokio::test]
    async fn test_success_closes_and_disposes_without_rollback() {
        let calls = Arc::new(Calls::default());
        let engine = engine(&calls, false);

        let value: Result<i32, Error> =
            scoped_with_engine(&engine, SpySession::new(&calls), |_s| Box::pin(async move { Ok(42) })).await;

        assert_eq!(value.ok(), Some(42));
        assert_eq!(calls.pings.load(Ordering::SeqCst), 1);
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 0);
        assert_eq!(calls.closes.load(Ordering::SeqCst), 1);
        assert_eq!(calls.disposes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_body_rolls_back_and_still_cleans_up() {
        let calls = Arc::new(Calls::default());
        let engine = engine(&calls, false);

        let result: Result<(), Error> = scoped_with_engine(&engine, SpySession::new(&calls), |_s| {
            Box::pin(async move { Err(Error::invalid_data("boom")) })
        })
        .await;

        assert!(matches!(result, Err(Error::InvalidData(msg)) if msg == "boom"));
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 1);
        assert_eq!(calls.closes.load(Ordering::SeqCst), 1);
        assert_eq!(calls.disposes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_ping_skips_body_and_returns_connectivity_error() {
        let calls = Arc::new(Calls::default());
        let engine = engine(&calls, false);
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_body = ran.clone();

        let mut session = SpySession::new(&calls);
        session.fail_ping = true;

        let result: Result<(), Error> = scoped_with_engine(&engine, session, move |_s| {
            Box::pin(async move {
                ran_in_body.store(true, Ordering::SeqCst);
                Ok(())
            })
        })
        .await;

        assert!(matches!(result, Err(Error::Connectivity(_))));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(calls.closes.load(Ordering::SeqCst), 1);
        assert_eq!(calls.disposes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_original_error() {
        let calls = Arc::new(Calls::default());
        let engine = engine(&calls, false);

        let mut session = SpySession::new(&calls);
        session.fail_rollback = true;

        let result: Result<(), Error> =
            scoped_with_engine(&engine, session, |_s| Box::pin(async move { Err(Error::invalid_argument("bad")) }))
                .await;

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(calls.closes.load(Ordering::SeqCst), 1);
        assert_eq!(calls.disposes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_failure_does_not_skip_dispose() {
        let calls = Arc::new(Calls::default());
        let engine = engine(&calls, true);

        let mut session = SpySession::new(&calls);
        session.fail_close = true;

        let result: Result<&str, Error> =
            scoped_with_engine(&engine, session, |_s| Box::pin(async move { Ok("done") })).await;

        assert_eq!(result.ok(), Some("done"));
        assert_eq!(calls.closes.load(Ordering::SeqCst), 1);
        assert_eq!(calls.disposes.load(Ordering::SeqCst), 1);
    }
}
