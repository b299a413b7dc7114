//! Account store: the two tables and the engine/session lifecycle around them.

pub mod account;
pub mod usage_record;

use std::fmt::Display;

use futures::future::BoxFuture;
use ledger_orm::{scoped_with_engine, Database, Error, Session};

pub use account::{account_fields, Account, AccountStatus};
pub use usage_record::{usage_record_fields, UsageRecord};

use crate::config::DatabaseConfig;

/// Builds a new engine for `config`. Every call opens its own pool.
pub async fn create_engine(config: &DatabaseConfig) -> Result<Database, Error> {
    Database::builder().max_connections(config.max_connections).connect(&config.url).await
}

/// Runs `body` in a session on a fresh engine.
///
/// The connection is checked with `SELECT 1` first. If anything fails the
/// error is logged, the session rolled back (best effort) and the original
/// error returned. The session is closed and the engine disposed on every
/// path.
///
/// ```rust,ignore
/// let accounts = get_session(&config, |s| Box::pin(async move { s.scan::<Account>().await })).await?;
/// ```
pub async fn get_session<T, E, F>(config: &DatabaseConfig, body: F) -> Result<T, E>
where
    E: From<Error> + Display + Send,
    F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>>,
{
    let engine = create_engine(config).await.map_err(|err| {
        log::error!("database session error: {}", err);
        E::from(err)
    })?;
    let session = engine.session();
    scoped_with_engine(&engine, session, body).await
}

/// Creates `accounts` and `account_usage_records` if they do not exist.
pub async fn init_db(config: &DatabaseConfig) -> Result<(), Error> {
    let result = async {
        let engine = create_engine(config).await?;
        let migrated = engine.migrator().register::<Account>().register::<UsageRecord>().run().await;
        engine.dispose().await;
        migrated
    }
    .await;

    match &result {
        Ok(()) => log::info!("database initialized"),
        Err(err) => log::error!("database initialization failed: {}", err),
    }
    result
}

pub async fn add_account(config: &DatabaseConfig, account: Account) -> Result<(), Error> {
    get_session(config, move |s| {
        Box::pin(async move {
            s.insert(&account).await?;
            s.commit().await
        })
    })
    .await
}

pub async fn record_usage(config: &DatabaseConfig, record: UsageRecord) -> Result<(), Error> {
    get_session(config, move |s| {
        Box::pin(async move {
            s.insert(&record).await?;
            s.commit().await
        })
    })
    .await
}

pub async fn accounts_by_status(config: &DatabaseConfig, status: AccountStatus) -> Result<Vec<Account>, Error> {
    get_session(config, move |s| {
        Box::pin(async move { s.filter_eq::<Account>(account_fields::STATUS, status.as_str()).await })
    })
    .await
}

pub async fn usage_for_account(config: &DatabaseConfig, email: String) -> Result<Vec<UsageRecord>, Error> {
    get_session(config, move |s| {
        Box::pin(async move { s.filter_eq::<UsageRecord>(usage_record_fields::EMAIL, &email).await })
    })
    .await
}
