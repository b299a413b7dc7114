use ledger::{
    config::DatabaseConfig,
    database::{self, get_session, Account, AccountStatus, UsageRecord},
};
use ledger_orm::Error;

fn file_config(dir: &tempfile::TempDir) -> DatabaseConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    DatabaseConfig::new(format!("sqlite://{}", dir.path().join("ledger.db").display()))
}

#[tokio::test]
async fn test_fresh_store_has_empty_tables() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = file_config(&dir);

    database::init_db(&config).await?;

    let accounts = get_session(&config, |s| Box::pin(async move { s.scan::<Account>().await })).await?;
    let records = get_session(&config, |s| Box::pin(async move { s.scan::<UsageRecord>().await })).await?;
    assert!(accounts.is_empty());
    assert!(records.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_init_db_keeps_existing_rows() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = file_config(&dir);

    database::init_db(&config).await?;
    database::add_account(&config, Account::new("a@example.com", "user_a", "tok_a")).await?;
    database::init_db(&config).await?;

    let count = get_session(&config, |s| Box::pin(async move { s.count::<Account>().await })).await?;
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn test_accounts_and_usage_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = file_config(&dir);
    database::init_db(&config).await?;

    let active = Account::new("a@example.com", "user_a", "tok_a").with_password("secret");
    let spent = Account::new("b@example.com", "user_b", "tok_b").with_status(AccountStatus::Exhausted);
    database::add_account(&config, active.clone()).await?;
    database::add_account(&config, spent).await?;

    database::record_usage(&config, UsageRecord::for_account(&active, Some("10.0.0.1".into()), None)).await?;
    database::record_usage(&config, UsageRecord::for_account(&active, None, Some("curl/8".into()))).await?;

    let found = database::accounts_by_status(&config, AccountStatus::Active).await?;
    assert_eq!(found, vec![active.clone()]);

    let usage = database::usage_for_account(&config, active.email.clone()).await?;
    assert_eq!(usage.len(), 2);
    assert!(usage.iter().all(|r| r.account_id == active.id && r.id.is_some()));
    assert!(database::usage_for_account(&config, "b@example.com".into()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = file_config(&dir);
    database::init_db(&config).await?;

    database::add_account(&config, Account::new("a@example.com", "first", "t1")).await?;
    let second = database::add_account(&config, Account::new("a@example.com", "second", "t2")).await;
    assert!(matches!(second, Err(Error::Database(_))));

    let accounts = get_session(&config, |s| Box::pin(async move { s.scan::<Account>().await })).await?;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].user, "first");

    Ok(())
}

#[tokio::test]
async fn test_query_before_init_surfaces_database_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = file_config(&dir);

    let result = get_session(&config, |s| Box::pin(async move { s.scan::<Account>().await })).await;
    assert!(matches!(result, Err(Error::Database(_))));

    Ok(())
}

#[tokio::test]
async fn test_unopenable_database_is_a_connect_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = DatabaseConfig::new(format!("sqlite://{}", dir.path().join("missing/dir/ledger.db").display()));

    assert!(matches!(database::init_db(&config).await, Err(Error::Connect(_))));

    Ok(())
}
