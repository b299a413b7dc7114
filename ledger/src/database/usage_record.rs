use chrono::Utc;
use ledger_orm::Model;
use serde::{Deserialize, Serialize};

use super::account::Account;

/// One access to an account: who used it, from where, when.
///
/// The account is referenced by both its numeric id and its email. Neither is
/// a declared foreign key.
#[derive(Debug, Clone, PartialEq, Model, Serialize, Deserialize, sqlx::FromRow)]
#[orm(table = "account_usage_records")]
pub struct UsageRecord {
    #[orm(primary_key, auto_increment)]
    pub id: Option<i64>,
    #[orm(index)]
    pub account_id: i64,
    #[orm(index)]
    pub email: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl UsageRecord {
    pub fn for_account(account: &Account, ip: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            id: None,
            account_id: account.id,
            email: account.email.clone(),
            ip,
            user_agent,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
