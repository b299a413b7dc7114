use std::{fmt, str::FromStr};

use chrono::Utc;
use ledger_orm::{Error, Model};
use serde::{Deserialize, Serialize};

/// Lifecycle state stored in `accounts.status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    /// Quota used up; kept for its history.
    Exhausted,
    Disabled,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Exhausted => "exhausted",
            AccountStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "exhausted" => Ok(AccountStatus::Exhausted),
            "disabled" => Ok(AccountStatus::Disabled),
            other => Err(Error::InvalidData(format!("unknown account status: {}", other))),
        }
    }
}

/// A stored credential set, keyed by email.
///
/// `id` is a numeric handle (creation time in milliseconds) that usage records
/// point at; it is indexed but deliberately not unique.
#[derive(Debug, Clone, PartialEq, Model, Serialize, Deserialize, sqlx::FromRow)]
#[orm(table = "accounts")]
pub struct Account {
    #[orm(primary_key)]
    pub email: String,
    pub user: String,
    pub password: Option<String>,
    pub token: String,
    /// Serialized usage-limit payload, opaque to the store.
    pub usage_limit: Option<String>,
    pub created_at: Option<String>,
    #[orm(default = "active")]
    pub status: String,
    #[orm(index)]
    pub id: i64,
}

impl Account {
    pub fn new(email: impl Into<String>, user: impl Into<String>, token: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            email: email.into(),
            user: user.into(),
            password: None,
            token: token.into(),
            usage_limit: None,
            created_at: Some(now.to_rfc3339()),
            status: AccountStatus::default().to_string(),
            id: now.timestamp_millis(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_usage_limit(mut self, limit: &serde_json::Value) -> Self {
        self.usage_limit = Some(limit.to_string());
        self
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn status(&self) -> Result<AccountStatus, Error> {
        self.status.parse()
    }

    /// Decodes the stored usage-limit payload, if any.
    pub fn usage_limit_json(&self) -> Result<Option<serde_json::Value>, Error> {
        self.usage_limit
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| Error::InvalidData(format!("usage_limit is not JSON: {}", e)))
    }
}
