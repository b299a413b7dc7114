//! Client for the remote usage API.
//!
//! Both calls authenticate with the `WorkosCursorSessionToken` cookie and
//! parse the body as JSON without looking at the status code first, so an
//! error page comes back as [`UsageError::Json`].

use reqwest::header::{CONTENT_TYPE, COOKIE};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://www.cursor.com";

/// Usage bucket whose request quota is tracked.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Model names the usage endpoint reports on.
pub const KNOWN_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-opus",
    "claude-3.5-haiku",
    "claude-3.5-sonnet",
    "cursor-fast",
    "cursor-small",
    "deepseek-r1",
    "deepseek-v3",
    "gemini-2.0-flash-exp",
    "gemini-2.0-flash-thinking-exp",
    "gemini-exp-1206",
    "gpt-3.5-turbo",
    "gpt-4",
    "gpt-4-turbo-2024-04-09",
    "gpt-4o",
    "gpt-4o-mini",
    "o1",
    "o1-mini",
    "o1-preview",
    "o3-mini",
];

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("usage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("usage response is not JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cookie value for `user` and `token`: `{user}::{token}` with the separator
/// percent-encoded.
pub fn session_cookie(user: &str, token: &str) -> String {
    format!("WorkosCursorSessionToken={}%3A%3A{}", user, token)
}

/// `maxRequestUsage - numRequests` for `model`, or `None` if the bucket or
/// either number is missing. Not clamped: an overdrawn account goes negative.
pub fn remaining_balance(body: &Value, model: &str) -> Option<i64> {
    let usage = body.get(model)?;
    let max = usage.get("maxRequestUsage")?.as_i64()?;
    let used = usage.get("numRequests")?.as_i64()?;
    Some(max - used)
}

/// `daysRemainingOnTrial`, or `None` when absent.
pub fn trial_remaining_days(body: &Value) -> Option<i64> {
    body.get("daysRemainingOnTrial")?.as_i64()
}

#[derive(Debug, Clone)]
pub struct UsageClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl Default for UsageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new(), base_url: DEFAULT_BASE_URL.to_string(), model: DEFAULT_MODEL.to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn get_json(&self, url: &str, user: &str, token: &str) -> Result<Value, UsageError> {
        log::debug!("GET {}", url);
        let body = self
            .http
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, session_cookie(user, token))
            .send()
            .await?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Requests left in the tracked model's quota.
    pub async fn get_remaining_balance(&self, user: &str, token: &str) -> Result<Option<i64>, UsageError> {
        let url = format!("{}/api/usage?user={}", self.base_url, user);
        let body = self.get_json(&url, user, token).await?;
        Ok(remaining_balance(&body, &self.model))
    }

    /// Days left on the trial.
    pub async fn get_trial_remaining_days(&self, user: &str, token: &str) -> Result<Option<i64>, UsageError> {
        let url = format!("{}/api/auth/stripe", self.base_url);
        let body = self.get_json(&url, user, token).await?;
        Ok(trial_remaining_days(&body))
    }
}
