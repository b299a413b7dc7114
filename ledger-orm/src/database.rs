use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{any::AnyPoolOptions, AnyPool};

use crate::{
    migration::Migrator,
    session::{self, Disposable, Session},
    Error,
};

/// Supported database driver types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Drivers {
    /// PostgreSQL driver.
    Postgres,
    /// SQLite driver.
    SQLite,
    /// MySQL driver.
    MySQL,
}

impl Drivers {
    /// Identifies the driver from the URL scheme. Anything unrecognised is
    /// treated as SQLite, the embedded family.
    pub fn from_url(url: &str) -> Self {
        let (scheme, _) = url.split_once(':').unwrap_or(("sqlite", ""));
        match scheme {
            "postgresql" | "postgres" => Drivers::Postgres,
            "mysql" | "mariadb" => Drivers::MySQL,
            _ => Drivers::SQLite,
        }
    }
}

/// Returns `true` for SQLite URLs that point at a file rather than memory.
pub fn is_file_backed(url: &str) -> bool {
    Drivers::from_url(url) == Drivers::SQLite && !url.contains(":memory:") && !url.contains("mode=memory")
}

/// Adds `mode=rwc` to a file-backed SQLite URL so the database file is
/// opened read-write and created on first use. Other URLs are returned as is.
fn with_embedded_compat(url: &str) -> String {
    if !is_file_backed(url) || url.contains("mode=") {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}mode=rwc", url, sep)
}

/// Connection settings applied by [`DatabaseBuilder::connect`].
#[derive(Clone, Debug)]
pub struct DatabaseBuilder {
    max_connections: u32,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

impl DatabaseBuilder {
    /// Upper bound on pooled connections. In-memory SQLite needs `1`, since
    /// every connection opens its own private database.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Builds a new engine for `url`.
    ///
    /// Nothing is cached between calls: each call opens a fresh pool. When the
    /// URL names a file-backed SQLite database the embedded compatibility
    /// flag is switched on (see [`Database::embedded_compat`]).
    pub async fn connect(self, url: &str) -> Result<Database, Error> {
        sqlx::any::install_default_drivers();

        let driver = Drivers::from_url(url);
        let embedded_compat = is_file_backed(url);
        let connect_url = if embedded_compat { with_embedded_compat(url) } else { url.to_string() };

        let pool = AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&connect_url)
            .await
            .map_err(Error::Connect)?;

        log::debug!("database engine created for {:?} (embedded compat: {})", driver, embedded_compat);

        Ok(Database { pool, driver, embedded_compat })
    }
}

/// The engine: a connection pool plus the detected driver.
#[derive(Clone, Debug)]
pub struct Database {
    pub(crate) pool: AnyPool,
    pub(crate) driver: Drivers,
    embedded_compat: bool,
}

impl Database {
    /// Starts configuring a new engine.
    ///
    /// ```rust,ignore
    /// let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    /// ```
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::default()
    }

    /// Connects with default settings.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        Self::builder().connect(url).await
    }

    /// Driver detected from the connection string.
    pub fn driver(&self) -> Drivers {
        self.driver
    }

    /// Whether the file-backed SQLite compatibility flag was applied.
    pub fn embedded_compat(&self) -> bool {
        self.embedded_compat
    }

    /// Opens a session. No connection is taken from the pool until the
    /// session runs its first statement.
    pub fn session(&self) -> Session {
        Session::new(self.pool.clone(), self.driver)
    }

    /// Creates a `Migrator` for registering tables.
    pub fn migrator(&self) -> Migrator<'_> {
        Migrator::new(self)
    }

    /// Runs `body` with a session checked out of this long-lived engine.
    ///
    /// Same guarantees as [`session::scoped`]; the engine itself stays open for
    /// the next scope.
    pub async fn scoped<T, E, F>(&self, body: F) -> Result<T, E>
    where
        E: From<Error> + std::fmt::Display + Send,
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>>,
    {
        session::scoped(self.session(), body).await
    }

    /// Closes every pooled connection. Sessions opened afterwards fail.
    pub async fn dispose(&self) {
        self.pool.close().await;
    }

    /// Whether [`Database::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[async_trait]
impl Disposable for Database {
    async fn dispose(&self) -> Result<(), Error> {
        Database::dispose(self).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_detection() {
        assert_eq!(Drivers::from_url("postgres://u:p@localhost/db"), Drivers::Postgres);
        assert_eq!(Drivers::from_url("postgresql://localhost/db"), Drivers::Postgres);
        assert_eq!(Drivers::from_url("mysql://localhost/db"), Drivers::MySQL);
        assert_eq!(Drivers::from_url("sqlite://ledger.db"), Drivers::SQLite);
        assert_eq!(Drivers::from_url("sqlite::memory:"), Drivers::SQLite);
    }

    #[test]
    fn test_compat_flag_only_for_sqlite_files() {
        assert!(is_file_backed("sqlite://ledger.db"));
        assert!(!is_file_backed("sqlite::memory:"));
        assert!(!is_file_backed("sqlite://file?mode=memory"));
        assert!(!is_file_backed("postgres://localhost/db"));
    }

    #[test]
    fn test_compat_url_rewrite() {
        assert_eq!(with_embedded_compat("sqlite://ledger.db"), "sqlite://ledger.db?mode=rwc");
        assert_eq!(with_embedded_compat("sqlite://ledger.db?cache=shared"), "sqlite://ledger.db?cache=shared&mode=rwc");
        assert_eq!(with_embedded_compat("sqlite://ledger.db?mode=ro"), "sqlite://ledger.db?mode=ro");
        assert_eq!(with_embedded_compat("postgres://localhost/db"), "postgres://localhost/db");
    }
}
