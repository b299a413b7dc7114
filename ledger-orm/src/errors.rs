//! # Error Handling Module
//!
//! This module defines the error type used throughout Ledger ORM.
//!
//! Each failure site gets its own variant so callers can tell them apart
//! without matching on messages:
//!
//! - **Connect**: the engine could not be built (bad URL, unreachable server)
//! - **Connectivity**: the `SELECT 1` round-trip at the start of a scope failed
//! - **Database**: a query inside a session failed
//! - **Schema**: `CREATE TABLE` / `CREATE INDEX` failed for a table
//! - **InvalidData** / **InvalidArgument**: validation before touching the database
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! match ledger::store::init_db(&config).await {
//!     Ok(()) => {}
//!     Err(Error::Connect(e)) => eprintln!("cannot reach database: {}", e),
//!     Err(Error::Schema { table, .. }) => eprintln!("could not create {}", table),
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// Error Enum Definition
// ============================================================================

/// The main error type for Ledger ORM operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Building the connection pool failed.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// The trivial round-trip query that opens every scope failed.
    ///
    /// Distinct from [`Error::Database`] so that "the database is down" and
    /// "my query is wrong" do not look alike to callers.
    #[error("database connectivity check failed: {0}")]
    Connectivity(#[source] sqlx::Error),

    /// Database operation error.
    ///
    /// Converted automatically from `sqlx::Error`, so `?` works inside
    /// session code.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema creation failed for `table`.
    #[error("failed to create table {table}: {source}")]
    Schema {
        /// Table being created when the failure happened.
        table: String,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// Invalid data error.
    ///
    /// Used when a value cannot be converted to the column type it is bound
    /// to, or a stored value does not parse back into its Rust type.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Invalid argument error.
    ///
    /// Programmer errors such as filtering on a column the model does not
    /// have, or using a session after it was closed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

// ============================================================================
// Helper Functions
// ============================================================================

impl Error {
    /// Creates an `InvalidData` error from a string slice.
    pub fn invalid_data(msg: &str) -> Self {
        Error::InvalidData(msg.to_string())
    }

    /// Creates an `InvalidArgument` error from a string slice.
    pub fn invalid_argument(msg: &str) -> Self {
        Error::InvalidArgument(msg.to_string())
    }

    /// Returns `true` when the error came from reaching the database rather
    /// than from a statement.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Connect(_) | Error::Connectivity(_))
    }
}
