//! # Model Module
//!
//! Defines the `Model` trait and the column metadata it exposes.
//!
//! The trait is normally implemented through `#[derive(Model)]`:
//!
//! ```rust,ignore
//! use ledger_orm::Model;
//!
//! #[derive(Debug, Clone, Model, sqlx::FromRow)]
//! #[orm(table = "account_usage_records")]
//! struct UsageRecord {
//!     #[orm(primary_key, auto_increment)]
//!     id: Option<i64>,
//!     #[orm(index)]
//!     account_id: i64,
//!     created_at: String,
//! }
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use std::collections::HashMap;

// ============================================================================
// Column Metadata Structure
// ============================================================================

/// Metadata about one table column, generated from a struct field.
///
/// `sql_type` is the portable type name (`BIGINT`, `TEXT`, ...); the
/// driver-specific spelling of auto-increment keys is decided when the DDL is
/// rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Column name, already stripped of any `r#` prefix.
    pub name: &'static str,

    /// SQL type used in `CREATE TABLE`.
    pub sql_type: &'static str,

    /// `PRIMARY KEY` column.
    pub is_primary_key: bool,

    /// `true` for `Option<T>` fields.
    pub is_nullable: bool,

    /// Value generated by the database on insert.
    pub auto_increment: bool,

    /// `UNIQUE` constraint.
    pub unique: bool,

    /// Secondary index `idx_<table>_<column>`.
    pub index: bool,

    /// Literal used for `DEFAULT '<value>'`.
    pub default: Option<&'static str>,
}

// ============================================================================
// Model Trait
// ============================================================================

/// A Rust struct mapped to a database table.
pub trait Model {
    /// Table name as written in SQL.
    fn table_name() -> &'static str;

    /// Column metadata in field order.
    fn columns() -> Vec<ColumnInfo>;

    /// Column names in field order.
    fn active_columns() -> Vec<&'static str>;

    /// Values for INSERT, keyed by column. `None` optionals are left out so the
    /// column takes NULL or its default.
    fn to_map(&self) -> HashMap<String, String>;

    /// Metadata for `column`, if the model has it.
    fn column(column: &str) -> Option<ColumnInfo> {
        Self::columns().into_iter().find(|c| c.name == column)
    }
}

// ============================================================================
// Tests
// ============================================================================
