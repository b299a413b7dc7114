//! # Ledger ORM Procedural Macros
//!
//! This crate provides the `#[derive(Model)]` macro re-exported by `ledger-orm`.
//! It reads the struct fields and their `#[orm(...)]` attributes and generates
//! the `Model` implementation (table name, column metadata and the value map
//! used for INSERT statements).
//!
//! ## Supported Attributes
//!
//! Struct level:
//!
//! ```rust,ignore
//! #[derive(Model)]
//! #[orm(table = "accounts")]
//! struct Account { /* ... */ }
//! ```
//!
//! Field level:
//!
//! - `#[orm(primary_key)]` - `PRIMARY KEY` constraint
//! - `#[orm(auto_increment)]` - database generated integer key (field should be `Option<i64>`)
//! - `#[orm(unique)]` - `UNIQUE` constraint
//! - `#[orm(index)]` - creates `idx_<table>_<column>`
//! - `#[orm(default = "active")]` - `DEFAULT 'active'`
//! - `#[orm(size = N)]` - `VARCHAR(N)` instead of `TEXT`
//!
//! ## Generated Field Constants
//!
//! A `{model}_fields` module with one constant per column is generated as well,
//! so filters can be written without string literals:
//!
//! ```rust,ignore
//! session.filter_eq::<Account>(account_fields::STATUS, "active").await?;
//! ```

#![warn(missing_docs)]

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Rust type to SQL type mapping.
mod types;

/// Expansion of `#[derive(Model)]`.
mod derive_model;

/// Derives the `Model` trait for a struct with named fields.
///
/// See the crate documentation for the accepted `#[orm(...)]` attributes.
#[proc_macro_derive(Model, attributes(orm))]
pub fn model_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_model::expand(ast).unwrap_or_else(|err| err.to_compile_error()).into()
}
