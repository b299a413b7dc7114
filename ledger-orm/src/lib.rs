//! Ledger ORM: a small ORM on top of `sqlx`'s `Any` driver.
//!
//! Models are declared with `#[derive(Model)]`, tables are created with the
//! [`Migrator`], and all work goes through a [`Session`], usually inside a
//! scope that guarantees the session is closed (and, for one-shot engines,
//! the engine disposed) on every exit path.

pub use ledger_orm_macro::Model;

pub mod database;
pub mod errors;
pub mod migration;
pub mod model;
pub mod query_builder;
pub mod session;

pub use database::{Database, DatabaseBuilder, Drivers};
pub use errors::Error;
pub use migration::Migrator;
pub use model::{ColumnInfo, Model};
pub use session::{scoped, scoped_with_engine, Disposable, ScopedSession, Session};
