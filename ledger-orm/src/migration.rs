//! # Migration Module
//!
//! Creates the tables of registered models.
//!
//! Every statement is `CREATE ... IF NOT EXISTS`: existing tables are never
//! altered or dropped, so running the migrator again is a no-op. All
//! statements run inside one transaction.
//!
//! ```rust,ignore
//! db.migrator()
//!     .register::<Account>()
//!     .register::<UsageRecord>()
//!     .run()
//!     .await?;
//! ```

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{database::Database, model::{ColumnInfo, Model}, query_builder, Error};

// ============================================================================
// Migrator Struct
// ============================================================================

/// A table queued for creation.
#[derive(Debug, Clone)]
struct TableDef {
    name: &'static str,
    columns: Vec<ColumnInfo>,
}

/// Schema migration manager.
pub struct Migrator<'a> {
    db: &'a Database,
    tables: Vec<TableDef>,
}

impl<'a> Migrator<'a> {
    /// Creates an empty migrator. Usually obtained through `Database::migrator()`.
    pub fn new(db: &'a Database) -> Self {
        Self { db, tables: Vec::new() }
    }

    /// Queues the table of `T`. Tables are created in registration order.
    pub fn register<T: Model>(mut self) -> Self {
        self.tables.push(TableDef { name: T::table_name(), columns: T::columns() });
        self
    }

    /// Names of the queued tables.
    pub fn tables(&self) -> Vec<&'static str> {
        self.tables.iter().map(|t| t.name).collect()
    }

    /// Creates every queued table and its indexes in a single transaction.
    ///
    /// On failure nothing is committed and the error names the table.
    pub async fn run(self) -> Result<(), Error> {
        let mut tx = self.db.pool.begin().await.map_err(Error::Connectivity)?;

        for table in &self.tables {
            let (create, indexes) = query_builder::create_table_sql(self.db.driver, table.name, &table.columns);

            for stmt in std::iter::once(create).chain(indexes) {
                sqlx::query(&stmt)
                    .execute(&mut *tx)
                    .await
                    .map_err(|source| Error::Schema { table: table.name.to_string(), source })?;
            }

            log::debug!("table {} is present", table.name);
        }

        tx.commit().await?;
        Ok(())
    }
}
