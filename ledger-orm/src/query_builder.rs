//! # Query Builder Module
//!
//! Renders the SQL statements used by sessions and the migrator, and binds
//! string values from `Model::to_map` to their column types.
//!
//! All rendering is pure so the generated SQL can be checked per driver
//! without a live database.

// ============================================================================
// External Crate Imports
// ============================================================================

use sqlx::{any::AnyArguments, Arguments};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{database::Drivers, model::ColumnInfo, Error};

// ============================================================================
// Identifiers and Placeholders
// ============================================================================

/// Quotes an identifier for the driver.
pub fn quote_ident(driver: Drivers, ident: &str) -> String {
    match driver {
        Drivers::MySQL => format!("`{}`", ident.replace('`', "``")),
        _ => format!("\"{}\"", ident.replace('"', "\"\"")),
    }
}

/// Bind placeholder for the 1-based argument `idx`.
pub fn placeholder(driver: Drivers, idx: usize) -> String {
    match driver {
        Drivers::Postgres => format!("${}", idx),
        _ => "?".to_string(),
    }
}

// ============================================================================
// DDL
// ============================================================================

/// Renders one column definition of a `CREATE TABLE` statement.
fn column_definition(driver: Drivers, col: &ColumnInfo) -> String {
    let name = quote_ident(driver, col.name);

    if col.auto_increment {
        // SQLite only aliases the rowid for the exact spelling INTEGER PRIMARY KEY.
        return match driver {
            Drivers::SQLite => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", name),
            Drivers::Postgres => format!("{} BIGSERIAL PRIMARY KEY", name),
            Drivers::MySQL => format!("{} BIGINT AUTO_INCREMENT PRIMARY KEY", name),
        };
    }

    let mut def = format!("{} {}", name, col.sql_type);

    if col.is_primary_key {
        def.push_str(" PRIMARY KEY");
    } else if !col.is_nullable {
        def.push_str(" NOT NULL");
    }

    if let Some(value) = col.default {
        def.push_str(&format!(" DEFAULT '{}'", value.replace('\'', "''")));
    }

    if col.unique {
        def.push_str(" UNIQUE");
    }

    def
}

/// Renders `CREATE TABLE IF NOT EXISTS` plus one statement per indexed column.
///
/// Both are no-ops against an existing schema, so running them twice is safe.
pub fn create_table_sql(driver: Drivers, table: &str, columns: &[ColumnInfo]) -> (String, Vec<String>) {
    let column_defs: Vec<String> = columns.iter().map(|col| column_definition(driver, col)).collect();

    let create = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(driver, table),
        column_defs.join(", ")
    );

    let indexes = columns
        .iter()
        .filter(|col| col.index && !col.is_primary_key)
        .map(|col| {
            let kind = if col.unique { "UNIQUE INDEX" } else { "INDEX" };
            let index_name = format!("idx_{}_{}", table, col.name);
            let if_not_exists = match driver {
                Drivers::MySQL => "",
                _ => "IF NOT EXISTS ",
            };
            format!(
                "CREATE {} {}{} ON {} ({})",
                kind,
                if_not_exists,
                quote_ident(driver, &index_name),
                quote_ident(driver, table),
                quote_ident(driver, col.name)
            )
        })
        .collect();

    (create, indexes)
}

// ============================================================================
// DML
// ============================================================================

/// Renders an INSERT for the given columns, in order.
pub fn insert_sql(driver: Drivers, table: &str, columns: &[&str]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(driver, c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| placeholder(driver, i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(driver, table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Renders a SELECT of `columns`, optionally filtered by `column = ?`.
pub fn select_sql(driver: Drivers, table: &str, columns: &[&str], filter: Option<&str>) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(driver, c)).collect();
    let mut query = format!("SELECT {} FROM {}", names.join(", "), quote_ident(driver, table));

    if let Some(column) = filter {
        query.push_str(&format!(" WHERE {} = {}", quote_ident(driver, column), placeholder(driver, 1)));
    }

    query
}

/// Renders `SELECT COUNT(*)` for a table.
pub fn count_sql(driver: Drivers, table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_ident(driver, table))
}

// ============================================================================
// Value Binding
// ============================================================================

/// Binds a string value as the Rust type matching `sql_type`.
///
/// Integer and boolean columns are parsed so that Postgres receives the
/// right wire type; a value that does not parse is rejected rather than
/// silently replaced.
pub fn bind_value(args: &mut AnyArguments<'_>, value: &str, sql_type: &str) -> Result<(), Error> {
    let added = match sql_type {
        "SMALLINT" | "INTEGER" => {
            let v: i32 = value
                .parse()
                .map_err(|_| Error::InvalidData(format!("'{}' is not a valid {}", value, sql_type)))?;
            args.add(v)
        }
        "BIGINT" => {
            let v: i64 = value
                .parse()
                .map_err(|_| Error::InvalidData(format!("'{}' is not a valid {}", value, sql_type)))?;
            args.add(v)
        }
        "BOOLEAN" => {
            let v: bool = value
                .parse()
                .map_err(|_| Error::InvalidData(format!("'{}' is not a valid {}", value, sql_type)))?;
            args.add(v)
        }
        "REAL" | "DOUBLE PRECISION" => {
            let v: f64 = value
                .parse()
                .map_err(|_| Error::InvalidData(format!("'{}' is not a valid {}", value, sql_type)))?;
            args.add(v)
        }
        _ => args.add(value.to_string()),
    };

    added.map_err(|e| Error::InvalidData(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &'static str, sql_type: &'static str) -> ColumnInfo {
        ColumnInfo {
            name,
            sql_type,
            is_primary_key: false,
            is_nullable: false,
            auto_increment: false,
            unique: false,
            index: false,
            default: None,
        }
    }

    #[test]
    fn test_create_table_with_default_and_index() {
        let columns = vec![
            ColumnInfo { is_primary_key: true, ..col("email", "TEXT") },
            ColumnInfo { default: Some("active"), ..col("status", "TEXT") },
            ColumnInfo { index: true, ..col("id", "BIGINT") },
            ColumnInfo { is_nullable: true, ..col("password", "TEXT") },
        ];

        let (create, indexes) = create_table_sql(Drivers::SQLite, "accounts", &columns);

        assert_eq!(
            create,
            "CREATE TABLE IF NOT EXISTS \"accounts\" (\"email\" TEXT PRIMARY KEY, \
             \"status\" TEXT NOT NULL DEFAULT 'active', \"id\" BIGINT NOT NULL, \"password\" TEXT)"
        );
        assert_eq!(indexes, vec!["CREATE INDEX IF NOT EXISTS \"idx_accounts_id\" ON \"accounts\" (\"id\")"]);
    }

    #[test]
    fn test_auto_increment_per_driver() {
        let id = ColumnInfo { is_primary_key: true, auto_increment: true, is_nullable: true, ..col("id", "BIGINT") };

        let (sqlite, _) = create_table_sql(Drivers::SQLite, "t", std::slice::from_ref(&id));
        let (pg, _) = create_table_sql(Drivers::Postgres, "t", std::slice::from_ref(&id));
        let (mysql, _) = create_table_sql(Drivers::MySQL, "t", std::slice::from_ref(&id));

        assert!(sqlite.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(pg.contains("\"id\" BIGSERIAL PRIMARY KEY"));
        assert!(mysql.contains("`id` BIGINT AUTO_INCREMENT PRIMARY KEY"));
    }

    #[test]
    fn test_placeholders_follow_driver() {
        assert_eq!(insert_sql(Drivers::Postgres, "t", &["a", "b"]), "INSERT INTO \"t\" (\"a\", \"b\") VALUES ($1, $2)");
        assert_eq!(insert_sql(Drivers::SQLite, "t", &["a", "b"]), "INSERT INTO \"t\" (\"a\", \"b\") VALUES (?, ?)");
        assert_eq!(
            select_sql(Drivers::Postgres, "t", &["a"], Some("a")),
            "SELECT \"a\" FROM \"t\" WHERE \"a\" = $1"
        );
    }

    #[test]
    fn test_default_literal_is_escaped() {
        let c = ColumnInfo { default: Some("it's"), ..col("s", "TEXT") };
        let (create, _) = create_table_sql(Drivers::SQLite, "t", &[c]);
        assert!(create.contains("DEFAULT 'it''s'"));
    }

    #[test]
    fn test_bind_rejects_non_numeric_bigint() {
        let mut args = AnyArguments::default();
        assert!(bind_value(&mut args, "12", "BIGINT").is_ok());
        assert!(matches!(bind_value(&mut args, "twelve", "BIGINT"), Err(Error::InvalidData(_))));
    }
}
