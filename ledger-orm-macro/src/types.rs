//! # Type Mapping Module
//!
//! Maps Rust field types to the SQL types used in `CREATE TABLE`.
//!
//! - `i32` → `INTEGER`, `i64` → `BIGINT`
//! - `String` → `TEXT` (or `VARCHAR(N)` with `size`)
//! - `bool` → `BOOLEAN`
//! - `f64` → `DOUBLE PRECISION`
//! - `Option<T>` → SQL type of `T`, nullable
//!
//! Anything else falls back to `TEXT`.

use syn::{GenericArgument, PathArguments, Type};

/// Returns the SQL type for `ty` and whether the column is nullable.
///
/// ```rust,ignore
/// let (sql_type, nullable) = rust_type_to_sql(&parse_quote!(Option<i64>));
/// assert_eq!(sql_type, "BIGINT");
/// assert!(nullable);
/// ```
pub fn rust_type_to_sql(ty: &Type) -> (String, bool) {
    let Type::Path(type_path) = ty else {
        return ("TEXT".to_string(), false);
    };
    let Some(segment) = type_path.path.segments.last() else {
        return ("TEXT".to_string(), false);
    };

    let type_name = segment.ident.to_string();

    if type_name == "Option"
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner_ty)) = args.args.first()
    {
        let (inner_sql_type, _) = rust_type_to_sql(inner_ty);
        return (inner_sql_type, true);
    }

    let sql_type = match type_name.as_str() {
        "i8" | "i16" | "u8" => "SMALLINT",
        "i32" | "u16" | "u32" => "INTEGER",
        "i64" | "u64" => "BIGINT",
        "bool" => "BOOLEAN",
        "f32" => "REAL",
        "f64" => "DOUBLE PRECISION",
        _ => "TEXT",
    };

    (sql_type.to_string(), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_plain_types() {
        assert_eq!(rust_type_to_sql(&parse_quote!(i64)), ("BIGINT".to_string(), false));
        assert_eq!(rust_type_to_sql(&parse_quote!(String)), ("TEXT".to_string(), false));
    }

    #[test]
    fn test_option_is_nullable() {
        assert_eq!(rust_type_to_sql(&parse_quote!(Option<String>)), ("TEXT".to_string(), true));
        assert_eq!(rust_type_to_sql(&parse_quote!(Option<i64>)), ("BIGINT".to_string(), true));
    }

    #[test]
    fn test_unknown_type_falls_back_to_text() {
        assert_eq!(rust_type_to_sql(&parse_quote!(serde_json::Value)), ("TEXT".to_string(), false));
    }
}
