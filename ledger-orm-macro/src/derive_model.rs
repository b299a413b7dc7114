//! # Model Derive Macro Implementation
//!
//! Expands `#[derive(Model)]` into a `ledger_orm::Model` implementation plus a
//! `{model}_fields` module of column-name constants.
//!
//! ```rust,ignore
//! #[derive(Model)]
//! #[orm(table = "accounts")]
//! struct Account {
//!     #[orm(primary_key)]
//!     email: String,
//!     #[orm(default = "active")]
//!     status: String,
//! }
//!
//! // Generated:
//! impl ledger_orm::Model for Account {
//!     fn table_name() -> &'static str { "accounts" }
//!     fn columns() -> Vec<ledger_orm::ColumnInfo> { /* ... */ }
//!     fn active_columns() -> Vec<&'static str> { vec!["email", "status"] }
//!     fn to_map(&self) -> HashMap<String, String> { /* ... */ }
//! }
//!
//! pub mod account_fields {
//!     pub const EMAIL: &str = "email";
//!     pub const STATUS: &str = "status";
//! }
//! ```

use heck::{ToShoutySnakeCase, ToSnakeCase};
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, LitStr};

use crate::types::rust_type_to_sql;

/// Reads the struct-level `#[orm(table = "...")]`, defaulting to the
/// snake_case struct name.
fn table_name(ast: &DeriveInput) -> syn::Result<String> {
    let mut table = None;

    for attr in &ast.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported struct-level orm attribute, expected `table`"))
            }
        })?;
    }

    Ok(table.unwrap_or_else(|| ast.ident.to_string().to_snake_case()))
}

pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let struct_name = &ast.ident;
    let table = table_name(&ast)?;

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields,
            _ => return Err(syn::Error::new(Span::call_site(), "Model must have named fields")),
        },
        _ => return Err(syn::Error::new(Span::call_site(), "Model must be a struct")),
    };

    let mut column_defs = Vec::new();
    let mut map_inserts = Vec::new();
    let mut field_names = Vec::new();
    let mut field_consts = Vec::new();

    for f in &fields.named {
        let Some(field_ident) = &f.ident else {
            continue;
        };
        let column = field_ident.to_string();
        let column = column.strip_prefix("r#").unwrap_or(&column).to_string();

        let (mut sql_type, is_nullable) = rust_type_to_sql(&f.ty);

        let mut is_primary_key = false;
        let mut auto_increment = false;
        let mut unique = false;
        let mut index = false;
        let mut size = None;
        let mut default_tokens = quote! { None };

        for attr in &f.attrs {
            if !attr.path().is_ident("orm") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    is_primary_key = true;
                } else if meta.path.is_ident("auto_increment") {
                    auto_increment = true;
                } else if meta.path.is_ident("unique") {
                    unique = true;
                } else if meta.path.is_ident("index") {
                    index = true;
                } else if meta.path.is_ident("size") {
                    let value: syn::LitInt = meta.value()?.parse()?;
                    size = Some(value.base10_parse::<usize>()?);
                } else if meta.path.is_ident("default") {
                    let value: LitStr = meta.value()?.parse()?;
                    let value = value.value();
                    default_tokens = quote! { Some(#value) };
                } else {
                    return Err(meta.error("unsupported orm attribute"));
                }
                Ok(())
            })?;
        }

        if auto_increment && !is_primary_key {
            return Err(syn::Error::new_spanned(field_ident, "auto_increment requires primary_key"));
        }

        if let Some(s) = size
            && sql_type == "TEXT"
        {
            sql_type = format!("VARCHAR({})", s);
        }

        column_defs.push(quote! {
            ledger_orm::ColumnInfo {
                name: #column,
                sql_type: #sql_type,
                is_primary_key: #is_primary_key,
                is_nullable: #is_nullable,
                auto_increment: #auto_increment,
                unique: #unique,
                index: #index,
                default: #default_tokens,
            }
        });

        // Option<T> fields are only written when Some, so NULL and DEFAULT apply.
        map_inserts.push(if is_nullable {
            quote! {
                if let Some(val) = &self.#field_ident {
                    map.insert(#column.to_string(), val.to_string());
                }
            }
        } else {
            quote! {
                map.insert(#column.to_string(), self.#field_ident.to_string());
            }
        });

        let const_ident = format_ident!("{}", column.to_shouty_snake_case());
        field_consts.push(quote! { pub const #const_ident: &str = #column; });
        field_names.push(column);
    }

    let fields_mod = format_ident!("{}_fields", struct_name.to_string().to_snake_case());

    Ok(quote! {
        impl ledger_orm::Model for #struct_name {
            fn table_name() -> &'static str {
                #table
            }

            fn columns() -> Vec<ledger_orm::ColumnInfo> {
                vec![#(#column_defs),*]
            }

            fn active_columns() -> Vec<&'static str> {
                vec![#(#field_names),*]
            }

            fn to_map(&self) -> std::collections::HashMap<String, String> {
                let mut map = std::collections::HashMap::new();
                #(#map_inserts)*
                map
            }
        }

        #[allow(dead_code)]
        pub mod #fields_mod {
            #(#field_consts)*
        }
    })
}
