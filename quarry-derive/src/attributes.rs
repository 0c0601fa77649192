//! Attribute parsing utilities

use syn::{Attribute, ExprLit, Field, Lit};

/// String value of a `#[name = "..."]` attribute.
fn str_value(attr: &Attribute) -> syn::Result<String> {
    let meta = attr.meta.require_name_value()?;
    match &meta.value {
        syn::Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Struct-level attributes
#[derive(Default)]
pub struct TableAttributes {
    pub table_name: Option<String>,
    pub unique_groups: Vec<Vec<String>>,
    pub relations: Vec<String>,
    pub preload: Option<syn::Path>,
}

pub fn parse_table_attributes(attrs: &[Attribute]) -> syn::Result<TableAttributes> {
    let mut table = TableAttributes::default();

    for attr in attrs {
        if attr.path().is_ident("table_name") {
            table.table_name = Some(str_value(attr)?);
        } else if attr.path().is_ident("unique_group") {
            let group = split_list(&str_value(attr)?);
            if group.len() < 2 {
                return Err(syn::Error::new_spanned(
                    attr,
                    "unique_group needs at least two comma-separated columns; use #[unique] for one",
                ));
            }
            table.unique_groups.push(group);
        } else if attr.path().is_ident("relations") {
            table.relations.extend(split_list(&str_value(attr)?));
        } else if attr.path().is_ident("preload") {
            let value = str_value(attr)?;
            table.preload = Some(syn::parse_str::<syn::Path>(&value).map_err(|e| {
                syn::Error::new_spanned(attr, format!("preload must name a function: {}", e))
            })?);
        }
    }

    Ok(table)
}

/// Field-level attributes
#[derive(Default)]
pub struct ColumnAttributes {
    pub column_name: Option<String>,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub is_soft_delete: bool,
    pub is_skipped: bool,
}

pub fn parse_column_attributes(field: &Field) -> syn::Result<ColumnAttributes> {
    let mut column = ColumnAttributes::default();

    for attr in &field.attrs {
        if attr.path().is_ident("column_name") {
            column.column_name = Some(str_value(attr)?);
        } else if attr.path().is_ident("primary_key") {
            column.is_primary_key = true;
        } else if attr.path().is_ident("unique") {
            column.is_unique = true;
        } else if attr.path().is_ident("soft_delete") {
            column.is_soft_delete = true;
        } else if attr.path().is_ident("skip") {
            column.is_skipped = true;
        }
    }

    Ok(column)
}
