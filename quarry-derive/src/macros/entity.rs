//! Entity derive macro implementation
//!
//! Emits the `Fields` impl plus `Entity` with table metadata, uniqueness
//! declarations, the soft-delete column and relation hooks.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr};

use super::fields::{fields_impl, mapped_fields, MappedField};
use crate::attributes;
use crate::utils;

pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let span = name.span();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let table = attributes::parse_table_attributes(&input.attrs)?;
    let fields = mapped_fields(input, "Entity")?;
    let mapped: Vec<&MappedField> = fields.iter().filter(|f| !f.attrs.is_skipped).collect();

    let table_name = table
        .table_name
        .clone()
        .unwrap_or_else(|| utils::snake_case(&name.to_string()));
    let table_lit = LitStr::new(&table_name, span);

    let primary_key = primary_key(input, &mapped)?;
    let pk_lit = LitStr::new(&primary_key, span);

    let unique: Vec<LitStr> = mapped
        .iter()
        .filter(|f| f.attrs.is_unique)
        .map(|f| LitStr::new(&f.column, f.ident.span()))
        .collect();

    for group in &table.unique_groups {
        if let Some(missing) = group.iter().find(|c| !mapped.iter().any(|f| &f.column == *c)) {
            return Err(syn::Error::new_spanned(
                name,
                format!("unique_group names unknown column '{}'", missing),
            ));
        }
    }
    let groups = table.unique_groups.iter().map(|group| {
        let cols = group.iter().map(|c| LitStr::new(c, span));
        quote! { &[#(#cols),*] }
    });

    let soft_delete: Vec<&MappedField> = mapped.iter().copied().filter(|f| f.attrs.is_soft_delete).collect();
    if soft_delete.len() > 1 {
        return Err(syn::Error::new_spanned(
            &soft_delete[1].ident,
            "only one field may be marked #[soft_delete]",
        ));
    }
    let soft_delete_fn = soft_delete.first().map(|f| {
        let col = LitStr::new(&f.column, f.ident.span());
        quote! {
            fn soft_delete_column() -> ::std::option::Option<&'static str> {
                ::std::option::Option::Some(#col)
            }
        }
    });

    let relations = table.relations.iter().map(|r| LitStr::new(r, span));
    let preload_fn = table.preload.as_ref().map(|path| {
        quote! {
            fn preload(
                rows: &mut [Self],
                relation: &str,
                rest: ::std::option::Option<&str>,
                executor: &dyn ::quarry::StoreExecutor,
                ctx: &::quarry::CallContext,
            ) -> ::std::result::Result<(), ::quarry::QuarryError> {
                let hook: ::quarry::PreloadFn<Self> = #path;
                hook(rows, relation, rest, executor, ctx)
            }
        }
    });

    let fields_tokens = fields_impl(input, &fields);

    Ok(quote! {
        #fields_tokens

        impl #impl_generics ::quarry::Entity for #name #ty_generics #where_clause {
            const TABLE_NAME: &'static str = #table_lit;
            const PRIMARY_KEY: &'static str = #pk_lit;

            fn unique_fields() -> &'static [&'static str] {
                &[#(#unique),*]
            }

            fn unique_groups() -> &'static [&'static [&'static str]] {
                &[#(#groups),*]
            }

            fn relations() -> &'static [&'static str] {
                &[#(#relations),*]
            }

            #soft_delete_fn

            #preload_fn
        }
    })
}

fn primary_key(input: &DeriveInput, mapped: &[&MappedField]) -> syn::Result<String> {
    let marked: Vec<&&MappedField> = mapped.iter().filter(|f| f.attrs.is_primary_key).collect();
    match marked.as_slice() {
        [single] => Ok(single.column.clone()),
        [] => mapped
            .iter()
            .find(|f| f.ident == "id")
            .map(|f| f.column.clone())
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    &input.ident,
                    "Entity needs a #[primary_key] field or a field named `id`",
                )
            }),
        [_, second, ..] => Err(syn::Error::new_spanned(
            &second.ident,
            "composite primary keys are not supported; mark one field #[primary_key]",
        )),
    }
}
