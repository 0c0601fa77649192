//! Fields derive macro implementation

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields, Ident, LitStr};

use crate::attributes::{self, ColumnAttributes};

/// One struct field and the column it maps to
pub struct MappedField {
    pub ident: Ident,
    pub column: String,
    pub attrs: ColumnAttributes,
}

/// Named fields of `input` with their column attributes.
pub fn mapped_fields(input: &DeriveInput, derive: &str) -> syn::Result<Vec<MappedField>> {
    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                format!("{} can only be derived for structs with named fields", derive),
            ))
        }
    };

    let mut mapped = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let attrs = attributes::parse_column_attributes(field)?;
        let column = attrs
            .column_name
            .clone()
            .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
        if !column
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(syn::Error::new_spanned(
                field,
                format!("column name '{}' must match [A-Za-z0-9_]+", column),
            ));
        }
        mapped.push(MappedField {
            ident,
            column,
            attrs,
        });
    }
    Ok(mapped)
}

/// `impl quarry::Fields` for `input`.
pub fn fields_impl(input: &DeriveInput, fields: &[MappedField]) -> TokenStream2 {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mapped: Vec<&MappedField> = fields.iter().filter(|f| !f.attrs.is_skipped).collect();
    let names: Vec<LitStr> = mapped
        .iter()
        .map(|f| LitStr::new(&f.column, f.ident.span()))
        .collect();
    let idents: Vec<&Ident> = mapped.iter().map(|f| &f.ident).collect();

    let decoders = fields.iter().map(|f| {
        let ident = &f.ident;
        if f.attrs.is_skipped {
            quote! { #ident: ::std::default::Default::default() }
        } else {
            let column = LitStr::new(&f.column, f.ident.span());
            quote! { #ident: ::quarry::decode_field(record, #column)? }
        }
    });

    quote! {
        impl #impl_generics ::quarry::Fields for #name #ty_generics #where_clause {
            fn field_names() -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn to_record(&self) -> ::quarry::Record {
                let mut record = ::quarry::Record::new();
                #(
                    record.set(
                        #names,
                        ::quarry::Value::from(::std::clone::Clone::clone(&self.#idents)),
                    );
                )*
                record
            }

            fn from_record(record: &::quarry::Record) -> ::std::result::Result<Self, ::quarry::QuarryError> {
                ::std::result::Result::Ok(Self {
                    #(#decoders),*
                })
            }
        }
    }
}

pub fn derive_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match mapped_fields(&input, "Fields") {
        Ok(fields) => fields_impl(&input, &fields).into(),
        Err(e) => e.to_compile_error().into(),
    }
}
