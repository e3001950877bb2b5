//! Derive macro for `oxide-bind` records.
//!
//! This crate provides the `#[derive(Record)]` macro, which maps the public
//! fields of a struct to SQL column names for binding and scanning.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, Meta, Type,
    Visibility,
};

/// Derives `oxide_bind::record::Record` for a struct with named fields.
///
/// Only `pub` fields are mapped. Field types must implement
/// `oxide_bind::record::FieldDef`: the built-in leaves, other records, custom
/// types registered with `impl_sql_convert!`, and `Option`/`Box` of those.
/// Records nested directly, or through `Option`/`Box`, are flattened into
/// the parent's column namespace.
///
/// # Field Attributes
///
/// - `#[column(name = "column_name")]` - Overrides the column name
///   (defaults to the field name)
/// - `#[column(scalar)]` - Binds a collection as one argument instead of
///   expanding it
/// - `#[column(skip)]` - Excludes the field from mapping
///
/// # Generated Items
///
/// - A static `RecordDescriptor` listing the mapped fields
/// - `Record`, `Field` and `FieldDef` impls for the struct
#[proc_macro_derive(Record, attributes(column))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_record_impl(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_record_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Record derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Record derive only supports structs",
            ));
        }
    };

    let mut mapped: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let attrs = parse_column_attrs(&field.attrs)?;
        if attrs.skip || !matches!(field.vis, Visibility::Public(_)) {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        if attrs.name.as_deref() == Some("") {
            return Err(syn::Error::new_spanned(
                field,
                "column name must not be empty",
            ));
        }
        mapped.push(FieldInfo {
            column: attrs.name.unwrap_or_else(|| ident.to_string()),
            ident,
            ty: field.ty.clone(),
            scalar: attrs.scalar,
        });
    }

    let name_str = struct_name.to_string();

    let descriptors: Vec<TokenStream2> = mapped
        .iter()
        .map(|info| {
            let ident_str = info.ident.to_string();
            let column = &info.column;
            let scalar = info.scalar;
            let ty = &info.ty;
            quote! {
                ::oxide_bind::record::FieldDescriptor {
                    ident: #ident_str,
                    column: #column,
                    scalar: #scalar,
                    shape: <#ty as ::oxide_bind::record::FieldDef>::SHAPE,
                }
            }
        })
        .collect();

    let indices: Vec<usize> = (0..mapped.len()).collect();
    let idents: Vec<&Ident> = mapped.iter().map(|info| &info.ident).collect();

    let expanded = quote! {
        impl ::oxide_bind::record::Record for #struct_name {
            fn descriptor() -> &'static ::oxide_bind::record::RecordDescriptor {
                static DESCRIPTOR: ::oxide_bind::record::RecordDescriptor =
                    ::oxide_bind::record::RecordDescriptor {
                        name: #name_str,
                        type_id: ::std::any::TypeId::of::<#struct_name>,
                        fields: &[#(#descriptors),*],
                    };
                &DESCRIPTOR
            }

            fn record_descriptor(&self) -> &'static ::oxide_bind::record::RecordDescriptor {
                <Self as ::oxide_bind::record::Record>::descriptor()
            }

            fn field(&self, index: usize) -> ::std::option::Option<&dyn ::oxide_bind::record::Field> {
                match index {
                    #(#indices => ::std::option::Option::Some(
                        &self.#idents as &dyn ::oxide_bind::record::Field
                    ),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::std::option::Option<&mut dyn ::oxide_bind::record::Field> {
                match index {
                    #(#indices => ::std::option::Option::Some(
                        &mut self.#idents as &mut dyn ::oxide_bind::record::Field
                    ),)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::oxide_bind::record::Field for #struct_name {
            fn node(&self) -> ::oxide_bind::record::Node<'_> {
                ::oxide_bind::record::Node::Record(self)
            }

            fn node_mut(&mut self) -> ::oxide_bind::record::NodeMut<'_> {
                ::oxide_bind::record::NodeMut::Record(self)
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }

        impl ::oxide_bind::record::FieldDef for #struct_name {
            const SHAPE: ::oxide_bind::record::Shape =
                ::oxide_bind::record::Shape::record::<#struct_name>();
        }
    };

    Ok(expanded)
}

struct FieldInfo {
    ident: Ident,
    ty: Type,
    column: String,
    scalar: bool,
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    scalar: bool,
    skip: bool,
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("column") {
            continue;
        }
        // Handle empty attribute like #[column]
        if matches!(attr.meta, Meta::Path(_)) {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("scalar") {
                result.scalar = true;
            } else if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("name") {
                let value: Expr = meta.value()?.parse()?;
                match value {
                    Expr::Lit(lit) => match lit.lit {
                        Lit::Str(s) => result.name = Some(s.value()),
                        other => return Err(syn::Error::new_spanned(other, "expected a string")),
                    },
                    other => return Err(syn::Error::new_spanned(other, "expected a string")),
                }
            } else {
                return Err(meta.error("unknown column attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}
