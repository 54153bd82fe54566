//! # cycleguard Derive Macros
//!
//! Provides `#[derive(GraphObject)]`, which implements `cycleguard::GraphObject` (field
//! enumeration in declaration order) and `cycleguard::FieldValue` (so the record can sit in
//! another record's field).
//!
//! Field attributes:
//! * `#[graph(skip)]` leaves the field out.
//! * `#[graph(rename = "name")]` writes the field under another label.
//! * `#[graph(serde)]` writes the field as one leaf through its `serde::Serialize` impl.
//!
//! Type parameters that appear in written, non-`serde` fields get a `FieldValue` bound. Bounds
//! for `serde` fields (`T: Serialize`) must be written on the struct.

use std::collections::HashSet;

use proc_macro::TokenStream;
use proc_macro2::TokenTree;
use quote::{quote, ToTokens};
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, Generics, Ident, LitStr,
};

/// Derives `GraphObject` and `FieldValue` for a struct.
#[proc_macro_derive(GraphObject, attributes(graph))]
pub fn derive_graph_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let data_struct = match &input.data {
        Data::Struct(ds) => ds,
        _ => {
            return syn::Error::new(name.span(), "GraphObject only supports structs")
                .to_compile_error()
                .into();
        }
    };

    let params: HashSet<&Ident> = input.generics.type_params().map(|p| &p.ident).collect();
    let mut bounded: Vec<Ident> = Vec::new();

    let mut fields = Vec::new();
    for (index, field) in data_struct.fields.iter().enumerate() {
        let attrs = match parse_attributes(&field.attrs) {
            Ok(res) => res,
            Err(e) => return e.to_compile_error().into(),
        };
        if attrs.skip {
            continue;
        }

        let (member, default_label) = match (&data_struct.fields, &field.ident) {
            (Fields::Named(_), Some(ident)) => (quote! { #ident }, ident.to_string()),
            _ => {
                let idx = syn::Index::from(index);
                (quote! { #idx }, index.to_string())
            }
        };

        if !attrs.serde {
            collect_params(field.ty.to_token_stream(), &params, &mut bounded);
        }

        fields.push(FieldSpec {
            member,
            label: attrs.rename.unwrap_or(default_label),
            serde: attrs.serde,
        });
    }

    let generics = add_field_value_bounds(&input.generics, &bounded);
    let impl_object = generate_graph_object(name, &generics, &fields);
    let impl_value = generate_field_value(name, &generics);

    let expanded = quote! {
        #impl_object
        #impl_value
    };

    TokenStream::from(expanded)
}

struct FieldSpec {
    member: proc_macro2::TokenStream,
    label: String,
    serde: bool,
}

#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    serde: bool,
    rename: Option<String>,
}

fn parse_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("graph") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    out.skip = true;
                    return Ok(());
                }

                if meta.path.is_ident("serde") {
                    out.serde = true;
                    return Ok(());
                }

                if meta.path.is_ident("rename") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    out.rename = Some(s.value());
                    return Ok(());
                }
                Err(meta.error("Unknown graph attribute key. Supported: skip, serde, rename"))
            })?;
        }
    }
    Ok(out)
}

// --- Bounds ---

/// Records every type parameter from `params` that occurs in `tokens`, once.
fn collect_params(
    tokens: proc_macro2::TokenStream,
    params: &HashSet<&Ident>,
    found: &mut Vec<Ident>,
) {
    for tree in tokens {
        match tree {
            TokenTree::Ident(ident) => {
                if params.contains(&ident) && !found.contains(&ident) {
                    found.push(ident);
                }
            }
            TokenTree::Group(group) => collect_params(group.stream(), params, found),
            _ => {}
        }
    }
}

/// Bounds parameters rather than field types, so recursive types such as
/// `struct Tree<T> { children: Vec<Tree<T>> }` do not require themselves.
fn add_field_value_bounds(generics: &Generics, params: &[Ident]) -> Generics {
    let mut generics = generics.clone();
    if !params.is_empty() {
        let where_clause = generics.make_where_clause();
        for param in params {
            where_clause
                .predicates
                .push(parse_quote!(#param: ::cycleguard::FieldValue));
        }
    }
    generics
}

// --- Generator: GraphObject ---

fn generate_graph_object(
    name: &Ident,
    generics: &Generics,
    fields: &[FieldSpec],
) -> proc_macro2::TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let writes = fields.iter().map(|f| {
        let member = &f.member;
        let label = &f.label;
        if f.serde {
            quote! { writer.serde_field(#label, &self.#member)?; }
        } else {
            quote! { writer.field(#label, &self.#member)?; }
        }
    });

    quote! {
        impl #impl_generics ::cycleguard::GraphObject for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn write_fields(
                &self,
                writer: &mut ::cycleguard::io::RecordWriter<'_, '_>,
            ) -> ::cycleguard::Result<()> {
                #(#writes)*
                Ok(())
            }
        }
    }
}

// --- Generator: FieldValue ---

fn generate_field_value(name: &Ident, generics: &Generics) -> proc_macro2::TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    quote! {
        impl #impl_generics ::cycleguard::FieldValue for #name #ty_generics #where_clause {
            fn write_value(
                &self,
                writer: &mut ::cycleguard::io::RecordWriter<'_, '_>,
            ) -> ::cycleguard::Result<()> {
                writer.write_object(self)
            }
        }
    }
}
