//! Derive macro for autowire-di
//!
//! `#[derive(Autowire)]` implements `autowire_di::Autowire` for a struct:
//! every field becomes a constructor parameter, in declaration order.
//!
//! ```rust,ignore
//! use autowire_di::{Autowire, Container};
//! use std::sync::Arc;
//!
//! #[derive(Autowire)]
//! #[autowire(namespace = "App")]
//! struct Transport {
//!     #[autowire(default = String::from("localhost"))]
//!     host: String,
//! }
//!
//! #[derive(Autowire)]
//! #[autowire(namespace = "App")]
//! struct Mailer {
//!     // Typed: resolved from `app.transport`
//!     transport: Arc<Transport>,
//!     #[autowire(default = 25)]
//!     port: u16,
//!     // Not a parameter, uses Default
//!     #[autowire(skip)]
//!     sent: std::sync::atomic::AtomicU64,
//! }
//!
//! let container = Container::builder()
//!     .class::<Transport>()
//!     .class::<Mailer>()
//!     .build();
//! let mailer = container.get_as::<Mailer>("app.mailer").unwrap();
//! ```
//!
//! # Struct attributes
//!
//! - `#[autowire(class = "App::Mailer")]` - full class name
//! - `#[autowire(namespace = "App")]` - class name is `App::{StructName}`
//!
//! Without either the class name is the struct name.
//!
//! # Field attributes
//!
//! - `#[autowire(default = expr)]` - default value
//! - `#[autowire(skip)]` - not a parameter, initialized with `Default::default()`
//! - `#[autowire(class = "App::Thing")]` - declared class of the parameter
//! - `#[autowire(untyped)]` - an `Arc<T>` field without a declared class
//!
//! `Arc<T>` fields declare `T::CLASS` unless marked `untyped`. Other fields
//! are untyped and taken by value, so they must be `Clone`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, LitStr, Type};

#[proc_macro_derive(Autowire, attributes(autowire))]
pub fn derive_autowire(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let class = class_name(input)?;

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Autowire can only be derived for structs",
            ));
        }
    };

    let body = match fields {
        Fields::Named(named) => {
            let mut parameters = Vec::new();
            let mut inits = Vec::new();
            for field in &named.named {
                let Some(ident) = field.ident.as_ref() else {
                    continue;
                };
                let options = FieldOptions::parse(&field.attrs)?;
                if options.skip {
                    inits.push(quote! { #ident: ::std::default::Default::default() });
                    continue;
                }
                let (parameter, init) = parameter(&ident.unraw().to_string(), &field.ty, options);
                parameters.push(parameter);
                inits.push(quote! { #ident: #init });
            }

            if parameters.is_empty() {
                quote! {
                    ::autowire_di::ClassDescriptor::without_constructor(
                        <Self as ::autowire_di::Autowire>::CLASS,
                        || Self { #(#inits),* },
                    )
                }
            } else {
                quote! {
                    ::autowire_di::ClassDescriptor::with_constructor(
                        <Self as ::autowire_di::Autowire>::CLASS,
                        ::std::vec![#(#parameters),*],
                        |args: &mut ::autowire_di::Arguments| {
                            ::std::result::Result::Ok(Self { #(#inits),* })
                        },
                    )
                }
            }
        }
        Fields::Unit => quote! {
            ::autowire_di::ClassDescriptor::without_constructor(
                <Self as ::autowire_di::Autowire>::CLASS,
                || Self,
            )
        },
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Autowire needs named fields to name constructor parameters",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::autowire_di::Autowire for #name #ty_generics #where_clause {
            const CLASS: &'static str = #class;

            fn descriptor() -> ::autowire_di::ClassDescriptor {
                #body
            }
        }
    })
}

/// Class name from the struct attributes
fn class_name(input: &DeriveInput) -> syn::Result<String> {
    let mut class = None;
    let mut namespace = None;

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("autowire")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("class") {
                class = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("namespace") {
                namespace = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("expected `class` or `namespace`"))
            }
        })?;
    }

    let ident = input.ident.unraw().to_string();
    Ok(match (class, namespace) {
        (Some(class), _) => class,
        (None, Some(namespace)) => format!("{namespace}::{ident}"),
        (None, None) => ident,
    })
}

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    untyped: bool,
    class: Option<String>,
    default: Option<Expr>,
}

impl FieldOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("autowire")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                    Ok(())
                } else if meta.path.is_ident("untyped") {
                    options.untyped = true;
                    Ok(())
                } else if meta.path.is_ident("class") {
                    options.class = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else if meta.path.is_ident("default") {
                    options.default = Some(meta.value()?.parse::<Expr>()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `skip`, `untyped`, `class` or `default`"))
                }
            })?;
        }
        Ok(options)
    }
}

/// Parameter declaration and field initializer for one field
fn parameter(name: &str, ty: &Type, options: FieldOptions) -> (TokenStream2, TokenStream2) {
    let arc_inner = arc_inner_type(ty);

    let declaration = match (&options.class, arc_inner) {
        (Some(class), _) => quote! { ::autowire_di::Parameter::typed(#name, #class) },
        (None, Some(inner)) if !options.untyped => {
            quote! { ::autowire_di::Parameter::of::<#inner>(#name) }
        }
        _ => quote! { ::autowire_di::Parameter::untyped(#name) },
    };

    let declaration = match (&options.default, arc_inner) {
        (Some(default), Some(inner)) => quote! {
            #declaration.with_default_erased(::autowire_di::erase_arc::<#inner>(#default))
        },
        (Some(default), None) => quote! { #declaration.with_default::<#ty>(#default) },
        (None, _) => declaration,
    };

    let init = match arc_inner {
        Some(inner) => quote! { args.next::<#inner>()? },
        None => quote! { args.next_cloned::<#ty>()? },
    };

    (declaration, init)
}

/// Extract T from Arc<T>
fn arc_inner_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(syn::GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
