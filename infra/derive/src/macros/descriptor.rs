use proc_macro2::TokenStream;
use quote::quote;
use std::path::{Component, Path};
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Expr, ItemStruct, Lit, LitStr, Meta, Token};

#[derive(Default)]
struct DescriptorArgs {
    name: Option<LitStr>,
    resource: Option<LitStr>,
    save: Option<LitStr>,
}

impl DescriptorArgs {
    fn parse(args: TokenStream) -> syn::Result<Self> {
        let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
        let mut parsed = Self::default();

        for meta in metas {
            let Meta::NameValue(pair) = meta else {
                return Err(syn::Error::new_spanned(
                    meta,
                    "Expected `name = \"...\"`, `resource = \"...\"` or `save = \"...\"`",
                ));
            };

            let slot = if pair.path.is_ident("name") {
                &mut parsed.name
            } else if pair.path.is_ident("resource") {
                &mut parsed.resource
            } else if pair.path.is_ident("save") {
                &mut parsed.save
            } else {
                return Err(syn::Error::new_spanned(
                    &pair.path,
                    "Only `name`, `resource` and `save` are supported",
                ));
            };

            if slot.is_some() {
                return Err(syn::Error::new_spanned(&pair, "Duplicate descriptor argument"));
            }

            let Expr::Lit(expr) = &pair.value else {
                return Err(syn::Error::new_spanned(&pair.value, "Expected a string literal"));
            };
            let Lit::Str(lit) = &expr.lit else {
                return Err(syn::Error::new_spanned(&pair.value, "Expected a string literal"));
            };
            if lit.value().trim().is_empty() {
                return Err(syn::Error::new_spanned(lit, "Descriptor values cannot be empty"));
            }
            if pair.path.is_ident("name") {
                check_name(lit)?;
            } else {
                check_relative(lit)?;
            }

            *slot = Some(lit.clone());
        }

        Ok(parsed)
    }
}

/// Names become file and directory names.
fn check_name(lit: &LitStr) -> syn::Result<()> {
    let value = lit.value();
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(syn::Error::new_spanned(lit, "Descriptor names cannot act as paths"));
    }
    Ok(())
}

/// Paths resolve under a storage root, so they must stay inside it.
fn check_relative(lit: &LitStr) -> syn::Result<()> {
    let value = lit.value();
    let path = Path::new(&value);
    if path.is_absolute() || value.starts_with(['/', '\\']) {
        return Err(syn::Error::new_spanned(lit, "Descriptor paths must be relative"));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir | Component::Prefix(_))) {
        return Err(syn::Error::new_spanned(lit, "Descriptor paths cannot contain `..`"));
    }
    Ok(())
}

pub fn expand(args: TokenStream, input: ItemStruct) -> TokenStream {
    let args = match DescriptorArgs::parse(args) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error(),
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name = args
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), proc_macro2::Span::call_site()));

    let resource = args.resource.map(|path| {
        quote! {
            fn resource_file() -> ::std::path::PathBuf {
                ::std::path::PathBuf::from(#path)
            }
        }
    });
    let save = args.save.map(|path| {
        quote! {
            fn save_file() -> ::std::path::PathBuf {
                ::std::path::PathBuf::from(#path)
            }
        }
    });

    quote! {
        #input

        #[automatically_derived]
        impl #impl_generics ::basis_model::Descriptor for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
            #resource
            #save
        }
    }
}
