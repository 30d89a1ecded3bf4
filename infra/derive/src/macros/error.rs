use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Field, Fields, Ident, Type, Variant};

struct ErrorVariant<'a> {
    ident: &'a Ident,
    source: Option<&'a Field>,
    has_context: bool,
    cfg: Vec<&'a Attribute>,
}

impl<'a> ErrorVariant<'a> {
    fn parse(variant: &'a Variant) -> syn::Result<Self> {
        let Fields::Named(fields) = &variant.fields else {
            return Err(syn::Error::new_spanned(
                variant,
                "basis_error variants must use named fields",
            ));
        };

        let mut has_context = false;
        let mut source = None;

        for field in &fields.named {
            let Some(ident) = &field.ident else { continue };
            if ident == "context" {
                if !is_context_type(&field.ty) {
                    return Err(syn::Error::new_spanned(
                        &field.ty,
                        "`context` must be `Option<Cow<'static, str>>`",
                    ));
                }
                has_context = true;
            } else if source.is_none()
                && (ident == "source" || has_attr(field, "source") || has_attr(field, "from"))
            {
                source = Some(field);
            }
        }

        if source.is_some() && !has_context {
            return Err(syn::Error::new_spanned(
                &variant.ident,
                "variants with a source need a `context: Option<Cow<'static, str>>` field",
            ));
        }

        Ok(Self {
            ident: &variant.ident,
            source,
            has_context,
            cfg: variant.attrs.iter().filter(|attr| attr.path().is_ident("cfg")).collect(),
        })
    }

    fn is_internal(&self) -> bool {
        self.ident == "Internal"
    }
}

pub fn expand(input: DeriveInput) -> TokenStream {
    try_expand(&input).unwrap_or_else(syn::Error::into_compile_error)
}

fn try_expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(&input.ident, "basis_error can only be applied to enums"));
    };

    let variants =
        data.variants.iter().map(ErrorVariant::parse).collect::<syn::Result<Vec<_>>>()?;

    let name = &input.ident;
    let ext = format_ident!("{name}Ext");

    let derives = missing_derives(input);
    let context_trait = context_trait(name, &ext, &variants);
    let conversions = variants
        .iter()
        .filter(|v| !v.is_internal())
        .filter_map(|v| source_conversion(name, &ext, v));
    let internal = variants.iter().find(|v| v.is_internal()).map(|v| internal_conversions(name, v));

    Ok(quote! {
        #derives
        #input

        #context_trait
        #(#conversions)*
        #internal

        #[allow(dead_code)]
        fn format_context(
            context: &Option<::std::borrow::Cow<'static, str>>,
        ) -> ::std::borrow::Cow<'static, str> {
            context.as_ref().map_or(::std::borrow::Cow::Borrowed(""), |c| {
                ::std::borrow::Cow::Owned(format!(" ({c})"))
            })
        }
    })
}

fn missing_derives(input: &DeriveInput) -> TokenStream {
    let mut present = FxHashSet::default();
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(last) = meta.path.segments.last() {
                present.insert(last.ident.to_string());
            }
            Ok(())
        });
    }

    let mut derives = Vec::new();
    if !present.contains("Debug") {
        derives.push(quote! { Debug });
    }
    if !present.contains("Error") {
        derives.push(quote! { ::thiserror::Error });
    }

    if derives.is_empty() { quote! {} } else { quote! { #[derive(#(#derives),*)] } }
}

fn context_trait(name: &Ident, ext: &Ident, variants: &[ErrorVariant<'_>]) -> TokenStream {
    let arms = variants.iter().filter(|v| v.has_context).map(|v| {
        let cfg = &v.cfg;
        let ident = v.ident;
        quote! { #(#cfg)* #name::#ident { context, .. } => *context = Some(message.into()), }
    });

    quote! {
        pub trait #ext<T> {
            /// Attaches a human-readable context to the error branch.
            fn context(
                self,
                context: impl Into<::std::borrow::Cow<'static, str>>,
            ) -> ::std::result::Result<T, #name>;
        }

        #[automatically_derived]
        impl<T> #ext<T> for ::std::result::Result<T, #name> {
            #[inline]
            #[allow(unused_variables)]
            fn context(self, message: impl Into<::std::borrow::Cow<'static, str>>) -> Self {
                self.map_err(|mut error| {
                    match &mut error {
                        #(#arms)*
                        #[allow(unreachable_patterns)]
                        _ => {},
                    }
                    error
                })
            }
        }
    }
}

fn source_conversion(name: &Ident, ext: &Ident, v: &ErrorVariant<'_>) -> Option<TokenStream> {
    let field = v.source?;
    let field_ident = field.ident.as_ref()?;
    let ty = &field.ty;
    let ident = v.ident;
    let cfg = &v.cfg;

    Some(quote! {
        #(#cfg)*
        #[automatically_derived]
        impl ::std::convert::From<#ty> for #name {
            #[inline]
            fn from(#field_ident: #ty) -> Self {
                Self::#ident { #field_ident, context: None }
            }
        }

        #(#cfg)*
        #[automatically_derived]
        impl<T> #ext<T> for ::std::result::Result<T, #ty> {
            #[inline]
            fn context(
                self,
                context: impl Into<::std::borrow::Cow<'static, str>>,
            ) -> ::std::result::Result<T, #name> {
                self.map_err(|#field_ident| #name::#ident { #field_ident, context: Some(context.into()) })
            }
        }
    })
}

fn internal_conversions(name: &Ident, v: &ErrorVariant<'_>) -> TokenStream {
    let cfg = &v.cfg;
    let context = if v.has_context { quote! { , context: None } } else { quote! {} };

    quote! {
        #(#cfg)*
        impl ::std::convert::From<&'static str> for #name {
            #[inline]
            fn from(message: &'static str) -> Self {
                Self::Internal { message: ::std::borrow::Cow::Borrowed(message) #context }
            }
        }

        #(#cfg)*
        impl ::std::convert::From<String> for #name {
            #[inline]
            fn from(message: String) -> Self {
                Self::Internal { message: ::std::borrow::Cow::Owned(message) #context }
            }
        }
    }
}

fn has_attr(field: &Field, name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident(name))
}

fn is_context_type(ty: &Type) -> bool {
    let rendered = quote!(#ty).to_string().replace(' ', "");
    ["Option<", "std::option::Option<", "::std::option::Option<"]
        .iter()
        .find_map(|prefix| rendered.strip_prefix(prefix))
        .is_some_and(|inner| inner.ends_with("Cow<'static,str>>"))
}
