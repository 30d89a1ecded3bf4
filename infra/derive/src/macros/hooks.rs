use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{ImplItem, ItemImpl, parse_quote};

/// Hook method name paired with its `Capabilities` flag.
const HOOKS: [(&str, &str); 5] = [
    ("set_up", "SET_UP"),
    ("set_with_dictionary", "DICTIONARY"),
    ("set_with_array", "ARRAY"),
    ("set_with_decoder", "DECODER"),
    ("encode_with_encoder", "ENCODER"),
];

pub fn expand(mut input: ItemImpl) -> TokenStream {
    if input.trait_.is_none() {
        return syn::Error::new_spanned(&input.self_ty, "hooks must be applied to `impl Model for ..`")
            .to_compile_error();
    }

    let mut flags = Vec::new();
    for item in &input.items {
        match item {
            ImplItem::Const(item) if item.ident == "CAPABILITIES" => {
                return syn::Error::new_spanned(
                    &item.ident,
                    "CAPABILITIES is generated by #[hooks]; remove the explicit constant",
                )
                .to_compile_error();
            },
            ImplItem::Fn(method) => {
                let name = method.sig.ident.to_string();
                if let Some((_, flag)) = HOOKS.iter().find(|(hook, _)| *hook == name) {
                    flags.push(format_ident!("{flag}"));
                }
            },
            _ => {},
        }
    }

    input.items.push(parse_quote! {
        const CAPABILITIES: ::basis_model::Capabilities =
            ::basis_model::Capabilities::empty()#(.union(::basis_model::Capabilities::#flags))*;
    });

    quote! { #input }
}
