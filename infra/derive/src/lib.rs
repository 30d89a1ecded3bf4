#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the model layer.
//!
//! * [`basis_error`] wires an error enum into `thiserror` with context support.
//! * [`descriptor`] implements `basis_model::Descriptor` for a model struct.
//! * [`hooks`] declares the capability set of an `impl Model for ..` block.
//!
//! Consumers normally reach the model macros through `basis_model`, which re-exports them.
//! The expansions refer to `::basis_model`, so the consuming crate must depend on it.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemImpl, ItemStruct, parse_macro_input};

/// Attribute macro for crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait with `.context(...)` for
///   `Result<T, Name>` and for `Result<T, Source>` of every variant carrying a source.
/// * **Conversions**: `From<Source>` for variants with a `source` field (or `#[source]`/`#[from]`).
/// * **Internal Fallback**: `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * **Formatting helper**: a private `format_context` function usable inside `#[error(...)]`.
///
/// # Requirements
///
/// 1. Applied to an **enum** with named-field variants only.
/// 2. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 3. Variants with a source must also carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use basis_derive::basis_error;
/// use std::borrow::Cow;
///
/// #[basis_error]
/// pub enum ArchiveError {
///     #[error("Encoding failed{}: {source}", format_context(.context))]
///     Encode { source: postcard::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn basis_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}

/// Implements `basis_model::Descriptor` for a model struct.
///
/// # Arguments
///
/// * `name = "..."` - Stable type name used in archives and notifications. Defaults to the
///   struct identifier.
/// * `resource = "..."` - Resource file relative to the resource root.
///   Defaults to `<name>.json`.
/// * `save = "..."` - Save file relative to the save root. Defaults to `<name>.archive`.
///
/// Absolute paths, `..` components and names containing path separators are compile errors.
///
/// # Example
///
/// ```rust,ignore
/// use basis_model::descriptor;
///
/// #[descriptor(name = "config", resource = "defaults/config.toml")]
/// #[derive(Default)]
/// struct Config {
///     timeout: u32,
/// }
/// ```
#[proc_macro_attribute]
pub fn descriptor(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::descriptor::expand(args.into(), input).into()
}

/// Declares `Model::CAPABILITIES` from the hook methods present in an impl block.
///
/// Hooks recognised: `set_up`, `set_with_dictionary`, `set_with_array`,
/// `set_with_decoder` and `encode_with_encoder`. Any other items are left untouched.
///
/// # Example
///
/// ```rust,ignore
/// use basis_model::{Dictionary, DictionaryExt, Model, hooks};
///
/// #[hooks]
/// impl Model for Config {
///     fn set_up(&mut self) {
///         self.timeout = 10;
///     }
///
///     fn set_with_dictionary(&mut self, dict: &Dictionary) {
///         if let Some(timeout) = dict.value_of("timeout") {
///             self.timeout = timeout;
///         }
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn hooks(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemImpl);
    macros::hooks::expand(input).into()
}
