#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the Nexo workspace.
//!
//! At the moment the crate exposes a single attribute, [`macro@nexo_error`], which turns a
//! plain enum into the error type every crate of the workspace uses. Keeping the wiring in
//! one macro means that each crate's error enum reads the same way: variants with
//! `message`/`source` fields, an optional `context` annotation and a `...Ext` trait to attach it.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! nexo-derive = { path = "../infra/derive" }
//! thiserror = "2"
//! ```

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining crate-level error enums.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already derived.
/// * `<ErrorName>Ext` trait with `.context(...)` for `Result<T, ErrorName>` and for
///   `Result<T, SourceError>` of every variant that wraps a source error.
/// * `From<SourceError>` for every variant with a `source` (or `#[source]`/`#[from]`) field.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant is present.
/// * An inherent `context(&self) -> Option<&str>` accessor returning the annotation, if any.
/// * A private `format_context` helper used inside `#[error(...)]` strings.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants only.
/// 2. A `context` field must be typed `Option<Cow<'static, str>>`.
/// 3. Variants wrapping a source error must carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use nexo_derive::nexo_error;
/// use std::borrow::Cow;
///
/// #[nexo_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("catalog.toml").context("Loading catalog")
/// }
/// ```
#[proc_macro_attribute]
pub fn nexo_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
