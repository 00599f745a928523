#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the herald crates.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! herald-derive = { path = "../../infra/derive" }
//! ```
//!
//! The doc examples are `ignore`d because a proc-macro crate cannot use its own macros;
//! see `tests/ui` for compiled cases.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for declaring a crate's error enum.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already derived.
/// * `Result<T, E = ErrorName>` alias in the same module.
/// * `<ErrorName>Ext` trait with `.context(...)` for `Result<T, ErrorName>` and, for every
///   variant with a source, for `Result<T, SourceError>`.
/// * `From<SourceError>` for every variant that has both a source and a context field.
/// * `From<&'static str>` and `From<String>` when an `Internal { message, context }`
///   variant exists.
/// * A module-level `format_context` helper for use inside `#[error(...)]` strings.
///
/// # Requirements
///
/// 1. Applied to an **enum** with named-field variants only.
/// 2. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 3. A variant carrying a source (`source` field, `#[source]` or `#[from]`) must also carry
///    a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use herald_derive::herald_error;
/// use std::borrow::Cow;
///
/// #[herald_error]
/// pub enum ConfigError {
///     #[error("Config error{}: {source}", format_context(.context))]
///     Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
///
///     #[error("Internal error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<Settings> {
///     builder.build().context("Failed to build config")?;
///     Err("unreachable".into())
/// }
/// ```
#[proc_macro_attribute]
pub fn herald_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}
