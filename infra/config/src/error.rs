use std::borrow::Cow;

/// Errors raised while loading configuration.
#[herald_derive::herald_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}
