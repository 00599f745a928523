use std::borrow::Cow;

/// Errors returned by center operations that report success to the caller.
///
/// Sink failures never surface here; see [`crate::SinkError`].
#[herald_derive::herald_error]
pub enum CenterError {
    /// The event name was empty or only whitespace.
    #[error("Invalid event name{}: {message}", format_context(context))]
    InvalidEventName { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The sink could not be attached: malformed or incompatible slot signature, unknown slot,
    /// or a foreign object that is not callable. No connection was created.
    #[error("Sink attach rejected{}: {message}", format_context(context))]
    SinkAttachRejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl CenterError {
    pub(crate) fn rejected(message: impl Into<Cow<'static, str>>) -> Self {
        Self::SinkAttachRejected { message: message.into(), context: None }
    }
}
