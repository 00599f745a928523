use std::borrow::Cow;

/// A failure raised while invoking a single sink.
///
/// Logged at the sink boundary by the dispatcher; never returned from a post.
#[herald_derive::herald_error]
pub enum SinkError {
    /// A native callback reported failure.
    #[error("Callback failed{}: {message}", format_context(context))]
    Callback { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The sink panicked; the panic was contained.
    #[error("Sink panicked{}: {message}", format_context(context))]
    Panicked { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The foreign runtime raised an error; it has already been cleared there.
    #[error("Foreign call failed{}: {message}", format_context(context))]
    Foreign { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A toolkit slot invocation failed.
    #[error("Slot invocation failed{}: {message}", format_context(context))]
    Toolkit { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl SinkError {
    /// Shorthand for [`SinkError::Callback`] without context.
    pub fn callback(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Callback { message: message.into(), context: None }
    }

    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message: Cow<'static, str> = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Cow::Borrowed(s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Cow::Owned(s.clone())
        } else {
            Cow::Borrowed("non-string panic payload")
        };
        Self::Panicked { message, context: None }
    }
}
