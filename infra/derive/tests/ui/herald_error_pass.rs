use herald_derive::herald_error;
use std::borrow::Cow;

#[herald_error]
pub enum SinkFailure {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Callback failed{}: {message}", format_context(.context))]
    Callback { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn open() -> Result<()> {
    let io: std::result::Result<(), std::io::Error> =
        Err(std::io::Error::other("flag file unreadable"));
    io.context("Reading diagnostic flag")?;
    Ok(())
}

fn main() {
    let err = open().expect_err("io error expected");
    assert!(err.to_string().contains("(Reading diagnostic flag)"));

    let internal: SinkFailure = "boom".into();
    let with_context: Result<()> = Err::<(), _>(internal).context("during delivery");
    assert!(with_context.unwrap_err().to_string().ends_with("(during delivery): boom"));
}
