use crate::error::{CenterError, Result};
use crate::identity::EventId;
use std::fmt;

/// Argument type name every event signal carries.
pub const EVENT_ARG: &str = "Event";

/// A normalized method signature: `name(Arg1,Arg2)`.
///
/// Normalization strips whitespace, `const` qualifiers, trailing references and namespace
/// prefixes, so `"onEvent( const framework::Event & )"` becomes `"onEvent(Event)"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    name: String,
    args: Vec<String>,
}

impl Signature {
    /// Parses and normalizes a slot signature.
    ///
    /// # Errors
    /// Returns [`CenterError::SinkAttachRejected`] when the text is not `ident(args)`.
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = || CenterError::rejected(format!("malformed signature '{raw}'"));

        let raw = raw.trim();
        let (name, rest) = raw.split_once('(').ok_or_else(malformed)?;
        let inner = rest.strip_suffix(')').ok_or_else(malformed)?;
        let name = name.trim();
        if !is_identifier(name) || inner.contains(['(', ')']) {
            return Err(malformed());
        }

        let args = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(normalize_type).collect::<Option<Vec<_>>>().ok_or_else(malformed)?
        };

        Ok(Self { name: name.to_owned(), args })
    }

    /// The signal an identity emits: `"<event name>(Event)"`.
    #[must_use]
    pub fn signal(id: &EventId) -> Self {
        Self { name: id.name().to_owned(), args: vec![EVENT_ARG.to_owned()] }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// A slot can receive this signal when its arguments are a prefix of the signal's.
    #[must_use]
    pub fn accepts(&self, slot: &Self) -> bool {
        slot.args.len() <= self.args.len() && self.args.iter().zip(&slot.args).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.join(","))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn normalize_type(arg: &str) -> Option<String> {
    let arg = arg.trim();
    let arg = arg.strip_prefix("const ").unwrap_or(arg);
    let arg = arg.strip_suffix(" const").unwrap_or(arg);
    let compact: String = arg.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.strip_suffix('&').unwrap_or(&compact);
    let base = compact.rsplit("::").next().unwrap_or(compact);
    (!base.is_empty()).then(|| base.to_owned())
}
