use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use strum_macros::Display;

/// Broad category of an [`Error`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Kind {
    /// The caller supplied an unusable configuration
    Validation,
    /// The WebSocket transport failed
    WebSocket,
    /// A host-provided notification or sound sink failed
    Sink,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    /// Shorthand for sinks reporting that a side effect did not happen.
    pub fn sink<S: Into<String>>(reason: S) -> Self {
        SinkFailure {
            reason: reason.into(),
        }
        .into()
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.as_deref()?.downcast_ref::<E>()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{}: {src}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// A notification or sound sink could not deliver its side effect.
#[non_exhaustive]
#[derive(Debug)]
pub struct SinkFailure {
    pub reason: String,
}

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink failure: {}", self.reason)
    }
}

impl StdError for SinkFailure {}

impl From<SinkFailure> for Error {
    fn from(err: SinkFailure) -> Self {
        Error::with_source(Kind::Sink, err)
    }
}
