//! Error taxonomy (spec §7).
//!
//! Recoverable failures surface through [`Error`]; internal-consistency
//! violations (unreachable lowering states) are compiler bugs and use
//! `unreachable!`/`panic!` instead of this type, per §7 "Internal".

use crate::schema::Handle;
use std::fmt;

/// A source span, when the failing term/declaration came from parsed text.
/// The lexer/parser itself is an external collaborator (spec.md §1); we only
/// carry spans forward if the caller attached one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// The recoverable error taxonomy of spec.md §7.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("syntax error: {message}")]
    Syntax {
        message: String,
        span: Option<Span>,
    },

    #[error("name resolution error: {message}")]
    NameResolution {
        message: String,
        handle: Option<Handle>,
    },

    #[error("context error: {message}")]
    Context {
        message: String,
        handle: Option<Handle>,
    },

    #[error("type/range error: {message}")]
    TypeRange {
        message: String,
        handle: Option<Handle>,
    },

    #[error("structural error: {message}")]
    Structural {
        message: String,
        handle: Option<Handle>,
    },

    #[error("consistency error: {message}")]
    Consistency {
        message: String,
        handle: Option<Handle>,
    },
}

impl Error {
    pub fn syntax(message: impl Into<String>) -> Self {
        Error::Syntax { message: message.into(), span: None }
    }

    pub fn name_resolution(message: impl Into<String>) -> Self {
        Error::NameResolution { message: message.into(), handle: None }
    }

    pub fn context(message: impl Into<String>, handle: Handle) -> Self {
        Error::Context { message: message.into(), handle: Some(handle) }
    }

    pub fn type_range(message: impl Into<String>) -> Self {
        Error::TypeRange { message: message.into(), handle: None }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Error::Structural { message: message.into(), handle: None }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Error::Consistency { message: message.into(), handle: None }
    }

    /// The constraint/column handle this error was raised against, if any.
    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Error::Syntax { .. } => None,
            Error::NameResolution { handle, .. }
            | Error::Context { handle, .. }
            | Error::TypeRange { handle, .. }
            | Error::Structural { handle, .. }
            | Error::Consistency { handle, .. } => handle.as_ref(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
