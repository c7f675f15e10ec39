use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the pagination cursor.
///
/// The token carried by [`Cursor::Token`] is owned by the query service that produced it
/// and must be treated as opaque by everything else.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Cursor {
    /// No cursor yet, fetch the first page.
    #[default]
    Start,

    /// Continuation token returned by the service after a page fetch.
    Token(String),
}

impl Cursor {
    pub fn token(value: impl Into<String>) -> Self {
        Cursor::Token(value.into())
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Cursor::Start => None,
            Cursor::Token(token) => Some(token),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Start => write!(f, "<start>"),
            Cursor::Token(token) => write!(f, "{token}"),
        }
    }
}
