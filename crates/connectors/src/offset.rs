//! Offset-based cursor tokens shared by the bundled query services.

use crate::error::ServiceError;
use model::pagination::cursor::Cursor;

/// Number of matching rows already handed out before `cursor`.
pub fn decode(cursor: &Cursor) -> Result<usize, ServiceError> {
    match cursor {
        Cursor::Start => Ok(0),
        Cursor::Token(token) => token
            .parse::<usize>()
            .map_err(|_| ServiceError::InvalidCursor(format!("Unsupported cursor token: {token}"))),
    }
}

pub fn encode(offset: usize) -> Cursor {
    Cursor::token(offset.to_string())
}
