use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimal identifier of a stored record, as returned by keys-only fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub entity: String,
    pub id: String,
}

impl RecordKey {
    pub fn new(entity: &str, id: impl Into<String>) -> Self {
        RecordKey {
            entity: entity.to_string(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.id)
    }
}
