use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvSettings {
    pub delimiter: char,

    /// Column holding the record key. Rows are keyed by line number when unset
    /// or when the column is missing.
    pub key_column: Option<String>,
}

impl Default for CsvSettings {
    fn default() -> Self {
        CsvSettings {
            delimiter: ',',
            key_column: Some("id".to_string()),
        }
    }
}
