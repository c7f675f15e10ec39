use crate::error::ConfigError;
use connectors::file::csv::settings::CsvSettings;
use engine_core::entity::Entity;
use model::pagination::page_size::PageSize;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};
use tracing::info;

/// Per-entity overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<PageSize>,
}

/// Walker configuration, usually read from a JSON file:
///
/// ```json
/// {
///   "default_page_size": 100,
///   "entities": { "users": { "page_size": 200 } },
///   "csv": { "delimiter": ";", "key_column": "id" }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkerSettings {
    /// Page size for entities without an override.
    #[serde(default)]
    pub default_page_size: PageSize,

    #[serde(default)]
    pub entities: HashMap<String, EntitySettings>,

    /// Reader options for CSV-backed entities.
    #[serde(default)]
    pub csv: CsvSettings,
}

impl WalkerSettings {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;

        let settings = Self::from_json(&source).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        info!(
            path = %path.display(),
            default_page_size = %settings.default_page_size,
            overrides = settings.entities.len(),
            "Loaded walker settings."
        );
        Ok(settings)
    }

    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Page size for the entity named `entity`: its override, else the default.
    pub fn page_size_for(&self, entity: &str) -> PageSize {
        self.override_for(entity)
            .unwrap_or(self.default_page_size)
    }

    /// Page size for `E`: a configured override wins over the type's own page size.
    pub fn page_size_of<E: Entity>(&self) -> PageSize {
        self.override_for(E::NAME).unwrap_or(E::PAGE_SIZE)
    }

    pub fn set_page_size(&mut self, entity: &str, page_size: PageSize) {
        self.entities.entry(entity.to_string()).or_default().page_size = Some(page_size);
    }

    fn override_for(&self, entity: &str) -> Option<PageSize> {
        self.entities.get(entity).and_then(|e| e.page_size)
    }
}
