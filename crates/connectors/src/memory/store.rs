use crate::{error::ServiceError, offset, service::PagedQueryService};
use async_trait::async_trait;
use model::{
    pagination::{cursor::Cursor, page::Page, page_size::PageSize},
    query::QuerySpec,
    records::{key::RecordKey, row::RowData},
};
use std::{collections::HashMap, time::Instant};
use tokio::sync::RwLock;
use tracing::debug;

const DEFAULT_KEY_FIELD: &str = "id";

/// Query service over rows held in memory, grouped by entity.
///
/// Every fetch evaluates the query against the current contents, so writes between
/// two page fetches are visible to the next page. Cursor tokens are offsets into the
/// filtered and sorted result.
pub struct MemoryQueryService {
    entities: RwLock<HashMap<String, Vec<RowData>>>,
    key_field: String,
}

impl MemoryQueryService {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            key_field: DEFAULT_KEY_FIELD.to_string(),
        }
    }

    /// Uses `field` as the record key instead of `id`.
    pub fn with_key_field(mut self, field: &str) -> Self {
        self.key_field = field.to_string();
        self
    }

    pub async fn insert_many(&self, rows: impl IntoIterator<Item = RowData>) {
        let mut entities = self.entities.write().await;
        for row in rows {
            entities.entry(row.entity.clone()).or_default().push(row);
        }
    }

    /// Removes every row of `entity` whose key equals `id`. Returns how many were removed.
    pub async fn remove(&self, entity: &str, id: &str) -> usize {
        let mut entities = self.entities.write().await;
        let Some(rows) = entities.get_mut(entity) else {
            return 0;
        };

        let before = rows.len();
        rows.retain(|row| {
            row.get(&self.key_field)
                .is_none_or(|f| f.value.to_string() != id)
        });
        before - rows.len()
    }

    pub async fn clear(&self, entity: &str) {
        self.entities.write().await.remove(entity);
    }

    pub async fn len(&self, entity: &str) -> usize {
        self.entities
            .read()
            .await
            .get(entity)
            .map_or(0, |rows| rows.len())
    }

    pub async fn is_empty(&self, entity: &str) -> bool {
        self.len(entity).await == 0
    }

    /// Evaluates the query against the current rows and converts only the requested page.
    ///
    /// `extract` sees each paged row with its storage position while the read lock is held.
    async fn fetch_slice<T>(
        &self,
        query: &QuerySpec,
        page_size: PageSize,
        cursor: &Cursor,
        extract: impl Fn(usize, &RowData) -> T,
    ) -> Result<Page<T>, ServiceError> {
        let start = Instant::now();
        let from = offset::decode(cursor)?;

        let entities = self.entities.read().await;
        let mut matches: Vec<(usize, &RowData)> = entities
            .get(&query.entity)
            .map(|rows| {
                rows.iter()
                    .enumerate()
                    .filter(|(_, row)| query.matches(row))
                    .collect()
            })
            .unwrap_or_default();
        query.sort_by_row(&mut matches, |(_, row)| *row);

        let total = matches.len();
        let to = from.saturating_add(page_size.get()).min(total);
        let items: Vec<T> = matches[from.min(to)..to]
            .iter()
            .map(|(pos, row)| extract(*pos, row))
            .collect();

        let more = to < total;
        debug!(
            entity = %query.entity,
            from,
            returned = items.len(),
            total,
            more,
            "Served page from memory."
        );

        Ok(Page::new(items, offset::encode(to.max(from)), more)
            .with_took_ms(start.elapsed().as_millis()))
    }

    fn key_for(&self, position: usize, row: &RowData) -> RecordKey {
        let id = row
            .get(&self.key_field)
            .map(|f| f.value.to_string())
            .unwrap_or_else(|| position.to_string());
        RecordKey::new(&row.entity, id)
    }
}

impl Default for MemoryQueryService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PagedQueryService for MemoryQueryService {
    type Query = QuerySpec;
    type Record = RowData;
    type Key = RecordKey;
    type Error = ServiceError;

    async fn fetch_keys(
        &self,
        query: &QuerySpec,
        page_size: PageSize,
        cursor: Cursor,
    ) -> Result<Page<RecordKey>, ServiceError> {
        self.fetch_slice(query, page_size, &cursor, |pos, row| self.key_for(pos, row))
            .await
    }

    async fn fetch_records(
        &self,
        query: &QuerySpec,
        page_size: PageSize,
        cursor: Cursor,
    ) -> Result<Page<RowData>, ServiceError> {
        self.fetch_slice(query, page_size, &cursor, |_, row| row.clone())
            .await
    }
}
