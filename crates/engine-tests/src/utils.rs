use async_trait::async_trait;
use connectors::service::PagedQueryService;
use model::{
    core::value::FieldValue,
    pagination::{cursor::Cursor, page::Page, page_size::PageSize},
    records::row::RowData,
};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::debug;

/// Countries assigned round-robin to generated users.
pub const COUNTRIES: [&str; 4] = ["UK", "US", "FI", "DE"];

pub fn user(id: i64) -> RowData {
    let country = COUNTRIES[(id as usize - 1) % COUNTRIES.len()];
    RowData::new(
        "users",
        vec![
            FieldValue::new("id", id),
            FieldValue::new("name", format!("user-{id}")),
            FieldValue::new("country_code", country),
            FieldValue::new("age", 18 + id % 50),
        ],
    )
}

/// Users with ids `1..=count`, in id order.
pub fn users(count: i64) -> Vec<RowData> {
    (1..=count).map(user).collect()
}

/// The same users as [`users`], rendered as CSV with a header row.
pub fn users_csv(count: i64) -> String {
    let mut csv = String::from("id,name,country_code,age\n");
    for row in users(count) {
        let cells: Vec<String> = ["id", "name", "country_code", "age"]
            .iter()
            .map(|field| row.get_value(field).to_string())
            .collect();
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    csv
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).expect("create fixture file");
    file.write_all(content.as_bytes())
        .expect("write fixture file");
    path
}

pub fn page_size(n: usize) -> PageSize {
    PageSize::new(n).expect("positive page size")
}

/// One fetch observed by [`RecordingService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub keys_only: bool,
    pub cursor: Cursor,
    pub page_size: usize,
    pub returned: usize,
    pub more: bool,
}

/// Wraps a query service and records every page it serves.
pub struct RecordingService<S> {
    inner: S,
    calls: Mutex<Vec<FetchCall>>,
}

impl<S> RecordingService<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn fetches(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    pub fn reset(&self) {
        self.calls.lock().expect("calls lock").clear();
    }

    fn record<T>(&self, keys_only: bool, cursor: Cursor, page_size: PageSize, page: &Page<T>) {
        let call = FetchCall {
            keys_only,
            cursor,
            page_size: page_size.get(),
            returned: page.len(),
            more: page.more,
        };
        debug!(?call, "Recorded fetch.");
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl<S: PagedQueryService> PagedQueryService for RecordingService<S> {
    type Query = S::Query;
    type Record = S::Record;
    type Key = S::Key;
    type Error = S::Error;

    async fn fetch_keys(
        &self,
        query: &Self::Query,
        page_size: PageSize,
        cursor: Cursor,
    ) -> Result<Page<Self::Key>, Self::Error> {
        let page = self
            .inner
            .fetch_keys(query, page_size, cursor.clone())
            .await?;
        self.record(true, cursor, page_size, &page);
        Ok(page)
    }

    async fn fetch_records(
        &self,
        query: &Self::Query,
        page_size: PageSize,
        cursor: Cursor,
    ) -> Result<Page<Self::Record>, Self::Error> {
        let page = self
            .inner
            .fetch_records(query, page_size, cursor.clone())
            .await?;
        self.record(false, cursor, page_size, &page);
        Ok(page)
    }
}
