use async_trait::async_trait;
use model::pagination::{cursor::Cursor, page::Page, page_size::PageSize};

/// A query backend that hands out results one page at a time.
///
/// Implementations own query evaluation, ordering and consistency. Callers only pass
/// back the cursor of the previous page; [`Cursor::Start`] always means "from the
/// beginning". A page never holds more than `page_size` items.
#[async_trait]
pub trait PagedQueryService: Send + Sync {
    /// Filter/sort criteria, opaque to callers that only paginate.
    type Query: Send + Sync;
    /// Full record payload.
    type Record: Send;
    /// Minimal per-record identifier returned by keys-only fetches.
    type Key: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Keys-only fetch, enough to count matches.
    async fn fetch_keys(
        &self,
        query: &Self::Query,
        page_size: PageSize,
        cursor: Cursor,
    ) -> Result<Page<Self::Key>, Self::Error>;

    /// Fetches full records.
    async fn fetch_records(
        &self,
        query: &Self::Query,
        page_size: PageSize,
        cursor: Cursor,
    ) -> Result<Page<Self::Record>, Self::Error>;
}
