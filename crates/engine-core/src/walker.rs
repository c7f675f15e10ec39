use crate::{metrics::WalkMetrics, stream::RecordStream};
use connectors::service::PagedQueryService;
use futures::{StreamExt, TryStreamExt, stream};
use model::pagination::{cursor::Cursor, page_size::PageSize};
use std::fmt;
use tracing::{debug, info, warn};

/// What a page request asks the service for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Minimal identifiers, enough to count.
    KeysOnly,
    /// Full records.
    Records,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::KeysOnly => write!(f, "keys_only"),
            FetchMode::Records => write!(f, "records"),
        }
    }
}

/// Progress of one enumeration between page fetches.
enum WalkState {
    Fetching { cursor: Cursor, pages: usize },
    Done,
}

/// Walks every page of a query, one request at a time, until the service reports
/// that no more pages remain.
///
/// Each call to [`count`](Self::count) or [`each`](Self::each) starts from
/// [`Cursor::Start`] and owns its cursor; nothing carries over between calls.
///
/// Pages are fetched one after another, not inside a transaction. Writes that land
/// between two fetches can make a record show up twice or not at all near a page
/// boundary, so neither the count nor the sequence of records is a snapshot.
pub struct PagedQueryWalker<'s, S: PagedQueryService + ?Sized> {
    service: &'s S,
    page_size: PageSize,
    metrics: Option<WalkMetrics>,
}

impl<'s, S: PagedQueryService + ?Sized> PagedQueryWalker<'s, S> {
    pub fn new(service: &'s S) -> Self {
        Self {
            service,
            page_size: PageSize::DEFAULT,
            metrics: None,
        }
    }

    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_metrics(mut self, metrics: WalkMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Counts the records matching `query` by walking keys-only pages.
    ///
    /// The first failed fetch is returned as is and no partial total is reported.
    pub async fn count(&self, query: &S::Query) -> Result<usize, S::Error> {
        let mut cursor = Cursor::Start;
        let mut total = 0usize;
        let mut pages = 0usize;

        loop {
            let page = match self
                .service
                .fetch_keys(query, self.page_size, cursor)
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(mode = %FetchMode::KeysOnly, pages, error = %err, "Page fetch failed.");
                    if let Some(metrics) = &self.metrics {
                        metrics.increment_failures(1);
                    }
                    return Err(err);
                }
            };

            pages += 1;
            total += page.len();
            debug!(
                mode = %FetchMode::KeysOnly,
                page = pages,
                items = page.len(),
                more = page.more,
                next = %page.next_cursor,
                took_ms = page.took_ms,
                "Fetched page."
            );
            if let Some(metrics) = &self.metrics {
                metrics.increment_pages(1);
                metrics.increment_keys(page.len() as u64);
            }

            if !page.more {
                break;
            }
            cursor = page.next_cursor;
        }

        info!(pages, total, "Count finished.");
        Ok(total)
    }

    /// Lazily yields every record matching `query`, in the order the service returns them.
    ///
    /// A page is requested only once the records of the previous one have been consumed
    /// and the stream is polled again, so at most one page is held in memory. A failed
    /// fetch is yielded as the next item, after every record of earlier pages, and ends
    /// the stream. The stream cannot be restarted; call `each` again to walk anew.
    pub fn each<'a>(&self, query: &'a S::Query) -> RecordStream<'a, S::Record, S::Error>
    where
        's: 'a,
    {
        let service: &'a S = self.service;
        let page_size = self.page_size;
        let fetch_metrics = self.metrics.clone();
        let yield_metrics = self.metrics.clone();

        let initial = WalkState::Fetching {
            cursor: Cursor::Start,
            pages: 0,
        };

        let pages = stream::try_unfold(initial, move |state| {
            let metrics = fetch_metrics.clone();
            async move {
                let WalkState::Fetching { cursor, pages } = state else {
                    return Ok(None);
                };

                let page = match service.fetch_records(query, page_size, cursor).await {
                    Ok(page) => page,
                    Err(err) => {
                        warn!(mode = %FetchMode::Records, pages, error = %err, "Page fetch failed.");
                        if let Some(metrics) = &metrics {
                            metrics.increment_failures(1);
                        }
                        return Err(err);
                    }
                };

                let pages = pages + 1;
                debug!(
                    mode = %FetchMode::Records,
                    page = pages,
                    items = page.len(),
                    more = page.more,
                    next = %page.next_cursor,
                    took_ms = page.took_ms,
                    "Fetched page."
                );
                if let Some(metrics) = &metrics {
                    metrics.increment_pages(1);
                }

                let next = if page.more {
                    WalkState::Fetching {
                        cursor: page.next_cursor,
                        pages,
                    }
                } else {
                    info!(pages, "Walk finished.");
                    WalkState::Done
                };

                Ok(Some((page.items, next)))
            }
        });

        let records = pages
            .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, S::Error>)))
            .try_flatten()
            .inspect_ok(move |_| {
                if let Some(metrics) = &yield_metrics {
                    metrics.increment_records(1);
                }
            });

        RecordStream::new(records.boxed())
    }
}
