//! Lazy record stream returned by [`PagedQueryWalker::each`](crate::walker::PagedQueryWalker::each).

use futures::{Stream, stream::BoxStream};
use std::{
    pin::Pin,
    task::{Context, Poll},
};

/// Records of a walk, fetched a page at a time as the consumer polls.
///
/// Dropping the stream stops the walk; no further page is requested.
pub struct RecordStream<'a, T, E> {
    stream: BoxStream<'a, Result<T, E>>,
}

impl<'a, T, E> RecordStream<'a, T, E> {
    pub fn new(stream: BoxStream<'a, Result<T, E>>) -> Self {
        Self { stream }
    }
}

impl<T, E> Stream for RecordStream<'_, T, E> {
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

impl<T, E> std::fmt::Debug for RecordStream<'_, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream").finish_non_exhaustive()
    }
}
