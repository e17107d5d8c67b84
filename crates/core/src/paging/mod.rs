//! Merging of independently paginated sources under one overall limit.
//!
//! Report endpoints assemble a single result page from several backend
//! partitions at once. Each partition exposes a [`Cursor`];
//! [`MultiCursorLimitIterator`] drains the cursors strictly in order while
//! honoring one caller-requested limit, and leaves every cursor it did not
//! touch in a resumable position.

mod token;

pub use token::{NextToken, TokenError};

use std::collections::VecDeque;

use thiserror::Error;
use tracing::trace;

/// Request size used for the underlying fetches when the overall limit is
/// unbounded or larger than one reasonable page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Boxed error produced by a failing [`Cursor`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures surfaced while merging paginated sources.
#[derive(Debug, Error)]
pub enum PagingError {
    /// A cursor fetch failed. The iterator yields this once and then ends.
    #[error("source {index} failed: {source}")]
    SourceFailure {
        /// Position of the failing cursor in the source list.
        index: usize,
        /// The error the cursor reported.
        #[source]
        source: BoxError,
    },
    /// A limit outside the representable range was supplied.
    #[error("invalid limit: {0}")]
    InvalidArgument(String),
}

/// Overall cap on the number of items a [`MultiCursorLimitIterator`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Drain every source completely.
    Unbounded,
    /// Yield at most this many items across all sources combined.
    Count(usize),
}

impl Limit {
    fn is_spent(self) -> bool {
        matches!(self, Limit::Count(0))
    }

    fn request_size(self, page_size: usize) -> usize {
        match self {
            Limit::Unbounded => page_size,
            Limit::Count(n) => n.min(page_size),
        }
    }

    fn consume(&mut self, n: usize) {
        if let Limit::Count(remaining) = self {
            *remaining = remaining.saturating_sub(n);
        }
    }
}

impl From<usize> for Limit {
    fn from(n: usize) -> Self {
        Limit::Count(n)
    }
}

impl From<Option<usize>> for Limit {
    fn from(n: Option<usize>) -> Self {
        n.map_or(Limit::Unbounded, Limit::Count)
    }
}

impl TryFrom<i64> for Limit {
    type Error = PagingError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        usize::try_from(n).map(Limit::Count).map_err(|_| {
            PagingError::InvalidArgument(format!("limit must be non-negative, got {n}"))
        })
    }
}

/// A resumable handle over one paginated data source.
///
/// `fetch` returns at most `limit` items; returning fewer signals that the
/// source is exhausted. Fetching again after exhaustion yields an empty page.
/// Implementations are free to perform I/O internally; a failed fetch is
/// never retried by the iterator.
pub trait Cursor {
    /// Item type produced by this source.
    type Item;

    /// Fetches the next page, at most `limit` items long.
    fn fetch(&mut self, limit: usize) -> Result<Vec<Self::Item>, BoxError>;
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;

    fn fetch(&mut self, limit: usize) -> Result<Vec<Self::Item>, BoxError> {
        (**self).fetch(limit)
    }
}

/// Adapts a plain `FnMut(usize)` closure into a [`Cursor`].
pub struct FnCursor<F>(pub F);

impl<T, F> Cursor for FnCursor<F>
where
    F: FnMut(usize) -> Result<Vec<T>, BoxError>,
{
    type Item = T;

    fn fetch(&mut self, limit: usize) -> Result<Vec<T>, BoxError> {
        (self.0)(limit)
    }
}

/// Merges several cursors into one sequence bounded by a single [`Limit`].
///
/// Sources are drained strictly in the order given. A source that returns a
/// short page is exhausted and never consulted again; a source that fills its
/// request keeps its position for the next pull. Sources beyond the point
/// where the limit is reached are never invoked at all, so their cursors stay
/// valid for a later resumption.
///
/// The iterator is single-pass and yields `Result` items: a cursor failure is
/// yielded once as [`PagingError::SourceFailure`], after which the iterator
/// is terminal.
///
/// Fetched pages are buffered internally until pulled. Dropping the iterator
/// mid-page discards the buffered remainder; the underlying source has
/// already advanced past those items, so resumption picks up after them.
pub struct MultiCursorLimitIterator<C: Cursor> {
    cursors: Vec<C>,
    remaining: Limit,
    source_index: usize,
    page_size: usize,
    buffered: VecDeque<C::Item>,
    failed: bool,
}

impl<C: Cursor> MultiCursorLimitIterator<C> {
    /// Creates an iterator over `cursors` bounded by `limit`.
    pub fn new(limit: impl Into<Limit>, cursors: Vec<C>) -> Self {
        Self {
            cursors,
            remaining: limit.into(),
            source_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            buffered: VecDeque::new(),
            failed: false,
        }
    }

    /// Overrides [`DEFAULT_PAGE_SIZE`] for the underlying fetches. A zero
    /// page size would stall the iterator and is clamped to one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Items the overall limit still allows, `None` when unbounded.
    pub fn remaining(&self) -> Option<usize> {
        match self.remaining {
            Limit::Unbounded => None,
            Limit::Count(n) => Some(n),
        }
    }
}

impl<C: Cursor> Iterator for MultiCursorLimitIterator<C> {
    type Item = Result<C::Item, PagingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Some(Ok(item));
            }
            if self.failed || self.remaining.is_spent() {
                return None;
            }
            let cursor = self.cursors.get_mut(self.source_index)?;
            let request = self.remaining.request_size(self.page_size);
            let mut page = match cursor.fetch(request) {
                Ok(page) => page,
                Err(source) => {
                    self.failed = true;
                    return Some(Err(PagingError::SourceFailure {
                        index: self.source_index,
                        source,
                    }));
                }
            };
            // Cursors must not hand back more than requested; excess is dropped.
            page.truncate(request);
            trace!(
                source = self.source_index,
                requested = request,
                received = page.len(),
                "fetched page"
            );
            self.remaining.consume(page.len());
            if page.len() < request {
                // Short page: the source is exhausted, move to the next one.
                self.source_index += 1;
            }
            self.buffered.extend(page);
        }
    }
}
