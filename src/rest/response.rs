//! Result types for listing and sync operations.
//!
//! [`ListResult<T>`] implements `Deref<Target = [T]>`, so a page can be used
//! like a slice of records:
//!
//! ```rust
//! use exact_online::rest::ListResult;
//!
//! let page = ListResult::new(vec!["a", "b"], None);
//! assert_eq!(page.len(), 2);
//! assert_eq!(page[0], "a");
//! assert!(!page.has_more());
//! ```
//!
//! # Pagination semantics
//!
//! Following [`ListResult::next`] until it is `None` visits every record the
//! API served at least once. Records inserted or deleted while paging may be
//! seen zero or two times; that is an upstream limitation of skip-token
//! paging, so callers that need exact snapshots should use sync instead.

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};

use crate::rest::odata::parse_next_url;

/// An opaque continuation token for cursor listing.
///
/// It carries the `__next` locator returned by the API together with the
/// query it must be replayed with. The value is not validated; a cursor from
/// another division or an older schema simply yields whatever the API
/// returns for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCursor {
    next_url: String,
    path: String,
    query: BTreeMap<String, String>,
}

impl PageCursor {
    /// Creates a cursor from a `__next` locator.
    #[must_use]
    pub fn new(next_url: impl Into<String>) -> Self {
        let next_url = next_url.into();
        let (path, query) = parse_next_url(&next_url);
        Self {
            next_url,
            path,
            query,
        }
    }

    /// Returns the raw `__next` locator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.next_url
    }

    /// Returns the endpoint to request, relative to the division.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the query parameters to replay.
    #[must_use]
    pub const fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }
}

/// One page of a cursor listing.
#[derive(Clone, Debug)]
pub struct ListResult<T> {
    /// The records on this page.
    pub items: Vec<T>,
    /// The cursor for the next page, `None` on the last page.
    pub next: Option<PageCursor>,
}

impl<T> ListResult<T> {
    /// Creates a page.
    #[must_use]
    pub const fn new(items: Vec<T>, next: Option<PageCursor>) -> Self {
        Self { items, next }
    }

    /// Returns `true` if another page can be fetched.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Consumes the page and returns its records.
    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> Deref for ListResult<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T> IntoIterator for ListResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Which kind of baseline a sync produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// Native sync endpoint with a row-version watermark.
    Watermark,
    /// Cursor listing filtered on the modification time.
    ModifiedSince,
}

/// The baseline to resume a sync from.
///
/// The two kinds are not interchangeable: a watermark is a per-resource row
/// version and says nothing about wall-clock time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncBaseline {
    /// The highest row version seen.
    Watermark(i64),
    /// The latest modification time seen, `None` if nothing was ever seen.
    ModifiedSince(Option<DateTime<Utc>>),
}

impl SyncBaseline {
    /// Returns the sync mode this baseline belongs to.
    #[must_use]
    pub const fn mode(&self) -> SyncMode {
        match self {
            Self::Watermark(_) => SyncMode::Watermark,
            Self::ModifiedSince(_) => SyncMode::ModifiedSince,
        }
    }

    /// Returns the watermark, if this is a watermark baseline.
    #[must_use]
    pub const fn watermark(&self) -> Option<i64> {
        match self {
            Self::Watermark(watermark) => Some(*watermark),
            Self::ModifiedSince(_) => None,
        }
    }

    /// Returns the modification time, if this is a modified-since baseline.
    #[must_use]
    pub const fn modified_since(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Watermark(_) => None,
            Self::ModifiedSince(since) => *since,
        }
    }
}

/// One step of an incremental sync.
#[derive(Clone, Debug)]
pub struct SyncResult<T> {
    /// The records returned.
    pub items: Vec<T>,
    /// The baseline to pass to the next call.
    pub baseline: SyncBaseline,
    /// `true` if the caller must call again with the new baseline.
    pub has_more: bool,
}

impl<T> SyncResult<T> {
    /// Returns the sync mode that produced this result.
    #[must_use]
    pub const fn mode(&self) -> SyncMode {
        self.baseline.mode()
    }
}
