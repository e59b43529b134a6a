//! Cursor-based pagination over list endpoints
//!
//! List endpoints answer with
//!
//! ```json
//! {"count": 3, "next": "https://.../jobs/?page=2&page_size=2", "results": [...]}
//! ```
//!
//! [`Paginator::list`] turns such an endpoint into a lazy stream of records.
//! The first request carries `page_size`; later requests follow the
//! server-supplied `next` URL verbatim until it is null. Every record of a
//! page is yielded, in server order, before the next page is fetched.
//!
//! Records are not deduplicated. If the server deletes records while a
//! traversal is in progress, later pages may shift and records can be
//! skipped or repeated. Callers that need a consistent view must tolerate
//! this.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, trace};

use crate::error::{RescaleError, Result};
use crate::transport::Transport;

/// A lazy, single-use sequence of records
pub type RecordStream<T> = BoxStream<'static, Result<T>>;

/// One page of a list response
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub next: Option<String>,
}

impl Page {
    /// Validate a raw page body.
    ///
    /// Records come from `results`, or the legacy `result` field. A body
    /// without either, or without a `next` key, is a protocol violation.
    pub fn from_value(mut value: Value) -> Result<Self> {
        let obj = value
            .as_object_mut()
            .ok_or_else(|| RescaleError::Protocol("page body is not a JSON object".to_string()))?;

        let records = match obj
            .remove("results")
            .filter(|v| !v.is_null())
            .or_else(|| obj.remove("result"))
        {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(RescaleError::Protocol(format!(
                    "page results is not an array: {}",
                    other
                )));
            }
            None => {
                return Err(RescaleError::Protocol(
                    "page has no 'results' field".to_string(),
                ));
            }
        };

        let next = match obj.remove("next") {
            None => {
                return Err(RescaleError::Protocol(
                    "page has no 'next' field".to_string(),
                ));
            }
            Some(Value::Null) => None,
            Some(Value::String(url)) if url.is_empty() => None,
            Some(Value::String(url)) => Some(url),
            Some(other) => {
                return Err(RescaleError::Protocol(format!(
                    "page 'next' is not a URL: {}",
                    other
                )));
            }
        };

        Ok(Self { records, next })
    }
}

/// Append the page size to a list path
pub fn with_page_size(path: &str, page_size: u32) -> String {
    let connector = if path.contains('?') { '&' } else { '?' };
    format!("{}{}page_size={}", path, connector, page_size)
}

/// Produces record streams from list endpoints
#[derive(Debug, Clone)]
pub struct Paginator {
    transport: Transport,
    page_size: u32,
    max_attempts: u32,
}

struct Cursor {
    transport: Transport,
    max_attempts: u32,
    buffer: VecDeque<Value>,
    next: Option<String>,
    pages: u32,
}

impl Cursor {
    /// Yield the next buffered record, fetching the following page when the
    /// buffer runs dry
    async fn advance<T: DeserializeOwned>(mut self) -> Result<Option<(T, Cursor)>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                let item: T = serde_json::from_value(record)?;
                return Ok(Some((item, self)));
            }

            let Some(url) = self.next.take() else {
                debug!("Pagination finished after {} page(s)", self.pages);
                return Ok(None);
            };

            let body: Value = self.transport.get_json(&url, self.max_attempts).await?;
            let page = Page::from_value(body)?;
            self.pages += 1;
            trace!(
                "Page {} from {}: {} record(s), next={:?}",
                self.pages,
                url,
                page.records.len(),
                page.next
            );
            self.buffer = page.records.into();
            self.next = page.next;
        }
    }
}

impl Paginator {
    pub fn new(transport: Transport, page_size: u32, max_attempts: u32) -> Self {
        Self {
            transport,
            page_size,
            max_attempts,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Stream every record of a list endpoint, decoded as `T`.
    ///
    /// Each call starts a fresh traversal from the first page. The stream
    /// ends after the first error.
    pub fn list<T>(&self, path: &str) -> RecordStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let cursor = Cursor {
            transport: self.transport.clone(),
            max_attempts: self.max_attempts,
            buffer: VecDeque::new(),
            next: Some(with_page_size(path, self.page_size)),
            pages: 0,
        };

        stream::try_unfold(cursor, Cursor::advance::<T>).boxed()
    }

    /// First record of a list endpoint, fetching only the first page
    pub async fn first<T>(&self, path: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.list(path).try_next().await
    }

    /// Drain a list endpoint into memory
    pub async fn collect_all<T>(&self, path: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.list(path).try_collect().await
    }
}
