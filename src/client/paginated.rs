//! Uniform pagination over offset, marker and last-key list APIs.
//!
//! Globus list endpoints signal "there is more" in one of four ways (see
//! [`PagingStrategy`]). A [`PaginatedCall`] wraps a page-fetching operation
//! together with its strategy and result limits; [`PaginatedCall::start`]
//! validates the limits, fetches the first page eagerly and returns a
//! [`PaginatedStream`] that lazily yields individual items from there on.
//!
//! # Example
//!
//! ```
//! use futures_util::TryStreamExt;
//! use globus_sdk::client::paginated::{Page, PaginatedCall, PagingLimits, PagingStrategy};
//!
//! # async fn example() -> globus_sdk::Result<()> {
//! let call = PaginatedCall::<u64>::new(
//!     PagingStrategy::HasNextPage,
//!     PagingLimits::new(10).with_num_results(Some(15)),
//!     |request| {
//!         Box::pin(async move {
//!             let start = request.offset.unwrap_or(0);
//!             let items: Vec<u64> = (start..start + request.limit).collect();
//!             Ok::<_, globus_sdk::Error>(Page::new(items).with_has_next_page(true))
//!         })
//!     },
//! );
//!
//! let items: Vec<u64> = call.start().await?.try_collect().await?;
//! assert_eq!(items.len(), 15);
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::ClientInner;
use crate::models::Service;
use crate::{Error, Result};

/// Page size used when an API does not declare its own.
pub const DEFAULT_MAX_RESULTS_PER_CALL: u64 = 1000;

/// Boxed future returned by page-fetching operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type FetchPage<T> = Arc<dyn Fn(PageRequest) -> BoxFuture<'static, Result<Page<T>>> + Send + Sync>;

/// How a list API reports that more results exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagingStrategy {
    /// Page carries a `has_next_page` flag; paging by `offset`.
    HasNextPage,
    /// Page carries a running `total`; paging by `offset` while below it.
    Total,
    /// Page carries an opaque `last_key`, sent back as `last_key`.
    LastKey,
    /// Page carries an opaque `next_marker`, sent back as `marker`.
    Marker,
}

impl PagingStrategy {
    /// Name of the strategy as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            PagingStrategy::HasNextPage => "has_next_page",
            PagingStrategy::Total => "total",
            PagingStrategy::LastKey => "last_key",
            PagingStrategy::Marker => "marker",
        }
    }

    /// Whether another page should be requested after `page`.
    ///
    /// `offset` is the pagination offset after advancing past `page`.
    pub fn more_available<T>(&self, page: &Page<T>, offset: u64) -> bool {
        match self {
            PagingStrategy::HasNextPage => page.has_next_page.unwrap_or(false),
            PagingStrategy::Total => page.total.is_some_and(|total| offset < total),
            PagingStrategy::LastKey => {
                non_empty(&page.last_key) && page.has_next_page.unwrap_or(true)
            }
            PagingStrategy::Marker => non_empty(&page.next_marker),
        }
    }

    /// Offset-based strategies advance by the full page size, regardless of
    /// how many items the page held.
    fn advances_by_page_size(&self) -> bool {
        matches!(self, PagingStrategy::HasNextPage | PagingStrategy::Total)
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl FromStr for PagingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "has_next_page" => Ok(PagingStrategy::HasNextPage),
            "total" => Ok(PagingStrategy::Total),
            "last_key" => Ok(PagingStrategy::LastKey),
            "marker" => Ok(PagingStrategy::Marker),
            other => Err(Error::InvalidPagingStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for PagingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of a list response.
///
/// Items are read from `DATA` (Transfer), `data` or `items`. Paging fields
/// that a given API does not use are simply `None`; anything else the
/// service returns stays in `extra`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    #[serde(rename = "DATA", alias = "data", alias = "items", default = "Vec::new")]
    pub items: Vec<T>,
    /// `has_next_page` flag
    #[serde(default)]
    pub has_next_page: Option<bool>,
    /// Total number of results available
    #[serde(default)]
    pub total: Option<u64>,
    /// Opaque key of the last result, for last-key paging
    #[serde(default)]
    pub last_key: Option<String>,
    /// Opaque marker of the next page, for marker paging
    #[serde(default)]
    pub next_marker: Option<String>,
    /// Remaining response fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<T> Page<T> {
    /// A page holding `items` and no paging signals.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            has_next_page: None,
            total: None,
            last_key: None,
            next_marker: None,
            extra: Map::new(),
        }
    }

    /// Set the `has_next_page` flag.
    pub fn with_has_next_page(mut self, has_next_page: bool) -> Self {
        self.has_next_page = Some(has_next_page);
        self
    }

    /// Set the running total.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Set the last key.
    pub fn with_last_key(mut self, last_key: impl Into<String>) -> Self {
        self.last_key = Some(last_key.into());
        self
    }

    /// Set the next marker.
    pub fn with_next_marker(mut self, next_marker: impl Into<String>) -> Self {
        self.next_marker = Some(next_marker.into());
        self
    }
}

/// Paging parameters for one page fetch.
///
/// Serializes to the query parameters Globus APIs expect: `limit` always,
/// then `last_key` or `marker` when continuing such a sequence, else
/// `offset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    /// Number of results to request
    pub limit: u64,
    /// Offset of the first result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Marker returned by the previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Last key returned by the previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_key: Option<String>,
}

/// Result-count limits for one paginated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingLimits {
    /// Results the caller wants; `None` means as many as the API allows
    pub num_results: Option<u64>,
    /// Largest page the API serves
    pub max_results_per_call: u64,
    /// Most results the API will page through, if capped
    pub max_total_results: Option<u64>,
    /// Results skipped before the first page. Sent as `offset` only by
    /// offset-based strategies; always counts toward `num_results`.
    pub initial_offset: u64,
}

impl PagingLimits {
    /// Limits with the given page size and no other caps.
    pub fn new(max_results_per_call: u64) -> Self {
        Self {
            num_results: None,
            max_results_per_call,
            max_total_results: None,
            initial_offset: 0,
        }
    }

    /// Set the number of results the caller wants.
    pub fn with_num_results(mut self, num_results: Option<u64>) -> Self {
        self.num_results = num_results;
        self
    }

    /// Set the API's ceiling on total results.
    pub fn with_max_total_results(mut self, max_total_results: u64) -> Self {
        self.max_total_results = Some(max_total_results);
        self
    }

    /// Start paging from a non-zero offset.
    pub fn with_initial_offset(mut self, initial_offset: u64) -> Self {
        self.initial_offset = initial_offset;
        self
    }

    /// Check the limits and return the effective result target.
    fn validate(&self) -> Result<Option<u64>> {
        if self.max_results_per_call == 0 {
            return Err(Error::InvalidInput(
                "max_results_per_call must be positive".to_string(),
            ));
        }
        match (self.num_results, self.max_total_results) {
            (Some(requested), Some(max_total)) if requested > max_total => {
                Err(Error::PaginationOverrun {
                    requested,
                    max_total,
                })
            }
            (Some(requested), _) => Ok(Some(requested)),
            (None, max_total) => Ok(max_total),
        }
    }
}

/// Client-side counters for one pagination session.
#[derive(Debug, Clone)]
pub struct PaginationState {
    offset: u64,
    limit: u64,
    target: Option<u64>,
    max_results_per_call: u64,
    marker: Option<String>,
    last_key: Option<String>,
    more: bool,
    pages_fetched: usize,
}

impl PaginationState {
    fn new(limits: &PagingLimits, target: Option<u64>) -> Self {
        Self {
            offset: limits.initial_offset,
            limit: 0,
            target,
            max_results_per_call: limits.max_results_per_call,
            marker: None,
            last_key: None,
            more: true,
            pages_fetched: 0,
        }
    }

    /// Cumulative offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Page size of the most recent request.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Parameters for the next fetch, or `None` once paging is done.
    fn next_request(&mut self, strategy: PagingStrategy) -> Option<PageRequest> {
        if !self.more {
            return None;
        }

        let mut limit = self.max_results_per_call;
        if let Some(target) = self.target {
            limit = limit.min(target.saturating_sub(self.offset));
        }
        if limit == 0 {
            self.more = false;
            return None;
        }
        self.limit = limit;

        let mut request = PageRequest {
            limit,
            ..Default::default()
        };
        match strategy {
            PagingStrategy::HasNextPage | PagingStrategy::Total => {
                request.offset = Some(self.offset)
            }
            PagingStrategy::LastKey => request.last_key = self.last_key.clone(),
            PagingStrategy::Marker => request.marker = self.marker.clone(),
        }
        Some(request)
    }

    /// Record a fetched page and decide whether another one follows.
    fn advance<T>(&mut self, strategy: PagingStrategy, page: &mut Page<T>) {
        if let Some(target) = self.target {
            let remaining = target.saturating_sub(self.offset);
            page.items.truncate(usize::try_from(remaining).unwrap_or(usize::MAX));
        }

        self.offset += if strategy.advances_by_page_size() {
            self.max_results_per_call
        } else {
            page.items.len() as u64
        };

        match strategy {
            PagingStrategy::LastKey => self.last_key = page.last_key.clone(),
            PagingStrategy::Marker => self.marker = page.next_marker.clone(),
            PagingStrategy::HasNextPage | PagingStrategy::Total => {}
        }

        self.more = strategy.more_available(page, self.offset);
        self.pages_fetched += 1;
    }

    fn finish(&mut self) {
        self.more = false;
    }
}

/// A reusable description of a paginated list operation.
///
/// Every [`start`](Self::start) begins an independent session from the
/// initial offset; nothing is cached between sessions.
pub struct PaginatedCall<T> {
    fetch: FetchPage<T>,
    strategy: PagingStrategy,
    limits: PagingLimits,
}

impl<T: Send + 'static> PaginatedCall<T> {
    /// Wrap a page-fetching operation.
    pub fn new<F>(strategy: PagingStrategy, limits: PagingLimits, fetch: F) -> Self
    where
        F: Fn(PageRequest) -> BoxFuture<'static, Result<Page<T>>> + Send + Sync + 'static,
    {
        Self {
            fetch: Arc::new(fetch),
            strategy,
            limits,
        }
    }

    /// The paging strategy.
    pub fn strategy(&self) -> PagingStrategy {
        self.strategy
    }

    /// The result limits.
    pub fn limits(&self) -> PagingLimits {
        self.limits
    }

    /// Validate limits, fetch the first page and return the item stream.
    ///
    /// Limit violations fail before any fetch is made. Errors from the first
    /// fetch are returned here rather than from the stream.
    pub async fn start(&self) -> Result<PaginatedStream<T>> {
        let target = self.limits.validate()?;
        let mut stream = PaginatedStream {
            fetch: self.fetch.clone(),
            strategy: self.strategy,
            state: PaginationState::new(&self.limits, target),
            buffer: VecDeque::new(),
            pending_fetch: None,
        };

        if let Some(request) = stream.state.next_request(self.strategy) {
            debug!(strategy = %self.strategy, ?request, "fetching first page");
            let page = (stream.fetch)(request).await?;
            stream.accept(page);
        }

        Ok(stream)
    }

    /// Run a full session and collect every item.
    pub async fn collect_all(&self) -> Result<Vec<T>> {
        self.start().await?.try_collect().await
    }
}

impl<T> fmt::Debug for PaginatedCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedCall")
            .field("strategy", &self.strategy)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

/// A stream that yields items page by page.
///
/// The first page was fetched when the stream was created; later pages are
/// fetched as the buffered items run out. A fetch error is yielded once and
/// ends the stream. The stream is single-pass.
pub struct PaginatedStream<T> {
    fetch: FetchPage<T>,
    strategy: PagingStrategy,
    state: PaginationState,
    buffer: VecDeque<T>,
    pending_fetch: Option<BoxFuture<'static, Result<Page<T>>>>,
}

impl<T> PaginatedStream<T> {
    /// Pagination counters for this session.
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    fn accept(&mut self, mut page: Page<T>) {
        self.state.advance(self.strategy, &mut page);
        self.buffer.extend(page.items);
    }
}

impl<T> Stream for PaginatedStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(item) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if let Some(fut) = this.pending_fetch.as_mut() {
                match fut.as_mut().poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.pending_fetch = None;
                        this.accept(page);
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        this.pending_fetch = None;
                        this.state.finish();
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            match this.state.next_request(this.strategy) {
                Some(request) => {
                    debug!(strategy = %this.strategy, ?request, "fetching next page");
                    this.pending_fetch = Some((this.fetch)(request));
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

impl<T> Unpin for PaginatedStream<T> {}

/// Binds the pagination engine to a GET endpoint of a service.
pub(crate) struct PaginatedRequest<T> {
    inner: Arc<ClientInner>,
    service: Service,
    path: String,
    strategy: PagingStrategy,
    limits: PagingLimits,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DeserializeOwned + Send + 'static> PaginatedRequest<T> {
    pub(crate) fn new(
        inner: Arc<ClientInner>,
        service: Service,
        path: impl Into<String>,
        strategy: PagingStrategy,
    ) -> Self {
        Self {
            inner,
            service,
            path: path.into(),
            strategy,
            limits: PagingLimits::new(DEFAULT_MAX_RESULTS_PER_CALL),
            _marker: std::marker::PhantomData,
        }
    }

    pub(crate) fn max_results_per_call(mut self, max: u64) -> Self {
        self.limits.max_results_per_call = max;
        self
    }

    pub(crate) fn max_total_results(mut self, max: u64) -> Self {
        self.limits.max_total_results = Some(max);
        self
    }

    pub(crate) fn num_results(mut self, num_results: Option<u64>) -> Self {
        self.limits.num_results = num_results;
        self
    }

    /// Build the call, merging paging parameters into `query`.
    pub(crate) fn build_with_query<Q>(self, query: Option<Q>) -> PaginatedCall<T>
    where
        Q: Serialize + Clone + Send + Sync + 'static,
    {
        let inner = self.inner;
        let service = self.service;
        let path = self.path;

        PaginatedCall::new(self.strategy, self.limits, move |request: PageRequest| {
            let inner = inner.clone();
            let path = path.clone();
            let query = query.clone();

            Box::pin(async move {
                #[derive(Serialize)]
                struct PagedQuery<Q> {
                    #[serde(flatten)]
                    page: PageRequest,
                    #[serde(flatten)]
                    extra: Option<Q>,
                }

                let paged_query = PagedQuery {
                    page: request,
                    extra: query,
                };

                inner
                    .get_with_query::<Page<T>, _>(service, &path, &paged_query)
                    .await
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(per_call: u64, num_results: Option<u64>) -> PagingLimits {
        PagingLimits::new(per_call).with_num_results(num_results)
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("marker".parse::<PagingStrategy>().unwrap(), PagingStrategy::Marker);
        assert_eq!("last_key".parse::<PagingStrategy>().unwrap(), PagingStrategy::LastKey);
        match "next_token".parse::<PagingStrategy>() {
            Err(Error::InvalidPagingStrategy(name)) => assert_eq!(name, "next_token"),
            other => panic!("expected InvalidPagingStrategy, got {other:?}"),
        }
    }

    #[test]
    fn test_more_available_per_strategy() {
        let page: Page<u8> = Page::new(vec![1]).with_has_next_page(true).with_total(30);
        assert!(PagingStrategy::HasNextPage.more_available(&page, 10));
        assert!(PagingStrategy::Total.more_available(&page, 20));
        assert!(!PagingStrategy::Total.more_available(&page, 30));
        assert!(!PagingStrategy::LastKey.more_available(&page, 0));
        assert!(!PagingStrategy::Marker.more_available(&page, 0));

        let keyed: Page<u8> = Page::new(vec![]).with_last_key("k").with_next_marker("");
        assert!(PagingStrategy::LastKey.more_available(&keyed, 0));
        assert!(!PagingStrategy::Marker.more_available(&keyed, 0));
        assert!(!PagingStrategy::LastKey
            .more_available(&keyed.with_has_next_page(false), 0));
    }

    #[test]
    fn test_overrun_is_rejected() {
        let err = limits(100, Some(1200))
            .with_max_total_results(1000)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PaginationOverrun { requested: 1200, max_total: 1000 }
        ));
    }

    #[test]
    fn test_target_defaults_to_api_ceiling() {
        assert_eq!(limits(100, None).with_max_total_results(1000).validate().unwrap(), Some(1000));
        assert_eq!(limits(100, None).validate().unwrap(), None);
        assert!(matches!(limits(0, None).validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_limit_is_clamped_to_target() {
        let l = limits(10, Some(18));
        let mut state = PaginationState::new(&l, Some(18));

        let first = state.next_request(PagingStrategy::HasNextPage).unwrap();
        assert_eq!((first.offset, first.limit), (Some(0), 10));
        state.advance(PagingStrategy::HasNextPage, &mut Page::new(vec![0u8; 10]).with_has_next_page(true));

        let second = state.next_request(PagingStrategy::HasNextPage).unwrap();
        assert_eq!((second.offset, second.limit), (Some(10), 8));
        state.advance(PagingStrategy::HasNextPage, &mut Page::new(vec![0u8; 8]).with_has_next_page(true));

        assert_eq!(state.offset(), 20);
        assert!(state.next_request(PagingStrategy::HasNextPage).is_none());
    }

    #[test]
    fn test_offset_advances_by_page_size_not_item_count() {
        let l = limits(10, None);
        let mut state = PaginationState::new(&l, None);
        state.next_request(PagingStrategy::Total).unwrap();
        state.advance(PagingStrategy::Total, &mut Page::new(vec![0u8; 4]).with_total(100));
        assert_eq!(state.offset(), 10);
        assert_eq!(state.next_request(PagingStrategy::Total).unwrap().offset, Some(10));
    }

    #[test]
    fn test_marker_requests_never_carry_offset() {
        let l = limits(5, None);
        let mut state = PaginationState::new(&l, None);
        let first = state.next_request(PagingStrategy::Marker).unwrap();
        assert_eq!((first.offset, first.marker), (None, None));
        state.advance(PagingStrategy::Marker, &mut Page::new(vec![1u8, 2, 3]).with_next_marker("m1"));

        let next = state.next_request(PagingStrategy::Marker).unwrap();
        assert_eq!(next.offset, None);
        assert_eq!(next.marker.as_deref(), Some("m1"));
        assert_eq!(state.offset(), 3);
    }

    #[test]
    fn test_page_request_query_shape() {
        let request = PageRequest {
            limit: 100,
            last_key: Some("abc".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, serde_json::json!({"limit": 100, "last_key": "abc"}));
    }

    #[test]
    fn test_page_deserializes_transfer_shape() {
        let page: Page<Value> = serde_json::from_value(serde_json::json!({
            "DATA_TYPE": "task_list",
            "DATA": [{"task_id": "1"}, {"task_id": "2"}],
            "total": 2,
            "offset": 0,
            "limit": 10
        }))
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(2));
        assert_eq!(page.extra.get("DATA_TYPE"), Some(&Value::from("task_list")));
    }
}
