///! Search data controller
///!
///! Owns `(query, page)`, turns it into result pages with derived
///! pagination, and retries failed fetches with linear backoff. Every attempt
///! is tagged with a sequence number; a response is applied only while its
///! tag is still the one in flight, so late answers for an old query or page
///! are dropped.

use dungyzon_common::{PaginationState, SearchError, SearchResultItem};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::pagination::derive_pagination;
use crate::api::{ApiError, SearchApi, SearchPage};

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Automatic retries after the first failed attempt
    pub max_retries: u32,
    /// Retry `n` (1-based) waits `n * retry_base_delay`
    pub retry_base_delay: Duration,
    pub items_per_page: u32,
    /// While false no request is issued
    pub enabled: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            items_per_page: 20,
            enabled: true,
        }
    }
}

/// Read-only view of the controller state
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSnapshot {
    pub query: String,
    pub search_results: Vec<SearchResultItem>,
    pub is_loading: bool,
    pub error: Option<SearchError>,
    pub pagination: PaginationState,
    pub current_page: u32,
    pub retry_count: u32,
    /// A retry timer is armed for the current error
    pub retry_pending: bool,
}

impl SearchSnapshot {
    pub fn total_pages(&self) -> u32 {
        self.pagination.total_pages
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.pagination.total_pages
    }

    pub fn has_active_query(&self) -> bool {
        !self.query.is_empty()
    }

    /// The error is final until `refetch` or a new query/page
    pub fn retries_exhausted(&self) -> bool {
        self.error.is_some() && !self.retry_pending && !self.is_loading
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestTag {
    seq: u64,
    query: String,
    page: u32,
}

struct State {
    query: String,
    current_page: u32,
    results: Vec<SearchResultItem>,
    pagination: PaginationState,
    error: Option<SearchError>,
    is_loading: bool,
    retry_count: u32,
    enabled: bool,
    disposed: bool,
    next_seq: u64,
    in_flight: Option<RequestTag>,
    /// Bumped on every target change; a retry timer only fires for its own epoch
    epoch: u64,
    retry_timer: Option<JoinHandle<()>>,
}

impl State {
    fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            query: self.query.clone(),
            search_results: self.results.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
            pagination: self.pagination,
            current_page: self.current_page,
            retry_count: self.retry_count,
            retry_pending: self.retry_timer.is_some(),
        }
    }

    fn cancel_retry(&mut self) {
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
        self.epoch += 1;
    }

    /// Leaves any pending retry behind and starts a fresh fetch sequence
    fn reset_target(&mut self) {
        self.cancel_retry();
        self.retry_count = 0;
        self.error = None;
    }
}

struct Inner {
    api: Arc<dyn SearchApi>,
    options: ControllerOptions,
    state: Mutex<State>,
    updates: watch::Sender<SearchSnapshot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &State) {
        self.updates.send_replace(state.snapshot());
    }

    /// Issues a request for the current target if the controller may fetch
    fn start_attempt(self: &Arc<Self>, state: &mut State) {
        if state.disposed || !state.enabled || state.query.is_empty() {
            return;
        }

        state.next_seq += 1;
        let tag = RequestTag {
            seq: state.next_seq,
            query: state.query.clone(),
            page: state.current_page,
        };
        tracing::debug!(
            "Fetching '{}' page {} (request #{}, retry {}/{})",
            tag.query,
            tag.page,
            tag.seq,
            state.retry_count,
            self.options.max_retries
        );
        state.in_flight = Some(tag.clone());
        state.is_loading = true;

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = inner.api.search(&tag.query, tag.page).await;
            inner.finish_attempt(tag, outcome);
        });
    }

    fn finish_attempt(self: &Arc<Self>, tag: RequestTag, outcome: Result<SearchPage, ApiError>) {
        let mut state = self.lock();
        if state.in_flight.as_ref() != Some(&tag) {
            tracing::debug!(
                "Discarding stale response for '{}' page {} (request #{})",
                tag.query,
                tag.page,
                tag.seq
            );
            return;
        }
        state.in_flight = None;
        state.is_loading = false;

        match outcome {
            Ok(page) => {
                state.pagination =
                    derive_pagination(tag.page, page.items.len(), page.total, self.options.items_per_page);
                state.results = page.items;
                state.error = None;
                state.retry_count = 0;
                tracing::debug!(
                    "'{}' page {}: {} result(s), {} page(s)",
                    tag.query,
                    tag.page,
                    state.results.len(),
                    state.pagination.total_pages
                );
            }
            Err(e) => {
                state.error = Some(SearchError::from(&e));
                if !state.enabled {
                    tracing::warn!(
                        "Search '{}' page {} failed while disabled: {}",
                        tag.query,
                        tag.page,
                        e
                    );
                } else if state.retry_count < self.options.max_retries {
                    let delay = self.options.retry_base_delay * (state.retry_count + 1);
                    state.retry_count += 1;
                    tracing::warn!(
                        "Search '{}' page {} failed: {}. Retrying in {:?} ({}/{})",
                        tag.query,
                        tag.page,
                        e,
                        delay,
                        state.retry_count,
                        self.options.max_retries
                    );
                    self.schedule_retry(&mut state, delay);
                } else {
                    tracing::error!(
                        "Search '{}' page {} failed after {} retries: {}",
                        tag.query,
                        tag.page,
                        self.options.max_retries,
                        e
                    );
                }
            }
        }

        self.publish(&state);
    }

    fn schedule_retry(self: &Arc<Self>, state: &mut State, delay: Duration) {
        if let Some(previous) = state.retry_timer.take() {
            previous.abort();
        }

        let epoch = state.epoch;
        let inner = Arc::clone(self);
        state.retry_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire_retry(epoch);
        }));
    }

    fn fire_retry(self: &Arc<Self>, epoch: u64) {
        let mut state = self.lock();
        if state.disposed || state.epoch != epoch {
            return;
        }
        state.retry_timer = None;
        self.start_attempt(&mut state);
        self.publish(&state);
    }
}

/// Query/page state machine behind the search view.
///
/// Must be used from within a tokio runtime: fetches and retry timers run as
/// spawned tasks. Dropping the controller disposes it.
pub struct SearchDataController {
    inner: Arc<Inner>,
}

impl SearchDataController {
    /// Creates the controller and, for a non-empty initial query, issues the
    /// first fetch.
    pub fn new(
        api: Arc<dyn SearchApi>,
        initial_query: impl Into<String>,
        initial_page: u32,
        options: ControllerOptions,
    ) -> Self {
        let state = State {
            query: initial_query.into().trim().to_string(),
            current_page: initial_page.max(1),
            results: Vec::new(),
            pagination: PaginationState::empty(options.items_per_page),
            error: None,
            is_loading: false,
            retry_count: 0,
            enabled: options.enabled,
            disposed: false,
            next_seq: 0,
            in_flight: None,
            epoch: 0,
            retry_timer: None,
        };
        let (updates, _) = watch::channel(state.snapshot());
        let inner = Arc::new(Inner {
            api,
            options,
            state: Mutex::new(state),
            updates,
        });

        {
            let mut state = inner.lock();
            inner.start_attempt(&mut state);
            inner.publish(&state);
        }

        Self { inner }
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.inner.options
    }

    /// Sets the search term and restarts at page 1. A blank term clears the
    /// results without issuing a request.
    pub fn set_query(&self, query: &str) {
        let query = query.trim();
        let mut state = self.inner.lock();
        if state.disposed {
            return;
        }

        state.reset_target();
        state.query = query.to_string();
        state.current_page = 1;

        if query.is_empty() {
            tracing::debug!("Search cleared");
            state.results.clear();
            state.pagination = PaginationState::empty(self.inner.options.items_per_page);
            state.in_flight = None;
            state.is_loading = false;
        } else {
            tracing::info!("Searching for '{}'", query);
            self.inner.start_attempt(&mut state);
        }

        self.inner.publish(&state);
    }

    /// Requests another page of the current query. Page 0 is treated as 1.
    pub fn set_current_page(&self, page: u32) {
        let page = if page == 0 {
            tracing::warn!("Page numbers start at 1, clamping page 0");
            1
        } else {
            page
        };

        let mut state = self.inner.lock();
        if state.disposed {
            return;
        }

        state.reset_target();
        state.current_page = page;
        self.inner.start_attempt(&mut state);
        self.inner.publish(&state);
    }

    /// Re-issues the fetch for the current query and page right away.
    pub fn refetch(&self) {
        let mut state = self.inner.lock();
        if state.disposed {
            return;
        }

        state.reset_target();
        self.inner.start_attempt(&mut state);
        self.inner.publish(&state);
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.inner.lock();
        if state.disposed || state.enabled == enabled {
            return;
        }

        state.enabled = enabled;
        if enabled {
            state.retry_count = 0;
            self.inner.start_attempt(&mut state);
        } else {
            state.cancel_retry();
        }
        self.inner.publish(&state);
    }

    /// Cancels the pending retry and ignores every outstanding response.
    pub fn dispose(&self) {
        let mut state = self.inner.lock();
        if state.disposed {
            return;
        }

        state.disposed = true;
        state.cancel_retry();
        state.in_flight = None;
        state.is_loading = false;
        self.inner.publish(&state);
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.inner.lock().snapshot()
    }

    /// Receiver that sees every state change
    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.inner.updates.subscribe()
    }
}

impl Drop for SearchDataController {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::time::{Instant, sleep};

    type Reply = (Duration, Result<SearchPage, ApiError>);
    type Script = Box<dyn Fn(&str, u32, usize) -> Reply + Send + Sync>;

    #[derive(Debug, Clone)]
    struct Call {
        query: String,
        page: u32,
        at: Instant,
    }

    /// SearchApi double: replies are computed from (query, page, call index)
    struct ScriptedApi {
        calls: Mutex<Vec<Call>>,
        script: Script,
    }

    impl ScriptedApi {
        fn new(script: impl Fn(&str, u32, usize) -> Reply + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                script: Box::new(script),
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_for(&self, query: &str) -> usize {
            self.calls().iter().filter(|c| c.query == query).count()
        }
    }

    #[async_trait]
    impl SearchApi for ScriptedApi {
        async fn search(&self, query: &str, page: u32) -> Result<SearchPage, ApiError> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(Call {
                    query: query.to_string(),
                    page,
                    at: Instant::now(),
                });
                calls.len() - 1
            };
            let (delay, reply) = (self.script)(query, page, index);
            if !delay.is_zero() {
                sleep(delay).await;
            }
            reply
        }
    }

    fn items(prefix: &str, count: usize) -> Vec<SearchResultItem> {
        (0..count)
            .map(|i| SearchResultItem::new(json!({ "asin": format!("{}-{}", prefix, i) })))
            .collect()
    }

    fn ok(prefix: &str, count: usize, total: Option<u64>) -> Reply {
        (
            Duration::ZERO,
            Ok(SearchPage {
                items: items(prefix, count),
                total,
            }),
        )
    }

    fn server_error(status: u16) -> Reply {
        (
            Duration::ZERO,
            Err(ApiError::Server {
                status,
                message: "Scraper unavailable".to_string(),
            }),
        )
    }

    fn controller(api: &Arc<ScriptedApi>, query: &str) -> SearchDataController {
        SearchDataController::new(api.clone(), query, 1, ControllerOptions::default())
    }

    async fn settle(secs: u64) {
        sleep(Duration::from_secs(secs)).await;
    }

    fn first_asin(snapshot: &SearchSnapshot) -> Option<String> {
        snapshot.search_results.first().and_then(|i| i.asin()).map(String::from)
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_query_is_fetched() {
        let api = ScriptedApi::new(|q, _, _| ok(q, 20, Some(95)));
        let ctrl = controller(&api, "laptop");
        assert!(ctrl.snapshot().is_loading);

        settle(1).await;

        let snap = ctrl.snapshot();
        assert!(!snap.is_loading);
        assert_eq!(snap.search_results.len(), 20);
        assert_eq!(snap.total_pages(), 5);
        assert!(snap.has_more());
        assert!(snap.error.is_none());
        assert_eq!(api.calls_for("laptop"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_initial_query_issues_no_request() {
        let api = ScriptedApi::new(|q, _, _| ok(q, 20, None));
        let ctrl = controller(&api, "   ");
        settle(1).await;

        let snap = ctrl.snapshot();
        assert!(!snap.has_active_query());
        assert!(!snap.is_loading);
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_query_resets_page_and_retry_count() {
        let api = ScriptedApi::new(|q, page, _| {
            if q == "desk" && page == 3 {
                server_error(500)
            } else {
                ok(q, 20, None)
            }
        });
        let ctrl = controller(&api, "desk");
        settle(1).await;

        ctrl.set_current_page(3);
        sleep(Duration::from_millis(100)).await;
        let snap = ctrl.snapshot();
        assert_eq!(snap.current_page, 3);
        assert_eq!(snap.retry_count, 1);

        ctrl.set_query("chair");
        let snap = ctrl.snapshot();
        assert_eq!(snap.query, "chair");
        assert_eq!(snap.current_page, 1);
        assert_eq!(snap.retry_count, 0);
        assert!(snap.error.is_none());

        settle(10).await;
        let calls = api.calls();
        let last = calls.last().unwrap();
        assert_eq!((last.query.as_str(), last.page), ("chair", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_current_page_fetches_that_page() {
        let api = ScriptedApi::new(|q, page, _| ok(&format!("{}-p{}", q, page), 20, None));
        let ctrl = controller(&api, "mouse");
        settle(1).await;

        ctrl.set_current_page(4);
        settle(1).await;

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!((calls[1].query.as_str(), calls[1].page), ("mouse", 4));

        let snap = ctrl.snapshot();
        assert_eq!(snap.current_page, 4);
        assert_eq!(snap.pagination.page, 4);
        assert_eq!(first_asin(&snap).as_deref(), Some("mouse-p4-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_zero_is_clamped() {
        let api = ScriptedApi::new(|q, _, _| ok(q, 5, None));
        let ctrl = controller(&api, "pen");
        settle(1).await;

        ctrl.set_current_page(0);
        settle(1).await;
        assert_eq!(ctrl.snapshot().current_page, 1);
        assert_eq!(api.calls()[1].page, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_total_drives_page_count() {
        let api = ScriptedApi::new(|q, page, _| ok(q, if page < 5 { 20 } else { 15 }, Some(95)));
        let ctrl = controller(&api, "monitor");
        settle(1).await;

        for page in 1..=5 {
            ctrl.set_current_page(page);
            settle(1).await;
            let snap = ctrl.snapshot();
            assert_eq!(snap.total_pages(), 5);
            assert_eq!(snap.pagination.total, 95);
            assert_eq!(snap.has_more(), page < 5, "page {}", page);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_page_without_total_assumes_more() {
        let api = ScriptedApi::new(|q, _, _| ok(q, 20, None));
        let ctrl = controller(&api, "cable");
        settle(1).await;

        ctrl.set_current_page(11);
        settle(1).await;
        let snap = ctrl.snapshot();
        assert!(snap.has_more());
        assert!(snap.total_pages() >= 12);
        assert_eq!(snap.pagination.total, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_page_without_total_is_last() {
        let api = ScriptedApi::new(|q, _, _| ok(q, 7, None));
        let ctrl = controller(&api, "cable");
        settle(1).await;

        ctrl.set_current_page(3);
        settle(1).await;
        let snap = ctrl.snapshot();
        assert!(!snap.has_more());
        assert_eq!(snap.total_pages(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_back_off_linearly_then_stop() {
        let api = ScriptedApi::new(|_, _, _| server_error(502));
        let ctrl = controller(&api, "gpu");

        settle(60).await;

        let calls = api.calls();
        assert_eq!(calls.len(), 4, "one attempt plus three retries");
        for (n, pair) in calls.windows(2).enumerate() {
            let expected = Duration::from_millis(1000 * (n as u64 + 1));
            let gap = pair[1].at - pair[0].at;
            assert!(
                gap >= expected && gap < expected + Duration::from_millis(20),
                "retry {} waited {:?}, expected {:?}",
                n + 1,
                gap,
                expected
            );
        }

        let snap = ctrl.snapshot();
        assert!(!snap.is_loading);
        assert_eq!(snap.retry_count, 3);
        assert!(snap.retries_exhausted());
        let error = snap.error.unwrap();
        assert_eq!(error.message, "Scraper unavailable");
        assert_eq!(error.code, Some(502));

        settle(600).await;
        assert_eq!(api.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_loading_while_waiting_for_retry() {
        let api = ScriptedApi::new(|_, _, _| server_error(500));
        let ctrl = controller(&api, "tv");
        sleep(Duration::from_millis(500)).await;

        let snap = ctrl.snapshot();
        assert!(!snap.is_loading);
        assert!(snap.error.is_some());
        assert_eq!(snap.retry_count, 1);
        assert!(snap.retry_pending);
        assert!(!snap.retries_exhausted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_change_cancels_pending_retry() {
        let api = ScriptedApi::new(|q, _, _| if q == "old" { server_error(500) } else { ok(q, 3, None) });
        let ctrl = controller(&api, "old");
        sleep(Duration::from_millis(100)).await;
        assert_eq!(ctrl.snapshot().retry_count, 1);

        ctrl.set_query("new");
        settle(30).await;

        assert_eq!(api.calls_for("old"), 1);
        let snap = ctrl.snapshot();
        assert!(snap.error.is_none());
        assert_eq!(first_asin(&snap).as_deref(), Some("new-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_change_cancels_pending_retry() {
        let api = ScriptedApi::new(|q, page, _| if page == 1 { server_error(500) } else { ok(q, 3, None) });
        let ctrl = controller(&api, "fan");
        sleep(Duration::from_millis(100)).await;

        ctrl.set_current_page(2);
        settle(30).await;

        let pages: Vec<u32> = api.calls().iter().map(|c| c.page).collect();
        assert_eq!(pages, vec![1, 2]);
        assert!(ctrl.snapshot().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_query_response_is_discarded() {
        let api = ScriptedApi::new(|q, _, _| {
            let delay = if q == "slow" { Duration::from_secs(5) } else { Duration::from_secs(1) };
            (delay, Ok(SearchPage { items: items(q, 4), total: None }))
        });
        let ctrl = controller(&api, "slow");
        sleep(Duration::from_millis(10)).await;

        ctrl.set_query("fast");
        settle(2).await;
        assert_eq!(first_asin(&ctrl.snapshot()).as_deref(), Some("fast-0"));

        // The first request resolves now, after the second one.
        settle(10).await;
        let snap = ctrl.snapshot();
        assert_eq!(api.calls().len(), 2);
        assert_eq!(first_asin(&snap).as_deref(), Some("fast-0"));
        assert_eq!(snap.query, "fast");
        assert!(!snap.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_failure_sets_no_error_and_no_retry() {
        let api = ScriptedApi::new(|q, _, _| {
            if q == "broken" {
                (
                    Duration::from_secs(5),
                    Err(ApiError::Server {
                        status: 500,
                        message: "Scraper unavailable".to_string(),
                    }),
                )
            } else {
                (Duration::from_secs(1), Ok(SearchPage { items: items(q, 4), total: None }))
            }
        });
        let ctrl = controller(&api, "broken");
        sleep(Duration::from_millis(10)).await;

        ctrl.set_query("working");
        settle(2).await;
        assert_eq!(first_asin(&ctrl.snapshot()).as_deref(), Some("working-0"));

        // The old request fails after the new one has landed.
        settle(30).await;
        let snap = ctrl.snapshot();
        assert!(snap.error.is_none());
        assert_eq!(snap.retry_count, 0);
        assert!(!snap.retry_pending);
        assert_eq!(api.calls_for("broken"), 1);
        assert_eq!(first_asin(&snap).as_deref(), Some("working-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_page_response_is_discarded() {
        let api = ScriptedApi::new(|q, page, _| {
            let delay = Duration::from_secs(if page == 1 { 5 } else { 1 });
            (delay, Ok(SearchPage { items: items(&format!("{}-p{}", q, page), 20), total: Some(60) }))
        });
        let ctrl = controller(&api, "router");
        sleep(Duration::from_millis(10)).await;

        ctrl.set_current_page(2);
        settle(10).await;

        let snap = ctrl.snapshot();
        assert_eq!(snap.current_page, 2);
        assert_eq!(snap.pagination.page, 2);
        assert_eq!(first_asin(&snap).as_deref(), Some("router-p2-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_refetch_ends_with_last_response() {
        let api = ScriptedApi::new(|_, _, index| ok(&format!("v{}", index), 2, None));
        let ctrl = controller(&api, "ssd");
        settle(1).await;

        ctrl.refetch();
        ctrl.refetch();
        settle(1).await;

        assert_eq!(api.calls().len(), 3);
        let snap = ctrl.snapshot();
        assert_eq!(first_asin(&snap).as_deref(), Some("v2-0"));
        assert!(!snap.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_recovers_from_exhausted_retries() {
        let api = ScriptedApi::new(|q, _, index| if index < 4 { server_error(503) } else { ok(q, 2, None) });
        let ctrl = controller(&api, "hdd");
        settle(60).await;
        assert_eq!(ctrl.snapshot().retry_count, 3);

        ctrl.refetch();
        let snap = ctrl.snapshot();
        assert!(snap.error.is_none());
        assert_eq!(snap.retry_count, 0);
        assert!(snap.is_loading);

        settle(1).await;
        let snap = ctrl.snapshot();
        assert_eq!(api.calls().len(), 5);
        assert_eq!(snap.search_results.len(), 2);
        assert!(snap.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_results() {
        let api = ScriptedApi::new(|q, page, _| if page == 2 { server_error(500) } else { ok(q, 20, None) });
        let ctrl = controller(&api, "bag");
        settle(1).await;

        ctrl.set_current_page(2);
        sleep(Duration::from_millis(100)).await;
        let snap = ctrl.snapshot();
        assert_eq!(snap.search_results.len(), 20);
        assert!(snap.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_clears_results() {
        let api = ScriptedApi::new(|q, _, _| ok(q, 20, Some(40)));
        let ctrl = controller(&api, "lamp");
        settle(1).await;
        ctrl.set_current_page(2);
        settle(1).await;

        ctrl.set_query("  ");
        settle(1).await;

        let snap = ctrl.snapshot();
        assert!(snap.search_results.is_empty());
        assert_eq!(snap.pagination, PaginationState::empty(20));
        assert_eq!(snap.current_page, 1);
        assert!(!snap.has_more());
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_controller_does_not_fetch() {
        let api = ScriptedApi::new(|q, _, _| ok(q, 1, None));
        let options = ControllerOptions {
            enabled: false,
            ..Default::default()
        };
        let ctrl = SearchDataController::new(api.clone(), "kettle", 1, options);
        ctrl.set_query("toaster");
        settle(1).await;
        assert!(api.calls().is_empty());

        ctrl.set_enabled(true);
        settle(1).await;
        assert_eq!(api.calls_for("toaster"), 1);
        assert_eq!(ctrl.snapshot().search_results.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_cancels_pending_retry() {
        let api = ScriptedApi::new(|_, _, _| server_error(500));
        let ctrl = controller(&api, "oven");
        sleep(Duration::from_millis(100)).await;

        ctrl.set_enabled(false);
        settle(30).await;
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_while_disabled_schedules_no_retry() {
        let api = ScriptedApi::new(|_, _, _| {
            (
                Duration::from_secs(2),
                Err(ApiError::Server {
                    status: 503,
                    message: "Scraper unavailable".to_string(),
                }),
            )
        });
        let ctrl = controller(&api, "grill");
        sleep(Duration::from_millis(100)).await;

        ctrl.set_enabled(false);
        settle(30).await;

        let snap = ctrl.snapshot();
        assert_eq!(api.calls().len(), 1);
        assert_eq!(snap.error.as_ref().and_then(|e| e.code), Some(503));
        assert_eq!(snap.retry_count, 0);
        assert!(!snap.retry_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_retry_and_ignores_in_flight() {
        let api = ScriptedApi::new(|q, _, _| {
            if q == "fail" {
                server_error(500)
            } else {
                (Duration::from_secs(3), Ok(SearchPage { items: items(q, 5), total: None }))
            }
        });

        let failing = controller(&api, "fail");
        sleep(Duration::from_millis(100)).await;
        failing.dispose();
        settle(30).await;
        assert_eq!(api.calls_for("fail"), 1);

        let slow = controller(&api, "slow");
        sleep(Duration::from_millis(100)).await;
        slow.dispose();
        settle(10).await;
        let snap = slow.snapshot();
        assert!(snap.search_results.is_empty());
        assert!(!snap.is_loading);

        slow.set_query("ignored");
        settle(10).await;
        assert_eq!(api.calls_for("ignored"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_retry() {
        let api = ScriptedApi::new(|_, _, _| server_error(500));
        let ctrl = controller(&api, "drop");
        sleep(Duration::from_millis(100)).await;
        drop(ctrl);

        settle(30).await;
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_flag_spans_the_attempt() {
        let api = ScriptedApi::new(|q, _, _| (Duration::from_secs(5), Ok(SearchPage { items: items(q, 1), total: None })));
        let ctrl = controller(&api, "speaker");

        sleep(Duration::from_secs(1)).await;
        assert!(ctrl.snapshot().is_loading);

        settle(5).await;
        assert!(!ctrl.snapshot().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_results() {
        let api = ScriptedApi::new(|q, _, _| ok(q, 3, Some(3)));
        let ctrl = controller(&api, "");
        let mut updates = ctrl.subscribe();

        ctrl.set_query("phone case");
        let snap = updates
            .wait_for(|s| !s.is_loading && !s.search_results.is_empty())
            .await
            .unwrap()
            .clone();

        assert_eq!(snap.query, "phone case");
        assert_eq!(snap.total_pages(), 1);
        assert!(!snap.has_more());
    }
}
