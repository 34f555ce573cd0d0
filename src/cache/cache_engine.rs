//! Cache Engine - the page-based row cache.
//!
//! The [`CacheEngine`] provides:
//! - Lazy, page-at-a-time loading through a [`DataSource`]
//! - A ceiling on concurrent requests, with deferred pages picked up later
//! - Least-recently-used eviction of loaded pages
//! - Row count estimation for data of unknown length

use std::cmp;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::cache::listener::{ListenerRegistry, ModelUpdated};
use crate::cache::page::{Page, PageState};
use crate::cache::replacer::LruReplacer;
use crate::cache::CacheStats;
use crate::common::{CacheConfig, PageNumber, SequenceCounter};
use crate::datasource::callback::Outcome;
use crate::datasource::{Completion, DataSource, LoadCallback, RowRequest};
use crate::row::{RowData, RowEntity, RowIdFn, RowStatus};

/// Collaborators handed to an engine at construction.
#[derive(Clone)]
pub struct EngineContext {
    pub datasource: Arc<dyn DataSource>,
    pub listeners: ListenerRegistry,
    pub row_id_fn: Option<RowIdFn>,
}

impl EngineContext {
    pub fn new(datasource: Arc<dyn DataSource>) -> Self {
        Self {
            datasource,
            listeners: ListenerRegistry::new(),
            row_id_fn: None,
        }
    }
}

/// Caches pages of a remote row collection.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                         CacheEngine                          │
/// │  ┌───────────────────┐   ┌────────────────────────────────┐  │
/// │  │ pages             │   │ Page0 [Loaded]  Page2 [Loading]│  │
/// │  │ PageNumber → Page │──▶│ Page5 [NotLoaded] Page7 [Failed]│ │
/// │  └───────────────────┘   └────────────────────────────────┘  │
/// │  ┌──────────────┐  ┌────────────────┐  ┌──────────────────┐  │
/// │  │ LruReplacer  │  │ active_requests│  │ row_count (+final)│ │
/// │  └──────────────┘  └────────────────┘  └──────────────────┘  │
/// └───────────────────────────┬──────────────────────────────────┘
///                             │ RowRequest + LoadCallback
///                             ▼
///                        DataSource
/// ```
///
/// # Locking
/// All mutable state sits behind one `Mutex`. The data source and the
/// listeners are only ever called with the lock released, so a data source
/// may complete synchronously from inside `request_rows`, and listeners may
/// read rows.
///
/// # Usage
/// ```ignore
/// let engine = CacheEngine::new(CacheOptions::new().page_size(100).build(), source);
///
/// let row = engine.get_row(250);   // placeholder; page 2 is now loading
/// // ... data source completes ...
/// let row = engine.get_row(250);   // loaded
/// ```
pub struct CacheEngine {
    shared: Arc<EngineShared>,
}

pub(crate) struct EngineShared {
    config: CacheConfig,
    context: EngineContext,
    state: Mutex<EngineState>,
    stats: CacheStats,
}

struct EngineState {
    /// Every live page, whatever its state.
    pages: HashMap<PageNumber, Page>,

    /// Tracks every page; only loaded pages are evictable.
    replacer: LruReplacer,

    /// Current estimate of the total number of rows.
    row_count: usize,

    /// The end of the data is known; `row_count` no longer grows.
    row_count_final: bool,

    /// Fetches handed to the data source and not yet completed.
    active_requests: usize,

    /// A completion is filling free slots from deferred pages.
    draining: bool,

    destroyed: bool,
}

/// A fetch decided under the lock, issued after it is released.
struct Dispatch {
    request: RowRequest,
    callback: LoadCallback,
}

impl CacheEngine {
    /// Create an engine with a private listener registry.
    pub fn new(config: CacheConfig, datasource: Arc<dyn DataSource>) -> Self {
        Self::with_context(config, EngineContext::new(datasource))
    }

    /// Create an engine wired to the given collaborators.
    pub fn with_context(config: CacheConfig, context: EngineContext) -> Self {
        info!(
            page_size = config.page_size(),
            max_concurrent_requests = config.max_concurrent_requests(),
            max_pages_in_cache = ?config.max_pages_in_cache(),
            initial_row_count = config.initial_row_count(),
            "creating row cache"
        );

        let state = EngineState {
            pages: HashMap::new(),
            replacer: LruReplacer::new(),
            row_count: config.initial_row_count(),
            row_count_final: false,
            active_requests: 0,
            draining: false,
            destroyed: false,
        };

        Self {
            shared: Arc::new(EngineShared {
                config,
                context,
                state: Mutex::new(state),
                stats: CacheStats::new(),
            }),
        }
    }

    // ========================================================================
    // Public API: Row access
    // ========================================================================

    /// The row at `index`, or a placeholder if it is not available.
    ///
    /// Creates the owning page if needed and schedules its fetch when it has
    /// not been requested yet. Every call counts as an access for eviction.
    /// Indices at or past a final row count yield an
    /// [`RowStatus::OutOfRange`] placeholder without fetching.
    pub fn get_row(&self, index: usize) -> RowEntity {
        let shared = &self.shared;
        let page_size = shared.config.page_size();
        let row_height = shared.config.row_height();

        let (row, dispatch) = {
            let mut guard = shared.state.lock();
            let state = &mut *guard;

            if state.destroyed || (state.row_count_final && index >= state.row_count) {
                CacheStats::bump(&shared.stats.misses);
                return RowEntity::placeholder(index, row_height, RowStatus::OutOfRange);
            }

            let number = PageNumber::containing(index, page_size);
            let page = state
                .pages
                .entry(number)
                .or_insert_with(|| Page::new(number, page_size));
            let stamp = page.touch();
            let row = page.row(index, row_height);
            let needs_fetch = *page.state() == PageState::NotLoaded;
            state.replacer.record_access(number, stamp);

            let dispatch = if needs_fetch {
                shared.try_schedule(state, number)
            } else {
                None
            };
            (row, dispatch)
        };

        // A synchronous data source may already have filled the page.
        let row = match dispatch {
            Some(dispatch) => {
                shared.dispatch(dispatch);
                self.peek_row(index).unwrap_or(row)
            }
            None => row,
        };

        if row.is_loaded() {
            trace!(index, "row cache hit");
            CacheStats::bump(&shared.stats.hits);
        } else {
            CacheStats::bump(&shared.stats.misses);
        }
        row
    }

    /// The row at `index` if its page is live, without fetching or touching.
    fn peek_row(&self, index: usize) -> Option<RowEntity> {
        let page_size = self.shared.config.page_size();
        let row_height = self.shared.config.row_height();
        let state = self.shared.state.lock();
        if state.destroyed || (state.row_count_final && index >= state.row_count) {
            return Some(RowEntity::placeholder(index, row_height, RowStatus::OutOfRange));
        }
        state
            .pages
            .get(&PageNumber::containing(index, page_size))
            .map(|page| page.row(index, row_height))
    }

    /// Visit every row index below the current row count, in order.
    ///
    /// Rows that are not loaded are visited as placeholders. Iteration never
    /// fetches and does not count as access.
    pub fn for_each_row<F>(&self, mut visit: F)
    where
        F: FnMut(&RowEntity, usize),
    {
        let page_size = self.shared.config.page_size();
        let row_height = self.shared.config.row_height();
        let count = self.row_count();

        let mut index = 0;
        while index < count {
            let number = PageNumber::containing(index, page_size);
            let chunk_end = cmp::min(number.end_row(page_size).saturating_add(1), count);

            // Copy one page worth of rows so `visit` runs without the lock.
            let rows: Vec<RowEntity> = {
                let state = self.shared.state.lock();
                if state.destroyed {
                    return;
                }
                match state.pages.get(&number) {
                    Some(page) => (index..chunk_end).map(|i| page.row(i, row_height)).collect(),
                    None => (index..chunk_end)
                        .map(|i| RowEntity::placeholder(i, row_height, RowStatus::Pending))
                        .collect(),
                }
            };

            for row in &rows {
                visit(row, row.index());
            }
            index = chunk_end;
        }
    }

    /// Whether the row at `index` is loaded. Does not fetch or touch.
    pub fn is_row_loaded(&self, index: usize) -> bool {
        self.peek_row(index).is_some_and(|row| row.is_loaded())
    }

    // ========================================================================
    // Public API: Geometry
    // ========================================================================

    /// Current row count estimate (0 once destroyed).
    pub fn row_count(&self) -> usize {
        let state = self.shared.state.lock();
        if state.destroyed {
            0
        } else {
            state.row_count
        }
    }

    /// Whether the end of the data has been seen.
    pub fn is_row_count_final(&self) -> bool {
        self.shared.state.lock().row_count_final
    }

    /// Replace the row count estimate, e.g. when the application knows it.
    ///
    /// With `is_final` the count stops growing as pages load.
    pub fn set_row_count(&self, row_count: usize, is_final: bool) {
        {
            let mut state = self.shared.state.lock();
            if state.destroyed {
                return;
            }
            state.row_count = row_count;
            state.row_count_final = is_final;
        }
        debug!(row_count, is_final, "row count set");
        self.shared
            .context
            .listeners
            .notify(&ModelUpdated::RowCountChanged);
    }

    /// Total height of all rows.
    pub fn combined_height(&self) -> f64 {
        self.row_count() as f64 * self.shared.config.row_height()
    }

    /// The row under vertical offset `pixel`, clamped to the known rows.
    ///
    /// Returns `None` when there are no rows.
    pub fn row_index_at_pixel(&self, pixel: f64) -> Option<usize> {
        let count = self.row_count();
        if count == 0 {
            return None;
        }
        let index = if pixel.is_nan() || pixel <= 0.0 {
            0
        } else {
            // Saturating cast: very large offsets clamp below.
            (pixel / self.shared.config.row_height()).floor() as usize
        };
        Some(cmp::min(index, count - 1))
    }

    // ========================================================================
    // Public API: Lifecycle
    // ========================================================================

    /// Discard every page and make outstanding completions inert.
    ///
    /// Idempotent. Also runs on drop.
    pub fn destroy(&self) {
        let pages = {
            let mut state = self.shared.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.active_requests = 0;
            state.replacer.clear();
            std::mem::take(&mut state.pages)
        };
        info!(pages = pages.len(), "row cache destroyed");
        drop(pages);
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.state.lock().destroyed
    }

    // ========================================================================
    // Public API: Introspection
    // ========================================================================

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> &CacheStats {
        &self.shared.stats
    }

    /// Registry that receives this engine's [`ModelUpdated`] events.
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.shared.context.listeners
    }

    /// Fetches currently in flight.
    pub fn active_requests(&self) -> usize {
        self.shared.state.lock().active_requests
    }

    /// Number of live pages in any state.
    pub fn page_count(&self) -> usize {
        self.shared.state.lock().pages.len()
    }

    /// Number of loaded pages.
    pub fn loaded_page_count(&self) -> usize {
        self.shared.state.lock().replacer.size()
    }

    /// State of every live page, ordered by page number.
    pub fn page_states(&self) -> BTreeMap<PageNumber, PageState> {
        let state = self.shared.state.lock();
        state
            .pages
            .iter()
            .map(|(&number, page)| (number, page.state().clone()))
            .collect()
    }
}

impl Drop for CacheEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("CacheEngine")
            .field("pages", &state.pages.len())
            .field("row_count", &state.row_count)
            .field("row_count_final", &state.row_count_final)
            .field("active_requests", &state.active_requests)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

// ============================================================================
// Internal: Scheduling and completion
// ============================================================================

impl EngineShared {
    /// Move a NotLoaded page to Loading if a request slot is free.
    fn try_schedule(self: &Arc<Self>, state: &mut EngineState, number: PageNumber) -> Option<Dispatch> {
        if state.active_requests >= self.config.max_concurrent_requests() {
            debug!(%number, active = state.active_requests, "fetch deferred");
            CacheStats::bump(&self.stats.deferred);
            return None;
        }

        let page = state.pages.get_mut(&number)?;
        let token = SequenceCounter::global().next();
        if !page.begin_load(token) {
            return None;
        }
        state.active_requests += 1;
        CacheStats::bump(&self.stats.fetches);

        Some(Dispatch {
            request: RowRequest {
                start_row: page.start_row(),
                end_row: page.end_row(),
                sort_model: self.config.sort_model().clone(),
                filter_model: self.config.filter_model().clone(),
            },
            callback: LoadCallback::new(Arc::downgrade(self), number, token),
        })
    }

    /// Schedule deferred pages, most recently accessed first, while slots last.
    fn schedule_deferred(self: &Arc<Self>, state: &mut EngineState) -> Vec<Dispatch> {
        let page_size = self.config.page_size();
        let mut waiting: Vec<(u64, PageNumber)> = state
            .pages
            .values()
            .filter(|page| *page.state() == PageState::NotLoaded)
            .map(|page| (page.last_accessed(), page.number()))
            .collect();
        waiting.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut dispatches = Vec::new();
        for (_, number) in waiting {
            if state.row_count_final && number.start_row(page_size) >= state.row_count {
                // Past the end of the data; nothing to fetch.
                state.pages.remove(&number);
                state.replacer.remove(number);
                continue;
            }
            if state.active_requests >= self.config.max_concurrent_requests() {
                break;
            }
            if let Some(dispatch) = self.try_schedule(state, number) {
                dispatches.push(dispatch);
            }
        }
        dispatches
    }

    fn dispatch(&self, dispatch: Dispatch) {
        debug!(
            page = %dispatch.callback.page(),
            start_row = dispatch.request.start_row,
            end_row = dispatch.request.end_row,
            "requesting rows"
        );
        self.context
            .datasource
            .request_rows(dispatch.request, dispatch.callback);
    }

    /// Apply the result of a fetch. Called through [`LoadCallback`].
    pub(crate) fn complete(self: &Arc<Self>, number: PageNumber, token: u64, outcome: Outcome) -> Completion {
        let (event, drive) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            let current = !state.destroyed
                && state
                    .pages
                    .get(&number)
                    .is_some_and(|page| page.is_awaiting(token));
            if !current {
                debug!(%number, "discarding stale completion");
                CacheStats::bump(&self.stats.stale_completions);
                return Completion::Stale;
            }

            state.active_requests -= 1;

            let event = match outcome {
                Outcome::Rows { rows, last_row } => {
                    self.apply_rows(state, number, rows, last_row);
                    ModelUpdated::PageLoaded(number)
                }
                Outcome::Failed(error) => {
                    warn!(%number, %error, "page failed to load");
                    if let Some(page) = state.pages.get_mut(&number) {
                        page.fail(error.to_string());
                    }
                    CacheStats::bump(&self.stats.pages_failed);
                    ModelUpdated::PageFailed(number)
                }
            };

            // Only one completion drives the deferred queue at a time. Others,
            // including synchronous ones from inside `request_rows`, leave
            // their freed slot to the driver.
            let drive = !state.draining;
            state.draining = true;
            (event, drive)
        };

        self.context.listeners.notify(&event);
        if drive {
            self.drain_deferred();
        }
        Completion::Applied
    }

    /// Dispatch deferred pages until no slot or no waiting page remains.
    fn drain_deferred(self: &Arc<Self>) {
        loop {
            let dispatches = {
                let mut guard = self.state.lock();
                let state = &mut *guard;
                let dispatches = if state.destroyed {
                    Vec::new()
                } else {
                    self.schedule_deferred(state)
                };
                if dispatches.is_empty() {
                    state.draining = false;
                    return;
                }
                dispatches
            };

            for dispatch in dispatches {
                self.dispatch(dispatch);
            }
        }
    }

    fn apply_rows(
        &self,
        state: &mut EngineState,
        number: PageNumber,
        mut rows: Vec<RowData>,
        last_row: Option<usize>,
    ) {
        let row_height = self.config.row_height();

        let Some(page) = state.pages.get_mut(&number) else {
            return;
        };
        let capacity = page.capacity();
        if rows.len() > capacity {
            warn!(%number, returned = rows.len(), capacity, "data source returned too many rows, truncating");
            rows.truncate(capacity);
        }
        let returned = rows.len();
        let start_row = page.start_row();
        let end_row = page.end_row();
        let entities = rows
            .into_iter()
            .enumerate()
            .map(|(offset, data)| {
                RowEntity::loaded(start_row + offset, data, row_height, self.context.row_id_fn.as_ref())
            })
            .collect();
        page.complete(entities);
        CacheStats::bump(&self.stats.pages_loaded);
        debug!(%number, returned, "page loaded");

        state.update_row_count(start_row, end_row, returned, last_row, &self.config);

        // Make room before the new page becomes evictable, so it is never its own victim.
        if let Some(max_pages) = self.config.max_pages_in_cache() {
            while state.replacer.size() >= max_pages {
                let Some(victim) = state.replacer.evict() else {
                    break;
                };
                state.pages.remove(&victim);
                CacheStats::bump(&self.stats.evictions);
                debug!(page = %victim, "page evicted");
            }
        }
        state.replacer.set_evictable(number, true);
    }
}

impl EngineState {
    fn update_row_count(
        &mut self,
        start_row: usize,
        end_row: usize,
        returned: usize,
        last_row: Option<usize>,
        config: &CacheConfig,
    ) {
        if self.row_count_final {
            return;
        }

        if let Some(last_row) = last_row {
            self.row_count = last_row;
            self.row_count_final = true;
        } else if returned < config.page_size() {
            self.row_count = start_row.saturating_add(returned);
            self.row_count_final = true;
        } else {
            let estimate = end_row.saturating_add(1).saturating_add(config.overflow_size());
            self.row_count = cmp::max(self.row_count, estimate);
        }

        if self.row_count_final {
            debug!(row_count = self.row_count, "end of data reached");
        }
    }
}
