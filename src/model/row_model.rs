//! RowModel - decides when the cache is rebuilt.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheEngine, EngineContext, ListenerRegistry, ModelUpdated, Subscription};
use crate::common::{CacheConfig, CacheOptions, ConfigWarning};
use crate::datasource::{DataSource, FilterModel, SortModel};
use crate::row::{RowEntity, RowIdFn};

/// Presents a remote collection through a [`CacheEngine`].
///
/// The engine is created once per (data source, sort, filter) combination
/// and replaced wholesale whenever one of them changes. Without a data
/// source every query behaves as if there were no rows.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use rowcache::{CacheOptions, InMemoryDataSource, RowData, RowModel};
///
/// let mut model = RowModel::new(&CacheOptions::new().page_size(10), None);
/// assert_eq!(model.row_count(), 0);
///
/// let rows = (0..25).map(|_| RowData::default()).collect();
/// model.set_datasource(Some(Arc::new(InMemoryDataSource::new(rows))));
///
/// // The first page is requested on reset
/// assert!(model.get_row(0).unwrap().is_loaded());
/// ```
pub struct RowModel {
    config: CacheConfig,
    warnings: Vec<ConfigWarning>,
    datasource: Option<Arc<dyn DataSource>>,
    sort_model: SortModel,
    filter_model: FilterModel,
    row_id_fn: Option<RowIdFn>,
    listeners: ListenerRegistry,
    engine: Option<CacheEngine>,
}

impl RowModel {
    /// Resolve `options` once; the snapshot is reused by every engine.
    pub fn new(options: &CacheOptions, grid_row_height: Option<f64>) -> Self {
        let resolved = options.resolve(grid_row_height);
        Self {
            config: resolved.config,
            warnings: resolved.warnings,
            datasource: None,
            sort_model: SortModel::default(),
            filter_model: FilterModel::default(),
            row_id_fn: None,
            listeners: ListenerRegistry::new(),
            engine: None,
        }
    }

    // ========================================================================
    // Inputs that trigger a reset
    // ========================================================================

    /// Replace the data source. Always resets.
    pub fn set_datasource(&mut self, datasource: Option<Arc<dyn DataSource>>) {
        self.datasource = datasource;
        self.reset();
    }

    /// Replace the sort descriptor. Resets only if it changed.
    pub fn set_sort_model(&mut self, sort_model: SortModel) {
        if sort_model != self.sort_model {
            self.sort_model = sort_model;
            self.reset();
        }
    }

    /// Replace the filter descriptor. Resets only if it changed.
    pub fn set_filter_model(&mut self, filter_model: FilterModel) {
        if filter_model != self.filter_model {
            self.filter_model = filter_model;
            self.reset();
        }
    }

    /// Identity for rows whose data source assigns none. Applies from the next reset.
    pub fn set_row_id_fn(&mut self, row_id_fn: Option<RowIdFn>) {
        self.row_id_fn = row_id_fn;
    }

    /// Throw away the current engine and start over.
    ///
    /// Outstanding fetches of the old engine are abandoned; their results are
    /// discarded on arrival. The first page of the new engine is requested
    /// straight away so an empty initial row count can grow.
    pub fn reset(&mut self) {
        if let Some(old) = self.engine.take() {
            old.destroy();
        }

        if let Some(datasource) = &self.datasource {
            let context = EngineContext {
                datasource: Arc::clone(datasource),
                listeners: self.listeners.clone(),
                row_id_fn: self.row_id_fn.clone(),
            };
            let config = self
                .config
                .with_models(self.sort_model.clone(), self.filter_model.clone());
            self.engine = Some(CacheEngine::with_context(config, context));
        }

        debug!(has_datasource = self.engine.is_some(), "row model reset");
        self.listeners.notify(&ModelUpdated::Reset);

        if let Some(engine) = &self.engine {
            engine.get_row(0);
        }
    }

    // ========================================================================
    // Queries, delegated to the current engine
    // ========================================================================

    /// The row at `index`; `None` without a data source.
    pub fn get_row(&self, index: usize) -> Option<RowEntity> {
        self.engine.as_ref().map(|engine| engine.get_row(index))
    }

    pub fn for_each_row<F>(&self, visit: F)
    where
        F: FnMut(&RowEntity, usize),
    {
        if let Some(engine) = &self.engine {
            engine.for_each_row(visit);
        }
    }

    pub fn row_count(&self) -> usize {
        self.engine.as_ref().map_or(0, CacheEngine::row_count)
    }

    pub fn combined_height(&self) -> f64 {
        self.engine.as_ref().map_or(0.0, CacheEngine::combined_height)
    }

    pub fn row_index_at_pixel(&self, pixel: f64) -> Option<usize> {
        self.engine.as_ref()?.row_index_at_pixel(pixel)
    }

    /// Listen for [`ModelUpdated`] events from this model and its engines.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ModelUpdated) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// The engine currently serving rows.
    pub fn engine(&self) -> Option<&CacheEngine> {
        self.engine.as_ref()
    }

    /// Warnings produced while resolving the options.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Destroy the engine and release every subscription.
    pub fn destroy(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.destroy();
        }
        self.datasource = None;
        self.listeners.clear();
    }
}

impl Drop for RowModel {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for RowModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowModel")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("listeners", &self.listeners)
            .finish()
    }
}
