//! Generic entity picker.
//!
//! [`EntityPicker`] wires the pieces together for one input box:
//! - [`SelectionMachine`] turns key/focus/pointer events into effects
//! - [`SearchOrchestrator`] turns terms into displayed items
//! - [`RecentItemsStore`] remembers committed ids
//! - [`VirtualizationPolicy`] picks the render mode for the list
//!
//! The customer, supplier and location pickers are all this type with a
//! different entity, data source and config.

pub mod listeners;
pub mod machine;
pub mod virtualization;

pub use listeners::{ListenerGuard, ListenerSet, PickerListeners, SelectionChange};
pub use machine::{Effect, PickerEvent, SelectionMachine};
pub use virtualization::{RenderMode, RenderPlan, VirtualizationPolicy};

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::PickerConfig;
use crate::core::{DataSource, Entity, RelevanceFilter, SearchResult};
use crate::error::PickerResult;
use crate::services::{
    OrchestratorOptions, PerfTracker, RecentItemsStore, SearchFailure, SearchOrchestrator,
    SharedCache,
};

/// Everything the presentation layer needs to draw the picker.
#[derive(Debug, Clone)]
pub struct PickerView<E> {
    pub is_open: bool,
    pub highlighted: Option<usize>,
    pub items: Arc<[E]>,
    /// Text for the input box: the term being typed, else the selection.
    pub input_value: String,
    pub selected: Option<E>,
    pub authoritative: bool,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub error: Option<SearchFailure>,
    pub total: usize,
    pub plan: RenderPlan,
}

impl<E> PickerView<E> {
    /// Whether the view should offer a manual retry action.
    ///
    /// Offered as soon as an attempt failed; retrying while a backoff is
    /// pending skips the rest of the wait.
    pub fn can_retry(&self) -> bool {
        self.error.is_some()
    }
}

pub struct EntityPicker<E: Entity> {
    machine: SelectionMachine<E>,
    search: SearchOrchestrator<E>,
    recent: Option<Arc<RecentItemsStore>>,
    policy: VirtualizationPolicy,
    extra_fields_shown: usize,
    listeners: PickerListeners<E>,
    perf: PerfTracker,
}

impl<E: Entity> EntityPicker<E> {
    pub fn new(search: SearchOrchestrator<E>, config: &PickerConfig) -> Self {
        Self {
            machine: SelectionMachine::new(),
            search,
            recent: None,
            policy: config.virtualization.policy(),
            extra_fields_shown: config.virtualization.optional_fields.len(),
            listeners: PickerListeners::default(),
            perf: PerfTracker::new("picker"),
        }
    }

    /// Picker sharing the process-wide cache for `E`, and the process-wide
    /// recent list for its storage key when enabled.
    ///
    /// The recent list is persisted to the configured file (the default data
    /// file unless set), or kept in memory when there is no data directory.
    pub fn from_config(source: Arc<dyn DataSource<E>>, config: &PickerConfig) -> Self {
        let mut picker = Self::with_cache(source, SharedCache::global(), config);

        if config.recent.enabled {
            let path = config.recent.path();
            if path.is_none() {
                tracing::debug!("no data directory, keeping recent selections in memory");
            }
            picker.recent = Some(RecentItemsStore::shared(
                path.as_deref(),
                config.recent.key_or(E::RECENT_KEY),
                config.recent.limit,
            ));
        }
        picker
    }

    /// Picker over an explicit cache, without a recent list.
    pub fn with_cache(
        source: Arc<dyn DataSource<E>>,
        cache: SharedCache<E>,
        config: &PickerConfig,
    ) -> Self {
        let filter = RelevanceFilter::new(config.search.search_fields.clone())
            .with_predicates(config.search.predicates.clone());
        let search =
            SearchOrchestrator::new(source, cache, filter, OrchestratorOptions::from_config(config));
        Self::new(search, config)
    }

    pub fn with_recent(mut self, recent: Arc<RecentItemsStore>) -> Self {
        self.recent = Some(recent);
        self
    }

    pub fn orchestrator(&self) -> &SearchOrchestrator<E> {
        &self.search
    }

    /// Issue the initial query for the empty term.
    pub fn start(&self) {
        self.search.start();
    }

    /// Preset the selection shown when no term is typed.
    pub fn set_value(&mut self, value: Option<E>) {
        self.machine.set_value(value);
    }

    pub fn selected(&self) -> Option<&E> {
        self.machine.selected()
    }

    pub fn handle(&mut self, event: PickerEvent) {
        let displayed = self.search.snapshot().items;
        let effects = self.machine.handle(event, &displayed);

        for effect in effects {
            match effect {
                Effect::Search(term) => {
                    if !term.trim().is_empty() {
                        self.perf.start_timer("search");
                    }
                    self.search.search(&term);
                }
                Effect::Commit(entity) => self.commit(entity),
                Effect::Cleared => {
                    tracing::debug!("selection cleared");
                    self.listeners.change.emit(&SelectionChange {
                        id: String::new(),
                        entity: None,
                    });
                    self.listeners.clear.emit(&());
                }
                Effect::Focused => self.listeners.focus.emit(&()),
                Effect::Blurred => self.listeners.blur.emit(&()),
            }
        }
    }

    fn commit(&mut self, entity: E) {
        self.perf.start_timer("selection");
        let id = entity.id().to_string();
        tracing::debug!(id = %id, name = entity.display_name(), "selection committed");

        if let Some(recent) = &self.recent {
            recent.add(&id);
        }
        self.listeners.change.emit(&SelectionChange {
            id: id.clone(),
            entity: Some(entity),
        });
        self.perf.end_timer("selection", Some(id));
    }

    /// Current view. Also re-clamps the highlight to the displayed list.
    pub fn view(&mut self) -> PickerView<E> {
        let snapshot = self.search.snapshot();
        self.machine.clamp(snapshot.items.len());

        if snapshot.authoritative && self.perf.is_timing("search") {
            let detail = format!("{} results for {:?}", snapshot.items.len(), snapshot.raw_term);
            self.perf.end_timer("search", Some(detail));
        }

        let input_value = if !self.machine.raw_term().is_empty() {
            self.machine.raw_term().to_string()
        } else {
            self.machine
                .selected()
                .map(|e| e.display_name().to_string())
                .unwrap_or_default()
        };

        PickerView {
            is_open: self.machine.is_open(),
            highlighted: self.machine.highlighted(),
            plan: self.policy.plan(snapshot.items.len(), self.extra_fields_shown),
            items: snapshot.items,
            input_value,
            selected: self.machine.selected().cloned(),
            authoritative: snapshot.authoritative,
            is_loading: snapshot.is_loading,
            is_refreshing: snapshot.is_refreshing,
            error: snapshot.error,
            total: snapshot.total,
        }
    }

    /// Manual retry: refetch the current term right away.
    pub async fn refetch(&self) -> PickerResult<Arc<SearchResult<E>>> {
        self.search.refetch().await
    }

    /// Recently committed ids, most recent first.
    pub fn recent_ids(&self) -> Vec<String> {
        self.recent.as_ref().map(|r| r.list()).unwrap_or_default()
    }

    /// Recently committed entities found in the displayed list.
    pub fn recent_items(&self) -> Vec<E> {
        let items = self.search.snapshot().items;
        self.recent_ids()
            .iter()
            .filter_map(|id| items.iter().find(|e| e.id() == id).cloned())
            .collect()
    }

    /// Notified on every state change worth redrawing for.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.search.subscribe()
    }

    pub fn perf(&self) -> &PerfTracker {
        &self.perf
    }

    pub fn on_change<F>(&self, callback: F) -> ListenerGuard
    where
        F: Fn(&str, Option<&E>) + Send + Sync + 'static,
    {
        self.listeners
            .change
            .add(move |change: &SelectionChange<E>| callback(&change.id, change.entity.as_ref()))
    }

    pub fn on_clear<F>(&self, callback: F) -> ListenerGuard
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.clear.add(move |_| callback())
    }

    pub fn on_focus<F>(&self, callback: F) -> ListenerGuard
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.focus.add(move |_| callback())
    }

    pub fn on_blur<F>(&self, callback: F) -> ListenerGuard
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.blur.add(move |_| callback())
    }
}
