//! Picker core - async search-and-select for entity comboboxes.
//!
//! A picker is a text box with a dropdown: typing narrows a server-backed
//! list, arrow keys move a highlight, Enter (or a click) commits an entity.
//! This crate is everything behind the box and none of the drawing.
//!
//! # Architecture
//!
//! - [`core`] - Entity trait, query/result types, relevance filtering
//! - [`services`] - Cache, search orchestration, retry, recent list, storage
//! - [`picker`] - Selection state machine, listeners, virtualization, and
//!   the [`EntityPicker`] that ties them together
//! - [`entities`] - Customer, supplier and location records
//! - [`config`] - TOML configuration
//!
//! # Example
//!
//! ```ignore
//! use picker_core::{Customer, EntityPicker, PickerConfig, PickerEvent};
//!
//! let config = PickerConfig::load();
//! let mut picker = EntityPicker::<Customer>::from_config(api.customers(), &config);
//! let _guard = picker.on_change(|id, customer| println!("selected {id}: {customer:?}"));
//!
//! picker.start();
//! picker.handle(PickerEvent::Type("acme".into()));
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod picker;
pub mod services;

mod error;

pub use config::PickerConfig;
pub use crate::core::{DataSource, Entity, FilterSet, Page, Predicate, RelevanceFilter, SearchQuery, SearchResult, Tier};
pub use entities::{Customer, Location, LocationType, Supplier};
pub use error::{FetchError, PickerError, PickerResult, StorageError};
pub use picker::{EntityPicker, ListenerGuard, PickerEvent, PickerView, RenderMode, RenderPlan, VirtualizationPolicy};
pub use services::{
    JsonFileStore, MemoryStore, OrchestratorOptions, PersistedStore, RecentItemsStore, RetryPolicy,
    SearchFailure, SearchOrchestrator, SearchSnapshot, SharedCache,
};
