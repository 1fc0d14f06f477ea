//! Core module - runtime-agnostic types and pure search logic.
//!
//! This module contains everything that doesn't touch timers or storage:
//! - The [`Entity`] capability trait and [`Tier`]
//! - Query, page and result types plus the [`DataSource`] seam
//! - Relevance filtering/ranking and the predicate pipeline

pub mod entity;
pub mod query;
pub mod search;

pub use entity::{Entity, Tier};
pub use query::{
    normalize_term, CacheKey, DataSource, FetchFuture, FilterSet, Page, SearchQuery, SearchResult,
};
pub use search::{CustomPredicate, MatchKind, Predicate, RelevanceFilter};
