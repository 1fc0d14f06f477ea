pub mod cache;
pub mod orchestrator;
pub mod recent;
pub mod retry;
pub mod storage;
pub mod telemetry;

pub use cache::{CacheLookup, CacheTiming, FetchFailure, QueryCache, SharedCache};
pub use orchestrator::{OrchestratorOptions, SearchFailure, SearchOrchestrator, SearchSnapshot};
pub use recent::RecentItemsStore;
pub use retry::RetryPolicy;
pub use storage::{JsonFileStore, MemoryStore, PersistedStore};
pub use telemetry::{MetricSummary, PerfMetric, PerfTracker};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
