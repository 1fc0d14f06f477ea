//! Listener registration with guaranteed teardown.
//!
//! Registering a callback returns a [`ListenerGuard`]; dropping the guard
//! unregisters it. Guards hold only a weak reference, so they may outlive
//! the picker they were registered on.

use std::sync::{Arc, Mutex, Weak};

use crate::services::lock;

/// Callback invoked with a borrowed event payload.
pub type Callback<A> = Arc<dyn Fn(&A) + Send + Sync + 'static>;

struct Table<A> {
    next_id: u64,
    entries: Vec<(u64, Callback<A>)>,
}

/// An ordered set of callbacks for one event kind.
pub struct ListenerSet<A> {
    table: Arc<Mutex<Table<A>>>,
}

impl<A> Default for ListenerSet<A> {
    fn default() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<A: 'static> ListenerSet<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, callback: F) -> ListenerGuard
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = {
            let mut table = lock(&self.table);
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Table<A>>> = Arc::downgrade(&self.table);
        ListenerGuard {
            remove: Some(Box::new(move || {
                if let Some(table) = weak.upgrade() {
                    lock(&table).entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Call every registered callback in registration order.
    ///
    /// Callbacks run outside the lock, so they may register or drop
    /// listeners themselves.
    pub fn emit(&self, event: &A) {
        let callbacks: Vec<Callback<A>> = lock(&self.table)
            .entries
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.table).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unregisters its listener when dropped.
#[must_use = "dropping the guard unregisters the listener immediately"]
pub struct ListenerGuard {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerGuard {
    /// Keep the listener registered for the lifetime of its set.
    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("attached", &self.remove.is_some())
            .finish()
    }
}

/// Payload of a change notification: the committed id and entity, or an
/// empty id and `None` when the selection was cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChange<E> {
    pub id: String,
    pub entity: Option<E>,
}

/// Every listener a picker exposes.
pub struct PickerListeners<E> {
    pub change: ListenerSet<SelectionChange<E>>,
    pub clear: ListenerSet<()>,
    pub focus: ListenerSet<()>,
    pub blur: ListenerSet<()>,
}

impl<E> Default for PickerListeners<E> {
    fn default() -> Self {
        Self {
            change: ListenerSet::default(),
            clear: ListenerSet::default(),
            focus: ListenerSet::default(),
            blur: ListenerSet::default(),
        }
    }
}
