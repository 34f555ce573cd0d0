//! "Model updated" notifications.
//!
//! Presentation code subscribes to a [`ListenerRegistry`] and receives a
//! [`ModelUpdated`] event whenever what it renders may have changed. Each
//! subscription is held by an RAII [`Subscription`]; dropping it removes the
//! listener.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::common::PageNumber;

/// Why dependents should re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelUpdated {
    /// A page finished loading.
    PageLoaded(PageNumber),
    /// A page failed to load; its rows now render as failed.
    PageFailed(PageNumber),
    /// The row count estimate was replaced from outside.
    RowCountChanged,
    /// The whole cache was replaced.
    Reset,
}

type Listener = Arc<dyn Fn(&ModelUpdated) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// A set of listeners for [`ModelUpdated`] events.
///
/// Cloning yields another handle to the same set.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Listeners>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`; it stays registered while the returned
    /// [`Subscription`] is alive.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ModelUpdated) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push((id, Arc::new(listener)));

        Subscription {
            registry: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver `event` to every listener.
    ///
    /// Listeners run without the registry lock held, so they may subscribe,
    /// unsubscribe, or query the cache.
    pub fn notify(&self, event: &ModelUpdated) {
        let listeners: Vec<Listener> = {
            let inner = self.inner.lock();
            inner.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(event);
        }
    }

    /// Remove every listener. Outstanding subscriptions become inert.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut self.inner.lock().entries);
        drop(entries);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Handle keeping one listener registered.
///
/// The listener is removed when the handle is dropped or
/// [`released`](Subscription::release).
#[must_use = "dropping a Subscription immediately unsubscribes"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Mutex<Listeners>>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn release(self) {
        // Drop does the work
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        match self.registry.upgrade() {
            Some(inner) => inner.lock().entries.iter().any(|(id, _)| *id == self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            // Listener dropped outside the lock; it may own other subscriptions.
            let removed = {
                let mut guard = inner.lock();
                let position = guard.entries.iter().position(|(id, _)| *id == self.id);
                position.map(|p| guard.entries.remove(p))
            };
            drop(removed);
        }
    }
}
