//! Change observers
//!
//! Observers run after every committed write. A path-scoped observer only
//! runs when the value at its path differs between the previous and the new
//! state.

use crate::path::KeyPath;
use crate::state::State;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback = Arc<dyn Fn(&State) + Send + Sync>;

struct Observer {
    id: u64,
    path: Option<KeyPath>,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct Observers {
    next_id: AtomicU64,
    entries: Mutex<Vec<Observer>>,
}

impl Observers {
    pub(crate) fn add(self: &Arc<Self>, path: Option<KeyPath>, callback: Callback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Observer { id, path, callback });
        Subscription {
            id,
            observers: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|observer| observer.id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run the observers affected by a change from `previous` to `next`
    pub(crate) fn notify(&self, previous: &State, next: &State) {
        // Collect first so callbacks may subscribe or unsubscribe.
        let due: Vec<Callback> = {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .filter(|observer| match &observer.path {
                    None => true,
                    Some(path) => {
                        let before = previous.lookup(path).ok().flatten();
                        let after = next.lookup(path).ok().flatten();
                        before != after
                    }
                })
                .map(|observer| Arc::clone(&observer.callback))
                .collect()
        };

        for callback in due {
            callback(next);
        }
    }
}

/// Handle to a registered observer.
///
/// Dropping the handle keeps the observer registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
pub struct Subscription {
    id: u64,
    observers: Weak<Observers>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the observer. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.observers.upgrade() {
            Some(observers) => observers.remove(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
