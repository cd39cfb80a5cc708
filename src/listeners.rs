//! Fan-out of SDK events to registered listeners.
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, RwLock},
};

use crate::{event::UserEvent, user::User};

/// Notified of every tracked event.
pub trait UserEventListener: Send + Sync {
    #[allow(missing_docs)]
    fn on_event(&self, event: &UserEvent);
}

/// Notified whenever the current user is replaced.
pub trait UserListener: Send + Sync {
    #[allow(missing_docs)]
    fn on_user_updated(&self, old_user: &User, new_user: &User);
}

struct Registration<L: ?Sized> {
    priority: i32,
    listener: Arc<L>,
}

/// Ordered set of listeners.
///
/// Listeners run synchronously in ascending priority, ties broken by registration order. A
/// panicking listener is logged and does not prevent the others from running.
pub struct ListenerRegistry<L: ?Sized> {
    registrations: RwLock<Vec<Registration<L>>>,
}

impl<L: ?Sized> Default for ListenerRegistry<L> {
    fn default() -> Self {
        ListenerRegistry {
            registrations: RwLock::new(Vec::new()),
        }
    }
}

impl<L: ?Sized> ListenerRegistry<L> {
    #[allow(missing_docs)]
    pub fn new() -> ListenerRegistry<L> {
        ListenerRegistry::default()
    }

    /// Register `listener` with `priority`. Lower priorities run first.
    pub fn add(&self, listener: Arc<L>, priority: i32) {
        let mut registrations = self
            .registrations
            .write()
            .expect("thread holding listener lock should not panic");
        registrations.push(Registration { priority, listener });
        // stable, so equal priorities keep registration order
        registrations.sort_by_key(|it| it.priority);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.registrations
            .read()
            .expect("thread holding listener lock should not panic")
            .len()
    }

    /// Returns `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke `f` on every listener.
    ///
    /// Runs over a snapshot, so listeners may register other listeners without deadlocking.
    pub fn for_each(&self, f: impl Fn(&L)) {
        let snapshot: Vec<Arc<L>> = self
            .registrations
            .read()
            .expect("thread holding listener lock should not panic")
            .iter()
            .map(|it| Arc::clone(&it.listener))
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| f(listener.as_ref()))).is_err() {
                log::error!(target: "inapp", "listener panicked while handling notification");
            }
        }
    }
}
