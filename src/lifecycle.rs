//! Tracking of the host screen currently in the foreground.
//!
//! The host drives the slot explicitly: it attaches the resumed activity, marks it paused, and
//! detaches it when it is destroyed. Nothing here relies on the host objects being dropped.
use std::sync::RwLock;

/// Whether the host app currently shows a screen messages can be rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityState {
    /// A host screen is in the foreground.
    Active,
    /// The app is backgrounded or no screen is attached.
    Inactive,
}

/// Provides the current [`ActivityState`].
pub trait ActivityProvider: Send + Sync {
    #[allow(missing_docs)]
    fn current_state(&self) -> ActivityState;
}

/// Identifies a host screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostActivity {
    /// Host-defined name of the screen, e.g. its class name.
    pub name: String,
}

impl HostActivity {
    #[allow(missing_docs)]
    pub fn new(name: impl Into<String>) -> HostActivity {
        HostActivity { name: name.into() }
    }
}

#[derive(Debug)]
struct Slot {
    activity: Option<HostActivity>,
    state: ActivityState,
}

/// Explicit "current host context" slot fed by host lifecycle callbacks.
#[derive(Debug)]
pub struct ActivityTracker {
    slot: RwLock<Slot>,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        ActivityTracker {
            slot: RwLock::new(Slot {
                activity: None,
                state: ActivityState::Inactive,
            }),
        }
    }
}

impl ActivityTracker {
    #[allow(missing_docs)]
    pub fn new() -> ActivityTracker {
        ActivityTracker::default()
    }

    /// `activity` came to the foreground.
    pub fn on_activity_resumed(&self, activity: HostActivity) {
        log::trace!(target: "inapp", activity = activity.name.as_str(); "activity resumed");
        let mut slot = self.write_slot();
        slot.activity = Some(activity);
        slot.state = ActivityState::Active;
    }

    /// `activity` left the foreground. Ignored if another activity has been resumed meanwhile.
    pub fn on_activity_paused(&self, activity: &HostActivity) {
        let mut slot = self.write_slot();
        if slot.activity.as_ref() == Some(activity) {
            slot.state = ActivityState::Inactive;
        }
    }

    /// `activity` is gone. Clears the slot if it holds `activity`.
    pub fn detach(&self, activity: &HostActivity) {
        let mut slot = self.write_slot();
        if slot.activity.as_ref() == Some(activity) {
            slot.activity = None;
            slot.state = ActivityState::Inactive;
        }
    }

    /// Activity currently attached, if any.
    pub fn current_activity(&self) -> Option<HostActivity> {
        self.slot
            .read()
            .expect("thread holding activity lock should not panic")
            .activity
            .clone()
    }

    fn write_slot(&self) -> std::sync::RwLockWriteGuard<'_, Slot> {
        self.slot
            .write()
            .expect("thread holding activity lock should not panic")
    }
}

impl ActivityProvider for ActivityTracker {
    fn current_state(&self) -> ActivityState {
        self.slot
            .read()
            .expect("thread holding activity lock should not panic")
            .state
    }
}
