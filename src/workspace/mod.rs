//! Workspace snapshots and the thread-safe store holding the current one.
//!
//! A [`Workspace`] is immutable. When configuration changes, it is replaced completely. A reader
//! receives a *snapshot* that is not affected by further writes, so a single pipeline pass sees a
//! consistent view of all in-app messages.
use std::sync::{Arc, RwLock};

mod models;

pub use models::*;

/// Immutable snapshot of all in-app messages valid at a point in time.
#[derive(Debug, Clone)]
pub struct Workspace {
    in_app_messages: Vec<InAppMessage>,
}

impl Workspace {
    /// Create a workspace from parsed in-app messages.
    pub fn new(in_app_messages: Vec<InAppMessage>) -> Workspace {
        Workspace { in_app_messages }
    }

    /// Create a workspace from server response. Messages that failed to parse are dropped.
    pub fn from_config(config: WorkspaceConfig) -> Workspace {
        let total = config.in_app_messages.len();
        let in_app_messages: Vec<InAppMessage> = config
            .in_app_messages
            .into_iter()
            .filter_map(Option::from)
            .collect();
        if in_app_messages.len() != total {
            log::warn!(target: "inapp",
                       skipped = total - in_app_messages.len();
                       "some in-app messages failed to parse, try upgrading the SDK");
        }
        Workspace::new(in_app_messages)
    }

    /// All in-app messages in the workspace.
    pub fn in_app_messages(&self) -> &[InAppMessage] {
        &self.in_app_messages
    }

    /// Look up an in-app message by key.
    pub fn get_in_app_message(&self, key: i64) -> Option<&InAppMessage> {
        self.in_app_messages.iter().find(|it| it.key == key)
    }
}

/// Returns the current workspace snapshot.
pub trait WorkspaceFetcher: Send + Sync {
    /// Current workspace, or `None` if it hasn't been fetched yet.
    fn fetch(&self) -> Option<Arc<Workspace>>;
}

/// `WorkspaceStore` provides a thread-safe (`Sync`) storage for the current workspace that allows
/// concurrent access for readers and writers.
#[derive(Default)]
pub struct WorkspaceStore {
    workspace: RwLock<Option<Arc<Workspace>>>,
}

impl WorkspaceStore {
    /// Create a new empty workspace store.
    pub fn new() -> Self {
        WorkspaceStore::default()
    }

    /// Set new workspace.
    pub fn set_workspace(&self, workspace: Arc<Workspace>) {
        let mut slot = self
            .workspace
            .write()
            .expect("thread holding workspace lock should not panic");

        *slot = Some(workspace);
    }
}

impl WorkspaceFetcher for WorkspaceStore {
    fn fetch(&self) -> Option<Arc<Workspace>> {
        // read() fails only if the lock is poisoned (writer panicked while holding the lock), which
        // should never happen.
        let workspace = self
            .workspace
            .read()
            .expect("thread holding workspace lock should not panic");

        workspace.clone()
    }
}
