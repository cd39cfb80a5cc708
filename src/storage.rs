//! Impression history of in-app messages.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::{clock::Timestamp, user::Identifiers, workspace::InAppMessage, Result};

/// One presentation of an in-app message to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InAppMessageImpression {
    /// Identifiers of the user who saw the message.
    pub identifiers: Identifiers,
    #[allow(missing_docs)]
    pub timestamp: Timestamp,
}

/// Key-value storage of impressions, keyed by in-app message id.
///
/// Implementations are usually backed by persistent device storage.
pub trait ImpressionStorage: Send + Sync {
    /// Impressions of the message, oldest first. Empty if none were recorded.
    fn get(&self, in_app_message_id: i64) -> Result<Vec<InAppMessageImpression>>;
    /// Replace impressions of the message.
    fn set(&self, in_app_message_id: i64, impressions: &[InAppMessageImpression]) -> Result<()>;
    /// Forget impressions of the message.
    fn remove(&self, in_app_message_id: i64);
    /// Forget all impressions.
    fn clear(&self);
}

/// In-memory [`ImpressionStorage`]. Values are kept JSON-encoded, the same way a persistent
/// key-value store would hold them.
#[derive(Debug, Default)]
pub struct MemoryImpressionStorage {
    values: RwLock<HashMap<i64, String>>,
}

impl MemoryImpressionStorage {
    #[allow(missing_docs)]
    pub fn new() -> MemoryImpressionStorage {
        MemoryImpressionStorage::default()
    }
}

impl ImpressionStorage for MemoryImpressionStorage {
    fn get(&self, in_app_message_id: i64) -> Result<Vec<InAppMessageImpression>> {
        let values = self
            .values
            .read()
            .expect("thread holding impression lock should not panic");
        match values.get(&in_app_message_id) {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Vec::new()),
        }
    }

    fn set(&self, in_app_message_id: i64, impressions: &[InAppMessageImpression]) -> Result<()> {
        let json = serde_json::to_string(impressions)?;
        self.values
            .write()
            .expect("thread holding impression lock should not panic")
            .insert(in_app_message_id, json);
        Ok(())
    }

    fn remove(&self, in_app_message_id: i64) {
        self.values
            .write()
            .expect("thread holding impression lock should not panic")
            .remove(&in_app_message_id);
    }

    fn clear(&self) {
        self.values
            .write()
            .expect("thread holding impression lock should not panic")
            .clear();
    }
}

/// Appends impressions to [`ImpressionStorage`], keeping at most `max_impressions` per message.
pub struct ImpressionRecorder {
    storage: Arc<dyn ImpressionStorage>,
    max_impressions: usize,
    // Serializes get-append-set so concurrent deliveries do not drop each other's impressions.
    write_lock: Mutex<()>,
}

impl ImpressionRecorder {
    /// Default for the number of impressions retained per message.
    pub const DEFAULT_MAX_IMPRESSIONS: usize = 100;

    #[allow(missing_docs)]
    pub fn new(storage: Arc<dyn ImpressionStorage>, max_impressions: usize) -> ImpressionRecorder {
        ImpressionRecorder {
            storage,
            max_impressions,
            write_lock: Mutex::new(()),
        }
    }

    /// Record an impression. Storage failures are logged and swallowed, they must never block
    /// presentation.
    pub fn record(&self, in_app_message: &InAppMessage, impression: InAppMessageImpression) {
        if let Err(err) = self.try_record(in_app_message, impression) {
            log::warn!(target: "inapp",
                       in_app_message_key = in_app_message.key;
                       "failed to record in-app message impression: {err}");
        }
    }

    fn try_record(
        &self,
        in_app_message: &InAppMessage,
        impression: InAppMessageImpression,
    ) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .expect("thread holding impression recorder lock should not panic");
        let mut impressions = self.storage.get(in_app_message.id)?;
        impressions.push(impression);
        if impressions.len() > self.max_impressions {
            // oldest first
            let overflow = impressions.len() - self.max_impressions;
            impressions.drain(..overflow);
        }
        self.storage.set(in_app_message.id, &impressions)
    }
}
