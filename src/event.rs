use serde::{Deserialize, Serialize};

use crate::{clock::Timestamp, user::User, AttributeValue, Attributes};

/// A custom event tracked by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event key, e.g. `"purchase"`.
    pub key: String,
    /// Event properties.
    #[serde(default)]
    pub properties: Attributes,
}

impl Event {
    #[allow(missing_docs)]
    pub fn new(key: impl Into<String>) -> Event {
        Event {
            key: key.into(),
            properties: Attributes::new(),
        }
    }

    /// Add an event property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Event {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A tracked [`Event`] bound to the user who produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    /// Unique id of this occurrence, used for deduplication downstream.
    pub insert_id: String,
    /// When the event was tracked.
    pub timestamp: Timestamp,
    /// User snapshot at tracking time.
    pub user: User,
    #[allow(missing_docs)]
    pub event: Event,
}

impl UserEvent {
    /// Create a user event with a freshly generated insert id.
    pub fn track(event: Event, user: User, timestamp: Timestamp) -> UserEvent {
        UserEvent {
            insert_id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            user,
            event,
        }
    }
}
