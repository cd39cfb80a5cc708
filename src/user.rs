//! User snapshot consumed by the pipeline and the identifier-change check.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Attributes;

/// Resolved identifiers of a user, keyed by identifier type.
pub type Identifiers = HashMap<String, String>;

/// Identifier type of [`User::user_id`].
pub const USER_ID_TYPE: &str = "$userId";
/// Identifier type of [`User::device_id`].
pub const DEVICE_ID_TYPE: &str = "$deviceId";

/// A user as seen by the SDK at some point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Login id, if the user is signed in.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Device id. Stable across sign-ins.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Custom identifiers.
    #[serde(default)]
    pub identifiers: Identifiers,
    /// User properties used for targeting.
    #[serde(default)]
    pub properties: Attributes,
}

impl User {
    /// Create an anonymous user identified by device id only.
    pub fn with_device_id(device_id: impl Into<String>) -> User {
        User {
            device_id: Some(device_id.into()),
            ..Default::default()
        }
    }

    /// Set login id.
    pub fn user_id(mut self, user_id: impl Into<String>) -> User {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add a user property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<crate::AttributeValue>) -> User {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Resolve all identifiers of the user, including `$userId` and `$deviceId`.
    pub fn resolve_identifiers(&self) -> Identifiers {
        let mut identifiers = self.identifiers.clone();
        if let Some(user_id) = &self.user_id {
            identifiers.insert(USER_ID_TYPE.to_owned(), user_id.clone());
        }
        if let Some(device_id) = &self.device_id {
            identifiers.insert(DEVICE_ID_TYPE.to_owned(), device_id.clone());
        }
        identifiers
    }
}

/// Provides the currently active user.
pub trait UserResolver: Send + Sync {
    /// Returns a snapshot of the current user.
    fn resolve(&self) -> User;
}

/// Decides whether two identifier snapshots belong to different people.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentifierChecker;

impl IdentifierChecker {
    /// Returns `true` if `new` identifies a different user than `old`.
    ///
    /// `$userId` wins when present on both sides. Otherwise `$deviceId` is compared. If neither is
    /// present on both sides, the identity is considered unchanged.
    pub fn is_identifier_changed(&self, old: &Identifiers, new: &Identifiers) -> bool {
        if let (Some(old_user_id), Some(new_user_id)) = (old.get(USER_ID_TYPE), new.get(USER_ID_TYPE))
        {
            return old_user_id != new_user_id;
        }
        if let (Some(old_device_id), Some(new_device_id)) =
            (old.get(DEVICE_ID_TYPE), new.get(DEVICE_ID_TYPE))
        {
            return old_device_id != new_device_id;
        }
        false
    }
}
