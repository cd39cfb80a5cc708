//! Target conditions and matching of a target against a user/event context.
use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::{event::Event, user::User, AttributeValue};

mod rules;

/// A target matches when all its conditions match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, From)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[allow(missing_docs)]
    pub conditions: Vec<Condition>,
}

/// `Condition` checks that the value found under `key` matches the condition `value` under the
/// given `operator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Condition {
    pub key: TargetKey,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

/// Where the value of a [`Condition`] is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct TargetKey {
    #[serde(rename = "type")]
    pub key_type: TargetKeyType,
    pub name: String,
}

impl TargetKey {
    #[allow(missing_docs)]
    pub fn event_property(name: impl Into<String>) -> TargetKey {
        TargetKey {
            key_type: TargetKeyType::EventProperty,
            name: name.into(),
        }
    }

    #[allow(missing_docs)]
    pub fn user_property(name: impl Into<String>) -> TargetKey {
        TargetKey {
            key_type: TargetKeyType::UserProperty,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum TargetKeyType {
    /// Property of the tracked event.
    EventProperty,
    /// Property of the user.
    UserProperty,
    /// Resolved user identifier of the given type (e.g. `$userId`).
    UserId,
}

/// Possible condition types.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    /// Matches regex. Condition value must be a regex string.
    Matches,
    /// Regex does not match. Condition value must be a regex string.
    NotMatches,
    /// Greater than or equal. Attribute and condition value must either be numbers or semver
    /// string.
    Gte,
    /// Greater than. Attribute and condition value must either be numbers or semver string.
    Gt,
    /// Less than or equal. Attribute and condition value must either be numbers or semver string.
    Lte,
    /// Less than. Attribute and condition value must either be numbers or semver string.
    Lt,
    /// One of values. Condition value must be a list of strings. Match is case-sensitive.
    OneOf,
    /// Not one of values. Condition value must be a list of strings. Match is case-sensitive.
    ///
    /// Null/absent values fail this condition automatically.
    NotOneOf,
    /// Null check.
    ///
    /// Condition value must be a boolean. If it's `true`, this is a null check. If it's `false`,
    /// this is a not null check.
    IsNull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum ConditionValue {
    Single(Value),
    // Only string arrays are supported.
    Multiple(Vec<String>),
}

impl<T: Into<Value>> From<T> for ConditionValue {
    fn from(value: T) -> Self {
        Self::Single(value.into())
    }
}
impl From<Vec<String>> for ConditionValue {
    fn from(value: Vec<String>) -> Self {
        Self::Multiple(value)
    }
}

/// Scalar condition value.
#[derive(Debug, Serialize, Deserialize, PartialEq, From, Clone)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Everything a target may look at.
#[derive(Debug, Clone, Copy)]
pub struct TargetContext<'a> {
    #[allow(missing_docs)]
    pub user: &'a User,
    /// Event being evaluated, if any. Event property conditions never match without one.
    pub event: Option<&'a Event>,
}

impl<'a> TargetContext<'a> {
    fn lookup(&self, key: &TargetKey) -> Option<AttributeValue> {
        match key.key_type {
            TargetKeyType::EventProperty => self.event?.properties.get(&key.name).cloned(),
            TargetKeyType::UserProperty => self.user.properties.get(&key.name).cloned(),
            TargetKeyType::UserId => self
                .user
                .resolve_identifiers()
                .remove(&key.name)
                .map(AttributeValue::String),
        }
    }
}

/// Matches a [`Target`] against a [`TargetContext`].
pub trait TargetMatcher: Send + Sync {
    /// Returns `true` if `target` matches the context.
    fn matches(&self, context: &TargetContext, target: &Target) -> bool;
}

/// The default [`TargetMatcher`]: all conditions of a target must hold.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleTargetMatcher;

impl TargetMatcher for RuleTargetMatcher {
    fn matches(&self, context: &TargetContext, target: &Target) -> bool {
        target.eval(context)
    }
}
