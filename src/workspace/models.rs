use serde::{Deserialize, Serialize};

use crate::{
    clock::{add_millis, Timestamp},
    target::Target,
    Result,
};

/// Workspace configuration as served by the backend. In-app messages are parsed one by one.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// In-app messages.
    ///
    /// Value is wrapped in `TryParse` so that if we fail to parse one message (e.g., new server
    /// format), we can still serve other messages.
    #[serde(default)]
    pub in_app_messages: Vec<TryParse<InAppMessage>>,
}

/// `TryParse` allows the subfield to fail parsing without failing the parsing of the whole
/// structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed.
    Parsed(T),
    /// Parsing failed.
    ParseFailed(serde_json::Value),
}

impl<T> From<TryParse<T>> for Option<T> {
    fn from(value: TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

/// In-app message campaign definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InAppMessage {
    #[allow(missing_docs)]
    pub id: i64,
    /// Key used to look the message up in a workspace.
    pub key: i64,
    #[allow(missing_docs)]
    pub status: InAppMessageStatus,
    /// When the campaign runs.
    #[serde(default)]
    pub period: Period,
    /// How long to wait between the trigger and the delivery.
    #[serde(default)]
    pub delay: MessageDelay,
    #[allow(missing_docs)]
    pub event_trigger: EventTrigger,
    #[serde(default)]
    #[allow(missing_docs)]
    pub target_context: InAppMessageTargetContext,
    #[allow(missing_docs)]
    pub message_context: MessageContext,
    #[serde(default)]
    #[allow(missing_docs)]
    pub evaluate_context: EvaluateContext,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum InAppMessageStatus {
    Active,
    Paused,
    Draft,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Period {
    #[default]
    Always,
    #[serde(rename_all = "camelCase")]
    Custom {
        start_at: Timestamp,
        end_at: Timestamp,
    },
}

impl Period {
    /// Returns `true` if `timestamp` is within the period. Custom periods are half-open
    /// (`start_at <= timestamp < end_at`).
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        match self {
            Period::Always => true,
            Period::Custom { start_at, end_at } => *start_at <= timestamp && timestamp < *end_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum MessageDelay {
    #[default]
    Immediate,
    #[serde(rename_all = "camelCase")]
    After { duration_millis: i64 },
}

impl MessageDelay {
    /// Time at which a message triggered at `started_at` should be delivered.
    ///
    /// # Errors
    ///
    /// - [`Error::DurationOutOfRange`](crate::Error::DurationOutOfRange) if the delay does not fit
    ///   in a timestamp.
    pub fn deliver_at(&self, started_at: Timestamp) -> Result<Timestamp> {
        match self {
            MessageDelay::Immediate => Ok(started_at),
            MessageDelay::After { duration_millis } => add_millis(started_at, *duration_millis),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EventTrigger {
    pub rules: Vec<EventTriggerRule>,
    #[serde(default)]
    pub frequency_cap: Option<FrequencyCap>,
}

/// Event that triggers the message, optionally narrowed by targets. Empty `targets` always match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EventTriggerRule {
    pub event_key: String,
    #[serde(default)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct FrequencyCap {
    #[serde(default)]
    pub identifier_caps: Vec<IdentifierCap>,
    #[serde(default)]
    pub duration_cap: Option<DurationCap>,
}

/// At most `count` impressions per identifier of the given type.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct IdentifierCap {
    pub identifier_type: String,
    pub count: usize,
}

/// At most `count` impressions within the last `duration_millis`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct DurationCap {
    pub duration_millis: i64,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct InAppMessageTargetContext {
    /// Audience. Empty targets match everyone.
    #[serde(default)]
    pub targets: Vec<Target>,
    /// User ids that always see the message.
    #[serde(default)]
    pub overrides: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct MessageContext {
    pub default_lang: String,
    /// A/B test over message variants.
    #[serde(default)]
    pub experiment: Option<ExperimentContext>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ExperimentContext {
    pub key: i64,
    /// Identifier type used to bucket users.
    #[serde(default = "default_experiment_identifier_type")]
    pub identifier_type: String,
    /// Variation keys. Users are split evenly between them.
    pub variations: Vec<String>,
}

fn default_experiment_identifier_type() -> String {
    crate::user::DEVICE_ID_TYPE.to_owned()
}

/// Content of a single message variant in a single language.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Message {
    #[serde(default)]
    pub variation_key: Option<String>,
    pub lang: String,
    pub display_type: DisplayType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum DisplayType {
    Modal,
    Banner,
    BottomSheet,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Button {
    pub text: String,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EvaluateContext {
    /// Re-run eligibility evaluation right before presenting.
    #[serde(default)]
    pub at_deliver_time: bool,
}
