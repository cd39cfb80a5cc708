//! Builders shared by unit tests.
use chrono::{TimeZone, Utc};

use crate::{
    clock::Timestamp,
    workspace::{
        DisplayType, EvaluateContext, EventTrigger, EventTriggerRule, InAppMessage,
        InAppMessageStatus, InAppMessageTargetContext, Message, MessageContext, MessageDelay,
        Period,
    },
};

pub(crate) fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 7, 18, 12, 0, 0).unwrap()
}

pub(crate) fn message(lang: &str, variation_key: Option<&str>) -> Message {
    Message {
        variation_key: variation_key.map(str::to_owned),
        lang: lang.to_owned(),
        display_type: DisplayType::Modal,
        title: Some("Hello".to_owned()),
        body: None,
        buttons: vec![],
    }
}

/// Active message with key `key` (and id `key * 10`) triggered by `"purchase"`.
pub(crate) fn in_app_message(key: i64) -> InAppMessage {
    InAppMessage {
        id: key * 10,
        key,
        status: InAppMessageStatus::Active,
        period: Period::Always,
        delay: MessageDelay::Immediate,
        event_trigger: EventTrigger {
            rules: vec![EventTriggerRule {
                event_key: "purchase".to_owned(),
                targets: vec![],
            }],
            frequency_cap: None,
        },
        target_context: InAppMessageTargetContext::default(),
        message_context: MessageContext {
            default_lang: "en".to_owned(),
            experiment: None,
            messages: vec![message("en", None)],
        },
        evaluate_context: EvaluateContext::default(),
    }
}
