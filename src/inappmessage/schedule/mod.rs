//! Schedules: one dispatch of an in-app message, from trigger to delivery.
use serde::{Deserialize, Serialize};

use crate::{
    clock::Timestamp,
    evaluation::DecisionReason,
    event::{Event, UserEvent},
    user::Identifiers,
    workspace::InAppMessage,
    Result,
};

use super::{delay::InAppMessageDelay, deliver::InAppMessageDeliverResponse};

mod action;
mod processor;
mod scheduler;

pub use action::{InAppMessageScheduleAction, InAppMessageScheduleActionDeterminer};
pub use processor::{InAppMessageScheduleProcessor, InAppMessageSchedulerFactory};
pub use scheduler::{DelayedInAppMessageScheduler, InAppMessageScheduler, TriggeredInAppMessageScheduler};

/// A single dispatch of an in-app message. Created once per trigger match and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InAppMessageSchedule {
    /// Globally unique id of this dispatch. Never reused.
    pub dispatch_id: String,
    #[allow(missing_docs)]
    pub in_app_message_key: i64,
    /// Identifiers of the user at trigger time.
    pub identifiers: Identifiers,
    #[allow(missing_docs)]
    pub time: InAppMessageScheduleTime,
    /// Trigger-time evaluation reason.
    pub reason: DecisionReason,
    #[allow(missing_docs)]
    pub event_based_context: EventBasedContext,
}

impl InAppMessageSchedule {
    /// Create a schedule for `in_app_message` triggered by `event`. Delivery time follows the
    /// message's configured delay.
    ///
    /// # Errors
    ///
    /// Fails if the configured delay does not fit in a timestamp.
    pub fn create(
        in_app_message: &InAppMessage,
        reason: DecisionReason,
        event: &UserEvent,
    ) -> Result<InAppMessageSchedule> {
        Ok(InAppMessageSchedule {
            dispatch_id: uuid::Uuid::new_v4().to_string(),
            in_app_message_key: in_app_message.key,
            identifiers: event.user.resolve_identifiers(),
            time: InAppMessageScheduleTime::of(in_app_message, event.timestamp)?,
            reason,
            event_based_context: EventBasedContext {
                insert_id: event.insert_id.clone(),
                event: event.event.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct InAppMessageScheduleTime {
    pub started_at: Timestamp,
    pub deliver_at: Timestamp,
}

impl InAppMessageScheduleTime {
    #[allow(missing_docs)]
    pub fn of(
        in_app_message: &InAppMessage,
        started_at: Timestamp,
    ) -> Result<InAppMessageScheduleTime> {
        Ok(InAppMessageScheduleTime {
            started_at,
            deliver_at: in_app_message.delay.deliver_at(started_at)?,
        })
    }

    /// Milliseconds from `at` until delivery. Negative once the delivery time has passed.
    pub fn delay_millis(&self, at: Timestamp) -> i64 {
        (self.deliver_at - at).num_milliseconds()
    }
}

/// The event that triggered a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBasedContext {
    /// Insert id of the triggering event.
    pub insert_id: String,
    #[allow(missing_docs)]
    pub event: Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum InAppMessageScheduleType {
    /// Originates from a live event match.
    Triggered,
    /// Originates from a fired delay timer.
    Delayed,
}

/// A single processing pass over a schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct InAppMessageScheduleRequest {
    #[allow(missing_docs)]
    pub schedule: InAppMessageSchedule,
    #[allow(missing_docs)]
    pub schedule_type: InAppMessageScheduleType,
    #[allow(missing_docs)]
    pub requested_at: Timestamp,
}

impl InAppMessageScheduleRequest {
    #[allow(missing_docs)]
    pub fn new(
        schedule: InAppMessageSchedule,
        schedule_type: InAppMessageScheduleType,
        requested_at: Timestamp,
    ) -> InAppMessageScheduleRequest {
        InAppMessageScheduleRequest {
            schedule,
            schedule_type,
            requested_at,
        }
    }

    /// Milliseconds from `requested_at` until delivery.
    pub fn delay_millis(&self) -> i64 {
        self.schedule.time.delay_millis(self.requested_at)
    }

    #[allow(missing_docs)]
    pub fn dispatch_id(&self) -> &str {
        &self.schedule.dispatch_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum InAppMessageScheduleResponseCode {
    Deliver,
    Delay,
    Ignore,
    Exception,
}

/// Outcome of processing an [`InAppMessageScheduleRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct InAppMessageScheduleResponse {
    #[allow(missing_docs)]
    pub dispatch_id: String,
    #[allow(missing_docs)]
    pub in_app_message_key: i64,
    #[allow(missing_docs)]
    pub code: InAppMessageScheduleResponseCode,
    /// Set when the schedule was delivered.
    pub deliver_response: Option<InAppMessageDeliverResponse>,
    /// Set when the schedule was delayed.
    pub delay: Option<InAppMessageDelay>,
}

impl InAppMessageScheduleResponse {
    fn of(
        request: &InAppMessageScheduleRequest,
        code: InAppMessageScheduleResponseCode,
    ) -> InAppMessageScheduleResponse {
        InAppMessageScheduleResponse {
            dispatch_id: request.schedule.dispatch_id.clone(),
            in_app_message_key: request.schedule.in_app_message_key,
            code,
            deliver_response: None,
            delay: None,
        }
    }

    pub(crate) fn deliver(
        request: &InAppMessageScheduleRequest,
        deliver_response: InAppMessageDeliverResponse,
    ) -> InAppMessageScheduleResponse {
        InAppMessageScheduleResponse {
            deliver_response: Some(deliver_response),
            ..Self::of(request, InAppMessageScheduleResponseCode::Deliver)
        }
    }

    pub(crate) fn delay(
        request: &InAppMessageScheduleRequest,
        delay: InAppMessageDelay,
    ) -> InAppMessageScheduleResponse {
        InAppMessageScheduleResponse {
            delay: Some(delay),
            ..Self::of(request, InAppMessageScheduleResponseCode::Delay)
        }
    }

    pub(crate) fn ignore(request: &InAppMessageScheduleRequest) -> InAppMessageScheduleResponse {
        Self::of(request, InAppMessageScheduleResponseCode::Ignore)
    }

    pub(crate) fn exception(request: &InAppMessageScheduleRequest) -> InAppMessageScheduleResponse {
        Self::of(request, InAppMessageScheduleResponseCode::Exception)
    }
}

/// Receives schedule requests produced outside of the triggering path (fired delay timers).
pub trait InAppMessageScheduleListener: Send + Sync {
    #[allow(missing_docs)]
    fn on_schedule(&self, request: InAppMessageScheduleRequest);
}
