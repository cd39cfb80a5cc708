//! The in-app message delivery pipeline.
//!
//! A tracked event flows through the stages in order:
//!
//! 1. [`InAppMessageTriggerProcessor`] matches the event against the workspace and creates an
//!    [`InAppMessageSchedule`] per eligible message.
//! 2. [`InAppMessageScheduleProcessor`] decides to deliver, delay, or ignore the schedule.
//! 3. Delayed schedules are kept by the [`InAppMessageDelayManager`] until their timer fires and
//!    re-enter step 2 as [`Delayed`](InAppMessageScheduleType::Delayed) requests.
//! 4. [`InAppMessageDeliverProcessor`] re-validates the dispatch.
//! 5. [`InAppMessagePresentProcessor`] resolves the layout, presents, and records the impression.
//!
//! User changes go through [`InAppMessageResetProcessor`], which cancels pending delays.
mod delay;
mod deliver;
mod manager;
mod present;
mod reset;
mod schedule;
mod trigger;

#[cfg(test)]
pub(crate) mod test_support;

pub use delay::{InAppMessageDelay, InAppMessageDelayManager, InAppMessageDelayScheduler, InAppMessageDelayTask};
pub use deliver::{
    InAppMessageDeliverProcessor, InAppMessageDeliverRequest, InAppMessageDeliverResponse,
    InAppMessageDeliverResponseCode, TRIGGER_EVENT_INSERT_ID_PROPERTY, TRIGGER_EVENT_KEY_PROPERTY,
};
pub use manager::InAppMessageManager;
pub(crate) use present::NoopPresenter;
pub use present::{
    InAppMessagePresentProcessor, InAppMessagePresentRequest, InAppMessagePresentResponse,
    InAppMessagePresentationContext, InAppMessagePresenter,
};
pub use reset::InAppMessageResetProcessor;
pub use schedule::{
    DelayedInAppMessageScheduler, EventBasedContext, InAppMessageSchedule,
    InAppMessageScheduleAction, InAppMessageScheduleActionDeterminer,
    InAppMessageScheduleListener, InAppMessageScheduleProcessor, InAppMessageScheduleRequest,
    InAppMessageScheduleResponse, InAppMessageScheduleResponseCode, InAppMessageScheduleTime,
    InAppMessageScheduleType, InAppMessageScheduler, InAppMessageSchedulerFactory,
    TriggeredInAppMessageScheduler,
};
pub use trigger::{InAppMessageTriggerDeterminer, InAppMessageTriggerProcessor};
