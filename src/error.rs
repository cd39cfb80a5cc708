use std::sync::Arc;

use crate::inappmessage::InAppMessageScheduleType;

/// Represents a result type for operations in the in-app message pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur while scheduling, delivering, or presenting an
/// in-app message.
///
/// Expected negative outcomes (inactive activity, missing workspace, changed identifiers, etc.) are
/// not errors. They are reported through response codes. Errors are either wiring bugs or
/// unexpected runtime failures.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// No scheduler claims support for the requested schedule type. Indicates a wiring bug.
    #[error("unsupported in-app message schedule type: {0:?}")]
    UnsupportedScheduleType(InAppMessageScheduleType),

    /// More than one scheduler claims support for the requested schedule type. Indicates a wiring
    /// bug.
    #[error("in-app message schedule type claimed by multiple schedulers: {0:?}")]
    AmbiguousScheduleType(InAppMessageScheduleType),

    /// A delay was requested for a dispatch that still has an active (not completed) delay task.
    #[error("in-app message delay already in progress (dispatch_id: {dispatch_id})")]
    DelayInProgress {
        /// Dispatch id of the delayed schedule.
        dispatch_id: String,
    },

    /// A delayed schedule fired but no delay is registered for its dispatch.
    #[error("in-app message delay not found (dispatch_id: {dispatch_id})")]
    DelayNotFound {
        /// Dispatch id of the delayed schedule.
        dispatch_id: String,
    },

    /// No message matches the resolved variation and language.
    #[error("cannot resolve message (in_app_message_key: {in_app_message_key})")]
    MessageNotResolved {
        /// Key of the in-app message.
        in_app_message_key: i64,
    },

    /// A configured duration moves a timestamp outside of the representable range.
    #[error("in-app message duration out of range (duration_millis: {duration_millis})")]
    DurationOutOfRange {
        /// Offending duration from the workspace.
        duration_millis: i64,
    },

    /// Impression storage failed to read or write.
    #[error("impression storage error: {0}")]
    Storage(Arc<str>),

    /// Scheduler is not bound to a running runtime.
    #[error("scheduler runtime is not available")]
    SchedulerUnavailable,

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Storage(value.to_string().into())
    }
}
