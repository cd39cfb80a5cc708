//! Delays of schedules whose delivery time is still in the future.
use crate::{clock::Timestamp, scheduler::ScheduledJob};

use super::schedule::{InAppMessageSchedule, InAppMessageScheduleRequest};

mod manager;
mod scheduler;

pub use manager::InAppMessageDelayManager;
pub use scheduler::InAppMessageDelayScheduler;

/// A schedule waiting for its delivery time.
#[derive(Debug, Clone, PartialEq)]
pub struct InAppMessageDelay {
    #[allow(missing_docs)]
    pub schedule: InAppMessageSchedule,
    /// When the delay was requested.
    pub requested_at: Timestamp,
}

impl InAppMessageDelay {
    /// Create a delay for the schedule of `request`.
    pub fn from_request(request: &InAppMessageScheduleRequest) -> InAppMessageDelay {
        InAppMessageDelay {
            schedule: request.schedule.clone(),
            requested_at: request.requested_at,
        }
    }

    /// Milliseconds to wait, measured from `requested_at`.
    pub fn delay_millis(&self) -> i64 {
        self.schedule.time.delay_millis(self.requested_at)
    }

    #[allow(missing_docs)]
    pub fn dispatch_id(&self) -> &str {
        &self.schedule.dispatch_id
    }
}

/// Live, cancellable timer of an [`InAppMessageDelay`].
pub struct InAppMessageDelayTask {
    delay: InAppMessageDelay,
    job: Box<dyn ScheduledJob>,
}

impl InAppMessageDelayTask {
    pub(crate) fn new(delay: InAppMessageDelay, job: Box<dyn ScheduledJob>) -> InAppMessageDelayTask {
        InAppMessageDelayTask { delay, job }
    }

    #[allow(missing_docs)]
    pub fn delay(&self) -> &InAppMessageDelay {
        &self.delay
    }

    /// `true` once the timer fired or was cancelled.
    pub fn is_completed(&self) -> bool {
        self.job.is_completed()
    }

    /// Cancel the timer. No-op if it has already fired.
    pub fn cancel(&self) {
        self.job.cancel();
        log::debug!(target: "inapp",
                    dispatch_id = self.delay.dispatch_id(),
                    in_app_message_key = self.delay.schedule.in_app_message_key;
                    "in-app message delay cancelled");
    }

    pub(crate) fn into_delay(self) -> InAppMessageDelay {
        self.delay
    }
}

impl std::fmt::Debug for InAppMessageDelayTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InAppMessageDelayTask")
            .field("delay", &self.delay)
            .field("is_completed", &self.is_completed())
            .finish()
    }
}
