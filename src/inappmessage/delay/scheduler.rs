use std::{
    sync::{Arc, OnceLock, Weak},
    time::Duration,
};

use crate::{
    clock::Clock,
    inappmessage::schedule::{
        InAppMessageScheduleListener, InAppMessageScheduleRequest, InAppMessageScheduleType,
    },
    scheduler::Scheduler,
};

use super::{InAppMessageDelay, InAppMessageDelayTask};

/// Starts timers for delays. When a timer fires, a [`Delayed`](InAppMessageScheduleType::Delayed)
/// request is pushed to the registered listener (normally the schedule processor).
pub struct InAppMessageDelayScheduler {
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    // The listener owns (transitively) this scheduler, so only a weak link is kept back.
    listener: Arc<OnceLock<Weak<dyn InAppMessageScheduleListener>>>,
}

impl InAppMessageDelayScheduler {
    #[allow(missing_docs)]
    pub fn new(clock: Arc<dyn Clock>, scheduler: Arc<dyn Scheduler>) -> InAppMessageDelayScheduler {
        InAppMessageDelayScheduler {
            clock,
            scheduler,
            listener: Arc::new(OnceLock::new()),
        }
    }

    /// Register the listener receiving fired delays. Only the first registration takes effect.
    pub fn set_listener(&self, listener: Weak<dyn InAppMessageScheduleListener>) {
        if self.listener.set(listener).is_err() {
            log::warn!(target: "inapp", "in-app message delay listener is already registered");
        }
    }

    /// Start a timer firing after `delay.delay_millis()`. Negative delays fire immediately.
    pub fn schedule(&self, delay: InAppMessageDelay) -> InAppMessageDelayTask {
        let millis = u64::try_from(delay.delay_millis()).unwrap_or(0);

        let task = {
            let schedule = delay.schedule.clone();
            let clock = Arc::clone(&self.clock);
            let listener = Arc::clone(&self.listener);
            move || {
                let request = InAppMessageScheduleRequest::new(
                    schedule,
                    InAppMessageScheduleType::Delayed,
                    clock.now(),
                );
                log::debug!(target: "inapp",
                            dispatch_id = request.dispatch_id();
                            "in-app message delay fired");
                match listener.get().and_then(Weak::upgrade) {
                    Some(listener) => listener.on_schedule(request),
                    None => log::warn!(target: "inapp",
                                       dispatch_id = request.dispatch_id();
                                       "no listener for fired in-app message delay"),
                }
            }
        };

        let job = self
            .scheduler
            .schedule(Duration::from_millis(millis), Box::new(task));
        InAppMessageDelayTask::new(delay, job)
    }
}
