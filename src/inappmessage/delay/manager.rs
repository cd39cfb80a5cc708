use std::{collections::HashMap, sync::Mutex};

use crate::{inappmessage::schedule::InAppMessageScheduleRequest, Error, Result};

use super::{InAppMessageDelay, InAppMessageDelayScheduler, InAppMessageDelayTask};

/// Tracks in-flight delay tasks keyed by dispatch id.
///
/// At most one active task exists per dispatch id. The table is shared between triggering threads
/// and timer threads.
pub struct InAppMessageDelayManager {
    scheduler: InAppMessageDelayScheduler,
    tasks: Mutex<HashMap<String, InAppMessageDelayTask>>,
}

impl InAppMessageDelayManager {
    #[allow(missing_docs)]
    pub fn new(scheduler: InAppMessageDelayScheduler) -> InAppMessageDelayManager {
        InAppMessageDelayManager {
            scheduler,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Scheduler starting the timers. Exposed so the composition root can register the listener.
    pub fn scheduler(&self) -> &InAppMessageDelayScheduler {
        &self.scheduler
    }

    /// Delay the schedule of `request` until its delivery time.
    ///
    /// A previous task for the same dispatch id must have completed already; it is replaced.
    ///
    /// # Errors
    ///
    /// - [`Error::DelayInProgress`] if a task for the same dispatch id is still pending.
    pub fn delay(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageDelay> {
        let mut tasks = self.lock_tasks();

        if let Some(task) = tasks.get(request.dispatch_id()) {
            if !task.is_completed() {
                return Err(Error::DelayInProgress {
                    dispatch_id: request.dispatch_id().to_owned(),
                });
            }
            tasks.remove(request.dispatch_id());
        }

        let delay = InAppMessageDelay::from_request(request);
        // Scheduler never runs the task synchronously, so starting it under the lock is safe.
        let task = self.scheduler.schedule(delay.clone());
        tasks.insert(request.dispatch_id().to_owned(), task);

        log::debug!(target: "inapp",
                    dispatch_id = request.dispatch_id(),
                    in_app_message_key = request.schedule.in_app_message_key,
                    delay_millis = delay.delay_millis();
                    "in-app message delayed");
        Ok(delay)
    }

    /// Register the delay and start its timer.
    ///
    /// Currently behaves exactly like [`InAppMessageDelayManager::delay`]. Kept as a separate entry
    /// point for schedules entering the delay table for the first time.
    pub fn register_and_delay(
        &self,
        request: &InAppMessageScheduleRequest,
    ) -> Result<InAppMessageDelay> {
        self.delay(request)
    }

    /// Remove the task of the dispatch and return its delay, or `None` if there is none.
    ///
    /// The timer is not cancelled: callers use this after the timer has fired.
    pub fn delete(&self, request: &InAppMessageScheduleRequest) -> Option<InAppMessageDelay> {
        self.lock_tasks()
            .remove(request.dispatch_id())
            .map(InAppMessageDelayTask::into_delay)
    }

    /// Cancel every pending delay and return the cancelled delays.
    ///
    /// The table is snapshotted and cleared atomically; timers are cancelled afterwards. A delay
    /// registered concurrently after the snapshot stays pending.
    pub fn cancel_all(&self) -> Vec<InAppMessageDelay> {
        let tasks = std::mem::take(&mut *self.lock_tasks());

        let delays: Vec<InAppMessageDelay> = tasks
            .into_values()
            .map(|task| {
                task.cancel();
                task.into_delay()
            })
            .collect();

        log::debug!(target: "inapp",
                    count = delays.len();
                    "cancelled all in-app message delays");
        delays
    }

    /// Number of tasks in the table, including completed ones not yet removed.
    pub fn len(&self) -> usize {
        self.lock_tasks().len()
    }

    /// Returns `true` if no task is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, HashMap<String, InAppMessageDelayTask>> {
        // lock() fails only if a thread panicked while holding the lock, which should never
        // happen.
        self.tasks
            .lock()
            .expect("thread holding delay task lock should not panic")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::InAppMessageDelayManager;
    use crate::{
        clock::ManualClock,
        inappmessage::{
            delay::InAppMessageDelayScheduler,
            schedule::{InAppMessageScheduleRequest, InAppMessageScheduleType},
            test_support::{schedule, FakeScheduler},
        },
        test_support::now,
        Error,
    };

    fn manager() -> (InAppMessageDelayManager, Arc<FakeScheduler>) {
        let scheduler = Arc::new(FakeScheduler::default());
        let manager = InAppMessageDelayManager::new(InAppMessageDelayScheduler::new(
            Arc::new(ManualClock::new(now())),
            scheduler.clone(),
        ));
        (manager, scheduler)
    }

    fn request(key: i64) -> InAppMessageScheduleRequest {
        InAppMessageScheduleRequest::new(
            schedule(key, now() + Duration::milliseconds(5000)),
            InAppMessageScheduleType::Triggered,
            now(),
        )
    }

    #[test]
    fn delay_registers_one_task() {
        let (manager, scheduler) = manager();
        let request = request(42);

        let delay = manager.delay(&request).unwrap();

        assert_eq!(manager.len(), 1);
        assert_eq!(delay.delay_millis(), 5000);
        assert_eq!(delay.schedule, request.schedule);
        assert_eq!(scheduler.delays(), vec![std::time::Duration::from_millis(5000)]);
    }

    #[test]
    fn redelay_before_completion_fails() {
        let (manager, _scheduler) = manager();
        let request = request(42);
        manager.delay(&request).unwrap();

        let result = manager.delay(&request);

        assert!(
            matches!(&result, Err(Error::DelayInProgress { dispatch_id }) if dispatch_id == request.dispatch_id()),
            "{result:?}"
        );
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn redelay_after_completion_replaces_task() {
        let (manager, scheduler) = manager();
        let request = request(42);
        manager.delay(&request).unwrap();
        scheduler.complete_all();

        let delay = manager.register_and_delay(&request).unwrap();

        assert_eq!(manager.len(), 1);
        assert_eq!(delay.schedule.dispatch_id, request.schedule.dispatch_id);
        assert_eq!(scheduler.delays().len(), 2);
    }

    #[test]
    fn delete_is_idempotent() {
        let (manager, _scheduler) = manager();
        let request = request(42);
        manager.delay(&request).unwrap();

        let first = manager.delete(&request);
        let second = manager.delete(&request);

        assert_eq!(first.map(|it| it.schedule), Some(request.schedule.clone()));
        assert_eq!(second, None);
        assert!(manager.is_empty());
    }

    #[test]
    fn delete_does_not_cancel_timer() {
        let (manager, scheduler) = manager();
        let request = request(42);
        manager.delay(&request).unwrap();

        manager.delete(&request);

        assert_eq!(scheduler.cancel_count(), 0);
    }

    #[test]
    fn cancel_all_cancels_every_task_once() {
        let (manager, scheduler) = manager();
        let requests: Vec<_> = (1..=3).map(request).collect();
        for request in &requests {
            manager.delay(request).unwrap();
        }

        let mut cancelled: Vec<i64> = manager
            .cancel_all()
            .into_iter()
            .map(|delay| delay.schedule.in_app_message_key)
            .collect();
        cancelled.sort();

        assert_eq!(cancelled, vec![1, 2, 3]);
        assert!(manager.is_empty());
        assert_eq!(scheduler.cancel_counts(), vec![1, 1, 1]);
    }

    #[test]
    fn cancel_all_on_empty_table() {
        let (manager, _scheduler) = manager();

        assert!(manager.cancel_all().is_empty());
    }

    #[test]
    fn concurrent_registration_and_removal() {
        let (manager, _scheduler) = manager();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..8)
            .map(|key| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let request = request(key);
                        manager.delay(&request).unwrap();
                        assert!(manager.delete(&request).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(manager.is_empty());
    }
}
