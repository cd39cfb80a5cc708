//! Fakes for the in-app message pipeline tests.
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, Weak,
    },
    time::Duration,
};

use crate::{
    clock::{ManualClock, Timestamp},
    evaluation::{DecisionReason, DefaultEligibilityEvaluator, DefaultLayoutResolver},
    event::{Event, UserEvent},
    lifecycle::{ActivityProvider, ActivityState},
    scheduler::{ScheduledJob, Scheduler},
    storage::{ImpressionRecorder, MemoryImpressionStorage},
    target::RuleTargetMatcher,
    test_support::now,
    user::{User, UserResolver},
    workspace::{InAppMessage, Workspace, WorkspaceStore},
};

use super::{
    delay::{InAppMessageDelayManager, InAppMessageDelayScheduler},
    deliver::InAppMessageDeliverProcessor,
    present::{InAppMessagePresentProcessor, InAppMessagePresentationContext, NoopPresenter},
    schedule::{
        DelayedInAppMessageScheduler, EventBasedContext, InAppMessageSchedule,
        InAppMessageScheduleListener, InAppMessageScheduleProcessor, InAppMessageScheduleTime,
        InAppMessageSchedulerFactory, TriggeredInAppMessageScheduler,
    },
};

/// Schedule of message `key` for device `"device"`, started at `now()`.
pub(crate) fn schedule(key: i64, deliver_at: Timestamp) -> InAppMessageSchedule {
    let event = UserEvent::track(Event::new("purchase"), User::with_device_id("device"), now());
    InAppMessageSchedule {
        dispatch_id: uuid::Uuid::new_v4().to_string(),
        in_app_message_key: key,
        identifiers: event.user.resolve_identifiers(),
        time: InAppMessageScheduleTime {
            started_at: now(),
            deliver_at,
        },
        reason: DecisionReason::InAppMessageTarget,
        event_based_context: EventBasedContext {
            insert_id: event.insert_id,
            event: event.event,
        },
    }
}

#[derive(Default)]
struct FakeJobState {
    fired: AtomicBool,
    cancels: AtomicUsize,
}

impl FakeJobState {
    fn is_cancelled(&self) -> bool {
        self.cancels.load(Ordering::SeqCst) > 0
    }
}

struct FakeJob(Arc<FakeJobState>);

impl ScheduledJob for FakeJob {
    fn cancel(&self) {
        self.0.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn is_completed(&self) -> bool {
        self.0.fired.load(Ordering::SeqCst) || self.0.is_cancelled()
    }
}

struct Entry {
    delay: Duration,
    state: Arc<FakeJobState>,
    task: Option<Box<dyn FnOnce() + Send>>,
}

/// Scheduler that records jobs and runs them only when told to.
#[derive(Default)]
pub(crate) struct FakeScheduler {
    entries: Mutex<Vec<Entry>>,
}

impl FakeScheduler {
    /// Delays of all jobs scheduled so far, in order.
    pub(crate) fn delays(&self) -> Vec<Duration> {
        self.entries.lock().unwrap().iter().map(|it| it.delay).collect()
    }

    /// Run every pending, non-cancelled job. Jobs scheduled by the callbacks stay pending.
    pub(crate) fn fire_all(&self) {
        let tasks: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|it| !it.state.is_cancelled())
            .filter_map(|it| it.task.take().map(|task| (it.state.clone(), task)))
            .collect();

        for (state, task) in tasks {
            state.fired.store(true, Ordering::SeqCst);
            task();
        }
    }

    /// Mark every pending job as fired without running it.
    pub(crate) fn complete_all(&self) {
        for entry in self.entries.lock().unwrap().iter_mut() {
            if entry.task.take().is_some() {
                entry.state.fired.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Total number of `cancel()` calls.
    pub(crate) fn cancel_count(&self) -> usize {
        self.cancel_counts().into_iter().sum()
    }

    /// Number of `cancel()` calls per job, in scheduling order.
    pub(crate) fn cancel_counts(&self) -> Vec<usize> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|it| it.state.cancels.load(Ordering::SeqCst))
            .collect()
    }
}

impl Scheduler for FakeScheduler {
    fn schedule(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> Box<dyn ScheduledJob> {
        let state = Arc::new(FakeJobState::default());
        self.entries.lock().unwrap().push(Entry {
            delay,
            state: state.clone(),
            task: Some(task),
        });
        Box::new(FakeJob(state))
    }

    fn schedule_periodically(
        &self,
        delay: Duration,
        _period: Duration,
        task: Box<dyn Fn() + Send + Sync + 'static>,
    ) -> Box<dyn ScheduledJob> {
        self.schedule(delay, Box::new(move || task()))
    }
}

/// Activity provider with a settable state.
pub(crate) struct FakeActivityProvider(Mutex<ActivityState>);

impl FakeActivityProvider {
    pub(crate) fn new(state: ActivityState) -> FakeActivityProvider {
        FakeActivityProvider(Mutex::new(state))
    }

    pub(crate) fn set(&self, state: ActivityState) {
        *self.0.lock().unwrap() = state;
    }
}

impl ActivityProvider for FakeActivityProvider {
    fn current_state(&self) -> ActivityState {
        *self.0.lock().unwrap()
    }
}

/// User resolver returning a settable user.
pub(crate) struct FakeUserResolver(Mutex<User>);

impl FakeUserResolver {
    pub(crate) fn new(user: User) -> FakeUserResolver {
        FakeUserResolver(Mutex::new(user))
    }

    pub(crate) fn set(&self, user: User) {
        *self.0.lock().unwrap() = user;
    }
}

impl UserResolver for FakeUserResolver {
    fn resolve(&self) -> User {
        self.0.lock().unwrap().clone()
    }
}

/// Delay manager backed by a [`FakeScheduler`] and a clock frozen at `now()`.
pub(crate) fn delay_manager() -> (InAppMessageDelayManager, Arc<FakeScheduler>) {
    let scheduler = Arc::new(FakeScheduler::default());
    let manager = InAppMessageDelayManager::new(InAppMessageDelayScheduler::new(
        Arc::new(ManualClock::new(now())),
        scheduler.clone(),
    ));
    (manager, scheduler)
}

/// Deliver processor with an active activity, user `"device"`, and a workspace of
/// `in_app_messages`.
pub(crate) fn deliver_processor(in_app_messages: Vec<InAppMessage>) -> InAppMessageDeliverProcessor {
    let workspaces = WorkspaceStore::new();
    workspaces.set_workspace(Arc::new(Workspace::new(in_app_messages)));
    let storage = Arc::new(MemoryImpressionStorage::new());

    InAppMessageDeliverProcessor::new(
        Arc::new(FakeActivityProvider::new(ActivityState::Active)),
        Arc::new(workspaces),
        Arc::new(FakeUserResolver::new(User::with_device_id("device"))),
        Arc::new(DefaultEligibilityEvaluator::new(
            Arc::new(RuleTargetMatcher),
            storage.clone(),
        )),
        InAppMessagePresentProcessor::new(
            Arc::new(DefaultLayoutResolver),
            Arc::new(NoopPresenter),
            ImpressionRecorder::new(storage, 100),
        ),
    )
}

/// Fully wired pipeline from schedule processor down to a recording presenter.
pub(crate) struct Pipeline {
    pub(crate) workspaces: Arc<WorkspaceStore>,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) scheduler: Arc<FakeScheduler>,
    pub(crate) delay_manager: Arc<InAppMessageDelayManager>,
    pub(crate) schedule_processor: Arc<InAppMessageScheduleProcessor>,
    pub(crate) presented: Arc<Mutex<Vec<InAppMessagePresentationContext>>>,
}

impl Pipeline {
    pub(crate) fn presented_keys(&self) -> Vec<i64> {
        self.presented
            .lock()
            .unwrap()
            .iter()
            .map(|it| it.in_app_message_key)
            .collect()
    }
}

pub(crate) fn pipeline(in_app_messages: Vec<InAppMessage>) -> Pipeline {
    let workspaces = Arc::new(WorkspaceStore::new());
    workspaces.set_workspace(Arc::new(Workspace::new(in_app_messages)));
    let clock = Arc::new(ManualClock::new(now()));
    let scheduler = Arc::new(FakeScheduler::default());
    let storage = Arc::new(MemoryImpressionStorage::new());
    let presented = Arc::new(Mutex::new(Vec::new()));

    let deliver_processor = Arc::new(InAppMessageDeliverProcessor::new(
        Arc::new(FakeActivityProvider::new(ActivityState::Active)),
        workspaces.clone(),
        Arc::new(FakeUserResolver::new(User::with_device_id("device"))),
        Arc::new(DefaultEligibilityEvaluator::new(
            Arc::new(RuleTargetMatcher),
            storage.clone(),
        )),
        InAppMessagePresentProcessor::new(
            Arc::new(DefaultLayoutResolver),
            Arc::new({
                let presented = presented.clone();
                move |context: &InAppMessagePresentationContext| {
                    presented.lock().unwrap().push(context.clone())
                }
            }),
            ImpressionRecorder::new(storage, 100),
        ),
    ));
    let delay_manager = Arc::new(InAppMessageDelayManager::new(
        InAppMessageDelayScheduler::new(clock.clone(), scheduler.clone()),
    ));
    let schedule_processor = Arc::new(InAppMessageScheduleProcessor::new(
        InAppMessageSchedulerFactory::new(vec![
            Box::new(TriggeredInAppMessageScheduler::new(
                deliver_processor.clone(),
                delay_manager.clone(),
            )),
            Box::new(DelayedInAppMessageScheduler::new(
                deliver_processor,
                delay_manager.clone(),
            )),
        ]),
    ));
    let listener: Weak<dyn InAppMessageScheduleListener> = Arc::downgrade(&schedule_processor) as _;
    delay_manager.scheduler().set_listener(listener);

    Pipeline {
        workspaces,
        clock,
        scheduler,
        delay_manager,
        schedule_processor,
        presented,
    }
}
