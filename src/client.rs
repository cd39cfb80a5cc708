use std::sync::{Arc, RwLock, Weak};

use crate::{
    clock::Clock,
    evaluation::DefaultEligibilityEvaluator,
    event::{Event, UserEvent},
    inappmessage::{
        DelayedInAppMessageScheduler, InAppMessageDelayManager, InAppMessageDelayScheduler,
        InAppMessageDeliverProcessor, InAppMessageManager, InAppMessagePresentProcessor,
        InAppMessageResetProcessor, InAppMessageScheduleListener, InAppMessageScheduleProcessor,
        InAppMessageSchedulerFactory, InAppMessageTriggerDeterminer, InAppMessageTriggerProcessor,
        TriggeredInAppMessageScheduler,
    },
    lifecycle::ActivityTracker,
    listeners::{ListenerRegistry, UserEventListener, UserListener},
    scheduler::{Scheduler, TokioScheduler},
    storage::ImpressionRecorder,
    user::{User, UserResolver},
    workspace::{Workspace, WorkspaceStore},
    ClientConfig, Result,
};

/// In-app messaging client.
///
/// The client owns the whole pipeline. Tracked events are matched against the current workspace
/// and the resulting messages are handed to the configured presenter, right away or after their
/// configured delay.
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// # Examples
/// ```
/// # use inapp_messaging::{ClientConfig, Event, HostActivity};
/// # let runtime = tokio::runtime::Runtime::new().unwrap();
/// # let _guard = runtime.enter();
/// let client = ClientConfig::new().to_client().unwrap();
/// client.activity_tracker().on_activity_resumed(HostActivity::new("MainActivity"));
/// client.track(Event::new("purchase").property("amount", 9.99));
/// ```
pub struct Client {
    clock: Arc<dyn Clock>,
    current_user: Arc<CurrentUser>,
    workspace_store: Arc<WorkspaceStore>,
    activity_tracker: Arc<ActivityTracker>,
    delay_manager: Arc<InAppMessageDelayManager>,
    event_listeners: ListenerRegistry<dyn UserEventListener>,
    user_listeners: ListenerRegistry<dyn UserListener>,
    // Delay timers only hold a weak reference to the processor.
    _schedule_processor: Arc<InAppMessageScheduleProcessor>,
}

struct CurrentUser(RwLock<User>);

impl CurrentUser {
    fn replace(&self, user: User) -> User {
        let mut current = self
            .0
            .write()
            .expect("thread holding user lock should not panic");
        std::mem::replace(&mut *current, user)
    }
}

impl UserResolver for CurrentUser {
    fn resolve(&self) -> User {
        self.0
            .read()
            .expect("thread holding user lock should not panic")
            .clone()
    }
}

impl Client {
    /// Create a new `Client` using the specified configuration.
    ///
    /// # Errors
    ///
    /// Fails if no scheduler was configured and a dedicated runtime could not be started.
    pub fn new(config: ClientConfig) -> Result<Client> {
        let scheduler: Arc<dyn Scheduler> = match config.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(default_scheduler()?),
        };
        let clock = config.clock;
        let current_user = Arc::new(CurrentUser(RwLock::new(config.user)));
        let workspace_store = Arc::new(WorkspaceStore::new());
        let activity_tracker = Arc::new(ActivityTracker::new());
        let eligibility_evaluator = config.eligibility_evaluator.unwrap_or_else(|| {
            Arc::new(DefaultEligibilityEvaluator::new(
                Arc::clone(&config.target_matcher),
                Arc::clone(&config.impression_storage),
            ))
        });

        let deliver_processor = Arc::new(InAppMessageDeliverProcessor::new(
            activity_tracker.clone(),
            workspace_store.clone(),
            current_user.clone(),
            Arc::clone(&eligibility_evaluator),
            InAppMessagePresentProcessor::new(
                config.layout_resolver,
                config.presenter,
                ImpressionRecorder::new(config.impression_storage, config.max_impressions),
            ),
        ));

        let delay_manager = Arc::new(InAppMessageDelayManager::new(
            InAppMessageDelayScheduler::new(Arc::clone(&clock), scheduler),
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

        let manager = InAppMessageManager::new(
            InAppMessageTriggerProcessor::new(
                Arc::clone(&clock),
                workspace_store.clone(),
                InAppMessageTriggerDeterminer::new(config.target_matcher),
                eligibility_evaluator,
                schedule_processor.clone(),
            ),
            InAppMessageResetProcessor::new(delay_manager.clone()),
        );

        let event_listeners = ListenerRegistry::<dyn UserEventListener>::new();
        event_listeners.add(manager.clone(), 0);
        let user_listeners = ListenerRegistry::<dyn UserListener>::new();
        user_listeners.add(manager, 0);

        Ok(Client {
            clock,
            current_user,
            workspace_store,
            activity_tracker,
            delay_manager,
            event_listeners,
            user_listeners,
            _schedule_processor: schedule_processor,
        })
    }

    /// Track `event` for the current user. Triggered in-app messages are presented or delayed.
    pub fn track(&self, event: Event) {
        let event = UserEvent::track(event, self.current_user.resolve(), self.clock.now());
        log::trace!(target: "inapp",
                    event_key = event.event.key.as_str(),
                    insert_id = event.insert_id.as_str();
                    "tracking event");
        self.event_listeners.for_each(|listener| listener.on_event(&event));
    }

    /// Returns the current user.
    pub fn user(&self) -> User {
        self.current_user.resolve()
    }

    /// Replace the current user.
    ///
    /// Pending delayed messages are cancelled if the new user is a different person.
    pub fn set_user(&self, user: User) {
        let old_user = self.current_user.replace(user.clone());
        self.user_listeners
            .for_each(|listener| listener.on_user_updated(&old_user, &user));
    }

    /// Replace the workspace. Schedules already in flight see the new workspace when delivered.
    pub fn set_workspace(&self, workspace: Workspace) {
        self.workspace_store.set_workspace(Arc::new(workspace));
    }

    /// Slot the host feeds with its lifecycle callbacks. Messages are only delivered while an
    /// activity is resumed.
    pub fn activity_tracker(&self) -> &ActivityTracker {
        &self.activity_tracker
    }

    /// Number of delayed messages waiting for their timer.
    pub fn pending_delays(&self) -> usize {
        self.delay_manager.len()
    }

    /// Register a listener notified of every tracked event. Lower priorities run first; the
    /// in-app message pipeline is registered with priority 0.
    pub fn add_event_listener(&self, listener: Arc<dyn UserEventListener>, priority: i32) {
        self.event_listeners.add(listener, priority);
    }

    /// Register a listener notified of user changes.
    pub fn add_user_listener(&self, listener: Arc<dyn UserListener>, priority: i32) {
        self.user_listeners.add(listener, priority);
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.delay_manager.cancel_all();
    }
}

fn default_scheduler() -> Result<TokioScheduler> {
    TokioScheduler::current().or_else(|_| TokioScheduler::start())
}
