use std::sync::Arc;

use crate::{
    clock::{Clock, SystemClock},
    evaluation::{DefaultLayoutResolver, InAppMessageEligibilityEvaluator, InAppMessageLayoutResolver},
    inappmessage::{InAppMessagePresenter, NoopPresenter},
    scheduler::Scheduler,
    storage::{ImpressionRecorder, ImpressionStorage, MemoryImpressionStorage},
    target::{RuleTargetMatcher, TargetMatcher},
    user::User,
    Client, Result,
};

/// Configuration for [`Client`].
///
/// Every collaborator has a default, so only the pieces the host provides need to be set. At
/// minimum, a presenter should be registered: the default one discards every message.
///
/// # Examples
/// ```
/// # use inapp_messaging::{ClientConfig, User};
/// # let runtime = tokio::runtime::Runtime::new().unwrap();
/// # let _guard = runtime.enter();
/// let client = ClientConfig::new()
///     .user(User::with_device_id("device-1"))
///     .presenter(|context: &inapp_messaging::InAppMessagePresentationContext| {
///         println!("{:?}", context.message);
///     })
///     .to_client()
///     .unwrap();
/// ```
pub struct ClientConfig {
    pub(crate) user: User,
    pub(crate) presenter: Arc<dyn InAppMessagePresenter>,
    pub(crate) impression_storage: Arc<dyn ImpressionStorage>,
    pub(crate) eligibility_evaluator: Option<Arc<dyn InAppMessageEligibilityEvaluator>>,
    pub(crate) layout_resolver: Arc<dyn InAppMessageLayoutResolver>,
    pub(crate) target_matcher: Arc<dyn TargetMatcher>,
    pub(crate) scheduler: Option<Arc<dyn Scheduler>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) max_impressions: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            user: User::default(),
            presenter: Arc::new(NoopPresenter),
            impression_storage: Arc::new(MemoryImpressionStorage::new()),
            eligibility_evaluator: None,
            layout_resolver: Arc::new(DefaultLayoutResolver),
            target_matcher: Arc::new(RuleTargetMatcher),
            scheduler: None,
            clock: Arc::new(SystemClock),
            max_impressions: ImpressionRecorder::DEFAULT_MAX_IMPRESSIONS,
        }
    }
}

impl ClientConfig {
    /// Create a default configuration.
    pub fn new() -> Self {
        ClientConfig::default()
    }

    /// Set the user the client starts with.
    pub fn user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    /// Set presenter rendering in-app messages.
    ///
    /// ```
    /// # use inapp_messaging::{ClientConfig, InAppMessagePresentationContext};
    /// let config = ClientConfig::new().presenter(|context: &InAppMessagePresentationContext| {
    ///   println!("{:?}", context);
    /// });
    /// ```
    pub fn presenter(mut self, presenter: impl InAppMessagePresenter + 'static) -> Self {
        self.presenter = Arc::new(presenter);
        self
    }

    /// Set storage of impression history. Defaults to an in-memory storage.
    pub fn impression_storage(mut self, impression_storage: Arc<dyn ImpressionStorage>) -> Self {
        self.impression_storage = impression_storage;
        self
    }

    /// Override eligibility evaluation. Defaults to
    /// [`DefaultEligibilityEvaluator`](crate::evaluation::DefaultEligibilityEvaluator) over the
    /// configured target matcher and impression storage.
    pub fn eligibility_evaluator(
        mut self,
        eligibility_evaluator: Arc<dyn InAppMessageEligibilityEvaluator>,
    ) -> Self {
        self.eligibility_evaluator = Some(eligibility_evaluator);
        self
    }

    #[allow(missing_docs)]
    pub fn layout_resolver(mut self, layout_resolver: Arc<dyn InAppMessageLayoutResolver>) -> Self {
        self.layout_resolver = layout_resolver;
        self
    }

    #[allow(missing_docs)]
    pub fn target_matcher(mut self, target_matcher: Arc<dyn TargetMatcher>) -> Self {
        self.target_matcher = target_matcher;
        self
    }

    /// Set scheduler running delay timers.
    ///
    /// By default, the client uses the tokio runtime it is created in, or starts a dedicated one
    /// when created outside of a runtime.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[allow(missing_docs)]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of impressions kept per message for frequency capping.
    pub fn max_impressions(mut self, max_impressions: usize) -> Self {
        self.max_impressions = max_impressions;
        self
    }

    /// Create a new [`Client`] using the specified configuration.
    ///
    /// # Errors
    ///
    /// Fails if no scheduler was set and a dedicated runtime could not be started.
    pub fn to_client(self) -> Result<Client> {
        Client::new(self)
    }
}
