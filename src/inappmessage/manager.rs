use std::sync::Arc;

use crate::{
    event::UserEvent,
    listeners::{UserEventListener, UserListener},
    user::User,
};

use super::{reset::InAppMessageResetProcessor, trigger::InAppMessageTriggerProcessor};

/// Bridges SDK notifications into the in-app message pipeline.
pub struct InAppMessageManager {
    trigger_processor: InAppMessageTriggerProcessor,
    reset_processor: InAppMessageResetProcessor,
}

impl InAppMessageManager {
    #[allow(missing_docs)]
    pub fn new(
        trigger_processor: InAppMessageTriggerProcessor,
        reset_processor: InAppMessageResetProcessor,
    ) -> Arc<InAppMessageManager> {
        Arc::new(InAppMessageManager {
            trigger_processor,
            reset_processor,
        })
    }
}

impl UserEventListener for InAppMessageManager {
    fn on_event(&self, event: &UserEvent) {
        self.trigger_processor.process(event);
    }
}

impl UserListener for InAppMessageManager {
    fn on_user_updated(&self, old_user: &User, new_user: &User) {
        self.reset_processor.process(old_user, new_user);
    }
}
