use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use crate::user::{IdentifierChecker, User};

use super::delay::InAppMessageDelayManager;

/// Drops pending delays when the user changes, so no message reaches the wrong person.
pub struct InAppMessageResetProcessor {
    identifier_checker: IdentifierChecker,
    delay_manager: Arc<InAppMessageDelayManager>,
}

impl InAppMessageResetProcessor {
    #[allow(missing_docs)]
    pub fn new(delay_manager: Arc<InAppMessageDelayManager>) -> InAppMessageResetProcessor {
        InAppMessageResetProcessor {
            identifier_checker: IdentifierChecker,
            delay_manager,
        }
    }

    /// Cancel every pending delay if `new_user` is a different person than `old_user`.
    ///
    /// Never panics into the caller: failures are logged.
    pub fn process(&self, old_user: &User, new_user: &User) {
        let result = catch_unwind(AssertUnwindSafe(|| self.reset(old_user, new_user)));
        if result.is_err() {
            log::error!(target: "inapp", "failed to reset in-app message delays on user change");
        }
    }

    fn reset(&self, old_user: &User, new_user: &User) {
        if !self.identifier_checker.is_identifier_changed(
            &old_user.resolve_identifiers(),
            &new_user.resolve_identifiers(),
        ) {
            return;
        }
        let cancelled = self.delay_manager.cancel_all();
        log::debug!(target: "inapp",
                    cancelled = cancelled.len();
                    "user changed, pending in-app messages cancelled");
    }
}
