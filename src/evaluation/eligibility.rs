use std::sync::Arc;

use crate::{
    clock::{add_millis, Timestamp},
    storage::{ImpressionStorage, InAppMessageImpression},
    target::{TargetContext, TargetMatcher},
    user::{Identifiers, User},
    workspace::{FrequencyCap, InAppMessage, InAppMessageStatus, Workspace},
    Result,
};

use super::{DecisionReason, InAppMessageEligibilityEvaluator, InAppMessageEvaluation};

/// Checks, in order: override list, status, period, audience, frequency cap.
pub struct DefaultEligibilityEvaluator {
    target_matcher: Arc<dyn TargetMatcher>,
    impression_storage: Arc<dyn ImpressionStorage>,
}

impl DefaultEligibilityEvaluator {
    #[allow(missing_docs)]
    pub fn new(
        target_matcher: Arc<dyn TargetMatcher>,
        impression_storage: Arc<dyn ImpressionStorage>,
    ) -> DefaultEligibilityEvaluator {
        DefaultEligibilityEvaluator {
            target_matcher,
            impression_storage,
        }
    }

    fn is_overridden(&self, in_app_message: &InAppMessage, user: &User) -> bool {
        user.user_id.as_ref().is_some_and(|user_id| {
            in_app_message
                .target_context
                .overrides
                .iter()
                .any(|it| it == user_id)
        })
    }

    fn is_target(&self, in_app_message: &InAppMessage, user: &User) -> bool {
        let targets = &in_app_message.target_context.targets;
        if targets.is_empty() {
            return true;
        }
        let context = TargetContext { user, event: None };
        targets
            .iter()
            .any(|target| self.target_matcher.matches(&context, target))
    }

    fn is_frequency_capped(
        &self,
        in_app_message: &InAppMessage,
        user: &User,
        timestamp: Timestamp,
    ) -> Result<bool> {
        let Some(frequency_cap) = &in_app_message.event_trigger.frequency_cap else {
            return Ok(false);
        };
        let impressions = self.impression_storage.get(in_app_message.id)?;
        is_capped(
            frequency_cap,
            &impressions,
            &user.resolve_identifiers(),
            timestamp,
        )
    }
}

fn is_capped(
    frequency_cap: &FrequencyCap,
    impressions: &[InAppMessageImpression],
    identifiers: &Identifiers,
    timestamp: Timestamp,
) -> Result<bool> {
    let identifier_capped = frequency_cap.identifier_caps.iter().any(|cap| {
        let Some(identifier) = identifiers.get(&cap.identifier_type) else {
            return false;
        };
        let count = impressions
            .iter()
            .filter(|it| it.identifiers.get(&cap.identifier_type) == Some(identifier))
            .count();
        count >= cap.count
    });
    if identifier_capped {
        return Ok(true);
    }

    let Some(cap) = frequency_cap.duration_cap else {
        return Ok(false);
    };
    let since = add_millis(timestamp, cap.duration_millis.saturating_neg())?;
    let count = impressions
        .iter()
        .filter(|it| since <= it.timestamp && it.timestamp <= timestamp)
        .count();
    Ok(count >= cap.count)
}

impl InAppMessageEligibilityEvaluator for DefaultEligibilityEvaluator {
    fn evaluate(
        &self,
        _workspace: &Workspace,
        in_app_message: &InAppMessage,
        user: &User,
        timestamp: Timestamp,
    ) -> Result<InAppMessageEvaluation> {
        if self.is_overridden(in_app_message, user) {
            return Ok(InAppMessageEvaluation::eligible(
                DecisionReason::OverriddenUser,
            ));
        }

        match in_app_message.status {
            InAppMessageStatus::Draft => {
                return Ok(InAppMessageEvaluation::ineligible(
                    DecisionReason::InAppMessageDraft,
                ))
            }
            InAppMessageStatus::Paused => {
                return Ok(InAppMessageEvaluation::ineligible(
                    DecisionReason::InAppMessagePaused,
                ))
            }
            InAppMessageStatus::Active => {}
        }

        if !in_app_message.period.contains(timestamp) {
            return Ok(InAppMessageEvaluation::ineligible(
                DecisionReason::NotInInAppMessagePeriod,
            ));
        }

        if !self.is_target(in_app_message, user) {
            return Ok(InAppMessageEvaluation::ineligible(
                DecisionReason::NotInInAppMessageTarget,
            ));
        }

        if self.is_frequency_capped(in_app_message, user, timestamp)? {
            return Ok(InAppMessageEvaluation::ineligible(
                DecisionReason::InAppMessageFrequencyCapped,
            ));
        }

        Ok(InAppMessageEvaluation::eligible(
            DecisionReason::InAppMessageTarget,
        ))
    }
}
