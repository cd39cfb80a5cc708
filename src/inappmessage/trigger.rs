//! Turning tracked events into schedules.
use std::sync::Arc;

use crate::{
    clock::Clock,
    evaluation::InAppMessageEligibilityEvaluator,
    event::UserEvent,
    target::{TargetContext, TargetMatcher},
    workspace::{EventTriggerRule, InAppMessage, WorkspaceFetcher},
};

use super::schedule::{
    InAppMessageSchedule, InAppMessageScheduleProcessor, InAppMessageScheduleRequest,
    InAppMessageScheduleResponse, InAppMessageScheduleType,
};

/// Finds the in-app messages triggered by an event.
pub struct InAppMessageTriggerDeterminer {
    target_matcher: Arc<dyn TargetMatcher>,
}

impl InAppMessageTriggerDeterminer {
    #[allow(missing_docs)]
    pub fn new(target_matcher: Arc<dyn TargetMatcher>) -> InAppMessageTriggerDeterminer {
        InAppMessageTriggerDeterminer { target_matcher }
    }

    /// Returns the messages having at least one trigger rule for the event key whose targets
    /// match. A rule without targets always matches.
    pub fn determine<'a>(
        &self,
        in_app_messages: &'a [InAppMessage],
        event: &UserEvent,
    ) -> Vec<&'a InAppMessage> {
        in_app_messages
            .iter()
            .filter(|in_app_message| {
                in_app_message
                    .event_trigger
                    .rules
                    .iter()
                    .any(|rule| self.is_triggered(rule, event))
            })
            .collect()
    }

    fn is_triggered(&self, rule: &EventTriggerRule, event: &UserEvent) -> bool {
        if rule.event_key != event.event.key {
            return false;
        }
        if rule.targets.is_empty() {
            return true;
        }
        let context = TargetContext {
            user: &event.user,
            event: Some(&event.event),
        };
        rule.targets
            .iter()
            .any(|target| self.target_matcher.matches(&context, target))
    }
}

/// Schedules every eligible message triggered by a tracked event.
pub struct InAppMessageTriggerProcessor {
    clock: Arc<dyn Clock>,
    workspace_fetcher: Arc<dyn WorkspaceFetcher>,
    trigger_determiner: InAppMessageTriggerDeterminer,
    eligibility_evaluator: Arc<dyn InAppMessageEligibilityEvaluator>,
    schedule_processor: Arc<InAppMessageScheduleProcessor>,
}

impl InAppMessageTriggerProcessor {
    #[allow(missing_docs)]
    pub fn new(
        clock: Arc<dyn Clock>,
        workspace_fetcher: Arc<dyn WorkspaceFetcher>,
        trigger_determiner: InAppMessageTriggerDeterminer,
        eligibility_evaluator: Arc<dyn InAppMessageEligibilityEvaluator>,
        schedule_processor: Arc<InAppMessageScheduleProcessor>,
    ) -> InAppMessageTriggerProcessor {
        InAppMessageTriggerProcessor {
            clock,
            workspace_fetcher,
            trigger_determiner,
            eligibility_evaluator,
            schedule_processor,
        }
    }

    /// Schedule the messages triggered by `event` and return one response per schedule.
    ///
    /// Messages that are ineligible at trigger time, or whose evaluation or scheduling fails, are
    /// skipped without affecting the other triggered messages.
    pub fn process(&self, event: &UserEvent) -> Vec<InAppMessageScheduleResponse> {
        let Some(workspace) = self.workspace_fetcher.fetch() else {
            log::warn!(target: "inapp",
                       event_key = event.event.key.as_str();
                       "event tracked before workspace is available");
            return Vec::new();
        };

        let mut responses = Vec::new();
        for in_app_message in self
            .trigger_determiner
            .determine(workspace.in_app_messages(), event)
        {
            let evaluation = match self.eligibility_evaluator.evaluate(
                &workspace,
                in_app_message,
                &event.user,
                event.timestamp,
            ) {
                Ok(evaluation) => evaluation,
                Err(err) => {
                    log::error!(target: "inapp",
                                in_app_message_key = in_app_message.key;
                                "failed to evaluate triggered in-app message: {err}");
                    continue;
                }
            };
            if !evaluation.is_eligible {
                log::trace!(target: "inapp",
                            in_app_message_key = in_app_message.key,
                            reason:serde = evaluation.reason;
                            "triggered in-app message is not eligible");
                continue;
            }

            let schedule =
                match InAppMessageSchedule::create(in_app_message, evaluation.reason, event) {
                    Ok(schedule) => schedule,
                    Err(err) => {
                        log::error!(target: "inapp",
                                    in_app_message_key = in_app_message.key;
                                    "failed to schedule triggered in-app message: {err}");
                        continue;
                    }
                };
            log::debug!(target: "inapp",
                        dispatch_id = schedule.dispatch_id.as_str(),
                        in_app_message_key = in_app_message.key,
                        event_key = event.event.key.as_str();
                        "in-app message triggered");
            let request = InAppMessageScheduleRequest::new(
                schedule,
                InAppMessageScheduleType::Triggered,
                self.clock.now(),
            );
            responses.push(self.schedule_processor.process(request));
        }
        responses
    }
}
