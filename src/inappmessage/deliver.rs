//! Last-moment checks before a message is handed to the presenter.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    clock::Timestamp,
    evaluation::{DecisionReason, InAppMessageEligibilityEvaluator, InAppMessageEvaluation},
    lifecycle::{ActivityProvider, ActivityState},
    user::{IdentifierChecker, Identifiers, UserResolver},
    workspace::WorkspaceFetcher,
    Attributes, Result,
};

use super::{
    present::{InAppMessagePresentProcessor, InAppMessagePresentRequest, InAppMessagePresentResponse},
    schedule::InAppMessageScheduleRequest,
};

/// Property holding the key of the event that triggered the dispatch.
pub const TRIGGER_EVENT_KEY_PROPERTY: &str = "trigger_event_key";
/// Property holding the insert id of the event that triggered the dispatch.
pub const TRIGGER_EVENT_INSERT_ID_PROPERTY: &str = "trigger_event_insert_id";

#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct InAppMessageDeliverRequest {
    pub dispatch_id: String,
    pub in_app_message_key: i64,
    /// Identifiers captured when the schedule was created.
    pub identifiers: Identifiers,
    pub requested_at: Timestamp,
    /// Trigger-time decision reason.
    pub reason: DecisionReason,
    pub properties: Attributes,
}

impl InAppMessageDeliverRequest {
    /// Build a deliver request for the schedule of `request`.
    pub fn of(request: &InAppMessageScheduleRequest) -> InAppMessageDeliverRequest {
        let schedule = &request.schedule;
        let properties = Attributes::from([
            (
                TRIGGER_EVENT_KEY_PROPERTY.to_owned(),
                schedule.event_based_context.event.key.as_str().into(),
            ),
            (
                TRIGGER_EVENT_INSERT_ID_PROPERTY.to_owned(),
                schedule.event_based_context.insert_id.as_str().into(),
            ),
        ]);
        InAppMessageDeliverRequest {
            dispatch_id: schedule.dispatch_id.clone(),
            in_app_message_key: schedule.in_app_message_key,
            identifiers: schedule.identifiers.clone(),
            requested_at: request.requested_at,
            reason: schedule.reason,
            properties,
        }
    }
}

/// Outcome of a delivery attempt. Every code except `Present` names the check that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum InAppMessageDeliverResponseCode {
    ActivityInactive,
    WorkspaceNotFound,
    InAppMessageNotFound,
    IdentifierChanged,
    Ineligible,
    Present,
    Exception,
}

#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct InAppMessageDeliverResponse {
    pub dispatch_id: String,
    pub in_app_message_key: i64,
    pub code: InAppMessageDeliverResponseCode,
    /// Set when the message was presented.
    pub present_response: Option<InAppMessagePresentResponse>,
}

impl InAppMessageDeliverResponse {
    fn of(
        request: &InAppMessageDeliverRequest,
        code: InAppMessageDeliverResponseCode,
    ) -> InAppMessageDeliverResponse {
        InAppMessageDeliverResponse {
            dispatch_id: request.dispatch_id.clone(),
            in_app_message_key: request.in_app_message_key,
            code,
            present_response: None,
        }
    }

    fn present(
        request: &InAppMessageDeliverRequest,
        present_response: InAppMessagePresentResponse,
    ) -> InAppMessageDeliverResponse {
        InAppMessageDeliverResponse {
            present_response: Some(present_response),
            ..Self::of(request, InAppMessageDeliverResponseCode::Present)
        }
    }
}

/// Re-validates a dispatch right before presentation.
///
/// A delayed dispatch may run minutes after it was triggered, so the app state, the configuration
/// and the user are all checked again. The first failing check determines the response code.
pub struct InAppMessageDeliverProcessor {
    activity_provider: Arc<dyn ActivityProvider>,
    workspace_fetcher: Arc<dyn WorkspaceFetcher>,
    user_resolver: Arc<dyn UserResolver>,
    identifier_checker: IdentifierChecker,
    eligibility_evaluator: Arc<dyn InAppMessageEligibilityEvaluator>,
    present_processor: InAppMessagePresentProcessor,
}

impl InAppMessageDeliverProcessor {
    #[allow(missing_docs)]
    pub fn new(
        activity_provider: Arc<dyn ActivityProvider>,
        workspace_fetcher: Arc<dyn WorkspaceFetcher>,
        user_resolver: Arc<dyn UserResolver>,
        eligibility_evaluator: Arc<dyn InAppMessageEligibilityEvaluator>,
        present_processor: InAppMessagePresentProcessor,
    ) -> InAppMessageDeliverProcessor {
        InAppMessageDeliverProcessor {
            activity_provider,
            workspace_fetcher,
            user_resolver,
            identifier_checker: IdentifierChecker,
            eligibility_evaluator,
            present_processor,
        }
    }

    /// Deliver the dispatch of `request`. Errors are logged and reported as
    /// [`InAppMessageDeliverResponseCode::Exception`].
    pub fn process(&self, request: InAppMessageDeliverRequest) -> InAppMessageDeliverResponse {
        match self.deliver(&request) {
            Ok(response) => {
                log::debug!(target: "inapp",
                            dispatch_id = response.dispatch_id.as_str(),
                            in_app_message_key = response.in_app_message_key,
                            code:serde = response.code;
                            "in-app message deliver processed");
                response
            }
            Err(err) => {
                log::error!(target: "inapp",
                            dispatch_id = request.dispatch_id.as_str(),
                            in_app_message_key = request.in_app_message_key;
                            "failed to deliver in-app message: {err}");
                InAppMessageDeliverResponse::of(&request, InAppMessageDeliverResponseCode::Exception)
            }
        }
    }

    /// Run the delivery checks in order and present the message if all of them pass.
    ///
    /// # Errors
    ///
    /// Fails if eligibility evaluation or layout resolution fails.
    pub fn deliver(&self, request: &InAppMessageDeliverRequest) -> Result<InAppMessageDeliverResponse> {
        use InAppMessageDeliverResponseCode::*;

        if self.activity_provider.current_state() != ActivityState::Active {
            return Ok(InAppMessageDeliverResponse::of(request, ActivityInactive));
        }

        let Some(workspace) = self.workspace_fetcher.fetch() else {
            return Ok(InAppMessageDeliverResponse::of(request, WorkspaceNotFound));
        };

        let Some(in_app_message) = workspace.get_in_app_message(request.in_app_message_key) else {
            return Ok(InAppMessageDeliverResponse::of(request, InAppMessageNotFound));
        };

        let user = self.user_resolver.resolve();
        if self
            .identifier_checker
            .is_identifier_changed(&request.identifiers, &user.resolve_identifiers())
        {
            return Ok(InAppMessageDeliverResponse::of(request, IdentifierChanged));
        }

        let evaluation = if in_app_message.evaluate_context.at_deliver_time {
            self.eligibility_evaluator.evaluate(
                &workspace,
                in_app_message,
                &user,
                request.requested_at,
            )?
        } else {
            InAppMessageEvaluation::eligible(request.reason)
        };
        if !evaluation.is_eligible {
            log::debug!(target: "inapp",
                        dispatch_id = request.dispatch_id.as_str(),
                        reason:serde = evaluation.reason;
                        "in-app message no longer eligible");
            return Ok(InAppMessageDeliverResponse::of(request, Ineligible));
        }

        let present_response = self.present_processor.process(InAppMessagePresentRequest {
            dispatch_id: request.dispatch_id.clone(),
            in_app_message: in_app_message.clone(),
            workspace: Arc::clone(&workspace),
            user,
            requested_at: request.requested_at,
            reason: evaluation.reason,
            properties: request.properties.clone(),
        })?;

        Ok(InAppMessageDeliverResponse::present(request, present_response))
    }
}
