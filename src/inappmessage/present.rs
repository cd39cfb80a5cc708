//! Final stage: resolve the layout, hand it to the host presenter, record the impression.
use std::sync::Arc;

use serde::Serialize;

use crate::{
    clock::Timestamp,
    evaluation::{DecisionReason, InAppMessageLayoutResolver},
    storage::{ImpressionRecorder, InAppMessageImpression},
    user::{Identifiers, User},
    workspace::{InAppMessage, Message, Workspace},
    Attributes, Result,
};

/// Renders in-app messages. Implemented by the host UI layer.
pub trait InAppMessagePresenter: Send + Sync {
    /// Present the message described by `context`.
    ///
    /// # Errors
    ///
    /// This method should not return errors and should not panic. Rendering failures should be
    /// handled within the implementation.
    ///
    /// # Notes
    ///
    /// This method is called on the thread delivering the message (possibly a scheduler thread),
    /// so implementations should post rendering to the UI thread rather than block.
    fn present(&self, context: &InAppMessagePresentationContext);
}

pub(crate) struct NoopPresenter;
impl InAppMessagePresenter for NoopPresenter {
    fn present(&self, _context: &InAppMessagePresentationContext) {}
}

impl<T: Fn(&InAppMessagePresentationContext) + Send + Sync> InAppMessagePresenter for T {
    fn present(&self, context: &InAppMessagePresentationContext) {
        self(context);
    }
}

/// Everything the presenter needs to render a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InAppMessagePresentationContext {
    #[allow(missing_docs)]
    pub dispatch_id: String,
    #[allow(missing_docs)]
    pub in_app_message_key: i64,
    /// Resolved content.
    pub message: Message,
    /// Experiment variation the user was bucketed into, if any.
    pub variation_key: Option<String>,
    /// Identifiers of the user the message is presented to.
    pub identifiers: Identifiers,
    #[allow(missing_docs)]
    pub decision_reason: DecisionReason,
    /// Trigger and layout properties.
    pub properties: Attributes,
}

#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct InAppMessagePresentRequest {
    pub dispatch_id: String,
    pub workspace: Arc<Workspace>,
    pub in_app_message: InAppMessage,
    pub user: User,
    pub requested_at: Timestamp,
    pub reason: DecisionReason,
    pub properties: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct InAppMessagePresentResponse {
    pub dispatch_id: String,
    pub context: InAppMessagePresentationContext,
}

/// Resolves the layout, invokes the presenter, and records an impression.
pub struct InAppMessagePresentProcessor {
    layout_resolver: Arc<dyn InAppMessageLayoutResolver>,
    presenter: Arc<dyn InAppMessagePresenter>,
    recorder: ImpressionRecorder,
}

impl InAppMessagePresentProcessor {
    #[allow(missing_docs)]
    pub fn new(
        layout_resolver: Arc<dyn InAppMessageLayoutResolver>,
        presenter: Arc<dyn InAppMessagePresenter>,
        recorder: ImpressionRecorder,
    ) -> InAppMessagePresentProcessor {
        InAppMessagePresentProcessor {
            layout_resolver,
            presenter,
            recorder,
        }
    }

    /// Present the message of `request`.
    ///
    /// The impression is recorded once the presenter was invoked, whatever the rendering outcome:
    /// it reflects the decision to present.
    ///
    /// # Errors
    ///
    /// Fails if the layout cannot be resolved. Nothing is presented or recorded in that case.
    pub fn process(&self, request: InAppMessagePresentRequest) -> Result<InAppMessagePresentResponse> {
        let layout = self.layout_resolver.resolve(
            &request.workspace,
            &request.in_app_message,
            &request.user,
        )?;

        let mut properties = request.properties;
        properties.extend(layout.properties);

        let context = InAppMessagePresentationContext {
            dispatch_id: request.dispatch_id.clone(),
            in_app_message_key: request.in_app_message.key,
            message: layout.message,
            variation_key: layout.variation_key,
            identifiers: request.user.resolve_identifiers(),
            decision_reason: request.reason,
            properties,
        };

        self.presenter.present(&context);
        log::debug!(target: "inapp",
                    dispatch_id = context.dispatch_id.as_str(),
                    in_app_message_key = context.in_app_message_key;
                    "in-app message presented");

        self.recorder.record(
            &request.in_app_message,
            InAppMessageImpression {
                identifiers: context.identifiers.clone(),
                timestamp: request.requested_at,
            },
        );

        Ok(InAppMessagePresentResponse {
            dispatch_id: request.dispatch_id,
            context,
        })
    }
}
