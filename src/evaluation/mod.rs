//! Eligibility and layout evaluation of in-app messages.
//!
//! The pipeline treats both evaluators as black boxes behind the
//! [`InAppMessageEligibilityEvaluator`] and [`InAppMessageLayoutResolver`] traits. Default
//! implementations cover status, period, audience targeting, frequency caps, and A/B variant
//! selection.
use serde::{Deserialize, Serialize};

use crate::{
    clock::Timestamp,
    user::User,
    workspace::{InAppMessage, Message, Workspace},
    Attributes, Result,
};

mod eligibility;
mod layout;

pub use eligibility::DefaultEligibilityEvaluator;
pub use layout::DefaultLayoutResolver;

/// Why a message was (or wasn't) considered eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum DecisionReason {
    InAppMessageTarget,
    OverriddenUser,
    InAppMessageDraft,
    InAppMessagePaused,
    NotInInAppMessagePeriod,
    NotInInAppMessageTarget,
    InAppMessageFrequencyCapped,
}

/// Result of an eligibility evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InAppMessageEvaluation {
    #[allow(missing_docs)]
    pub is_eligible: bool,
    #[allow(missing_docs)]
    pub reason: DecisionReason,
}

impl InAppMessageEvaluation {
    #[allow(missing_docs)]
    pub fn eligible(reason: DecisionReason) -> InAppMessageEvaluation {
        InAppMessageEvaluation {
            is_eligible: true,
            reason,
        }
    }

    #[allow(missing_docs)]
    pub fn ineligible(reason: DecisionReason) -> InAppMessageEvaluation {
        InAppMessageEvaluation {
            is_eligible: false,
            reason,
        }
    }
}

/// Decides whether a user may see an in-app message right now.
pub trait InAppMessageEligibilityEvaluator: Send + Sync {
    /// Evaluate `in_app_message` for `user` at `timestamp`.
    fn evaluate(
        &self,
        workspace: &Workspace,
        in_app_message: &InAppMessage,
        user: &User,
        timestamp: Timestamp,
    ) -> Result<InAppMessageEvaluation>;
}

/// Final content to present.
#[derive(Debug, Clone, PartialEq)]
pub struct InAppMessageLayout {
    #[allow(missing_docs)]
    pub message: Message,
    /// Variation chosen by the message experiment, if any.
    pub variation_key: Option<String>,
    /// Properties describing the resolution (experiment and variation keys).
    pub properties: Attributes,
}

/// Resolves which message variant a user sees.
pub trait InAppMessageLayoutResolver: Send + Sync {
    #[allow(missing_docs)]
    fn resolve(
        &self,
        workspace: &Workspace,
        in_app_message: &InAppMessage,
        user: &User,
    ) -> Result<InAppMessageLayout>;
}
