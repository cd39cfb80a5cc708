use crate::{
    sharder::{Md5Sharder, Sharder},
    user::User,
    workspace::{InAppMessage, Workspace},
    Attributes, Error, Result,
};

use super::{InAppMessageLayout, InAppMessageLayoutResolver};

/// Picks the experiment variation (if the message runs an A/B test) and the message in the
/// default language.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLayoutResolver;

impl DefaultLayoutResolver {
    fn resolve_variation(&self, in_app_message: &InAppMessage, user: &User) -> Option<(i64, String)> {
        let experiment = in_app_message.message_context.experiment.as_ref()?;
        if experiment.variations.is_empty() {
            return None;
        }
        let identifiers = user.resolve_identifiers();
        let identifier = identifiers.get(&experiment.identifier_type)?;
        let shard = Md5Sharder.get_shard(
            format!("{}-{}", experiment.key, identifier),
            experiment.variations.len() as u64,
        );
        let variation = experiment.variations.get(shard as usize)?;
        Some((experiment.key, variation.clone()))
    }
}

impl InAppMessageLayoutResolver for DefaultLayoutResolver {
    fn resolve(
        &self,
        _workspace: &Workspace,
        in_app_message: &InAppMessage,
        user: &User,
    ) -> Result<InAppMessageLayout> {
        let context = &in_app_message.message_context;
        let variation = self.resolve_variation(in_app_message, user);
        let variation_key = variation.as_ref().map(|(_, key)| key.clone());

        let message = context
            .messages
            .iter()
            .find(|message| {
                message.lang == context.default_lang && message.variation_key == variation_key
            })
            .ok_or(Error::MessageNotResolved {
                in_app_message_key: in_app_message.key,
            })?;

        let mut properties = Attributes::new();
        if let Some((experiment_key, variation_key)) = variation {
            properties.insert("experiment_key".to_owned(), experiment_key.into());
            properties.insert("variation_key".to_owned(), variation_key.into());
        }

        Ok(InAppMessageLayout {
            message: message.clone(),
            variation_key,
            properties,
        })
    }
}
