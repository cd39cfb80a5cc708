use super::InAppMessageScheduleRequest;

/// What to do with a schedule request right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InAppMessageScheduleAction {
    /// Delivery time has arrived (or passed within the grace period).
    Deliver,
    /// Delivery time is in the future.
    Delay,
    /// Delivery time passed too long ago.
    Ignore,
}

/// Maps the time left until delivery to an [`InAppMessageScheduleAction`].
#[derive(Debug, Default, Clone, Copy)]
pub struct InAppMessageScheduleActionDeterminer;

impl InAppMessageScheduleActionDeterminer {
    /// How late a schedule may still be delivered.
    pub const DELIVER_GRACE_PERIOD_MILLIS: i64 = 60_000;

    /// - `delay > 0` => [`Delay`](InAppMessageScheduleAction::Delay)
    /// - `-60s <= delay <= 0` => [`Deliver`](InAppMessageScheduleAction::Deliver)
    /// - `delay < -60s` => [`Ignore`](InAppMessageScheduleAction::Ignore)
    pub fn determine(&self, request: &InAppMessageScheduleRequest) -> InAppMessageScheduleAction {
        match request.delay_millis() {
            delay if delay > 0 => InAppMessageScheduleAction::Delay,
            delay if delay >= -Self::DELIVER_GRACE_PERIOD_MILLIS => {
                InAppMessageScheduleAction::Deliver
            }
            _ => InAppMessageScheduleAction::Ignore,
        }
    }
}
