use std::sync::Arc;

use crate::{
    inappmessage::{
        delay::InAppMessageDelayManager,
        deliver::{InAppMessageDeliverProcessor, InAppMessageDeliverRequest},
    },
    Error, Result,
};

use super::{
    InAppMessageScheduleAction, InAppMessageScheduleRequest, InAppMessageScheduleResponse,
    InAppMessageScheduleType,
};

/// Carries out a [`InAppMessageScheduleAction`] for one [`InAppMessageScheduleType`].
///
/// Implementations provide `deliver`, `delay` and `ignore`. Dispatching on the action is shared by
/// [`InAppMessageScheduler::schedule`].
pub trait InAppMessageScheduler: Send + Sync {
    /// Returns `true` if this scheduler handles requests of `schedule_type`.
    fn supports(&self, schedule_type: InAppMessageScheduleType) -> bool;

    #[allow(missing_docs)]
    fn deliver(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageScheduleResponse>;

    #[allow(missing_docs)]
    fn delay(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageScheduleResponse>;

    #[allow(missing_docs)]
    fn ignore(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageScheduleResponse>;

    /// Perform `action` for `request`.
    fn schedule(
        &self,
        action: InAppMessageScheduleAction,
        request: &InAppMessageScheduleRequest,
    ) -> Result<InAppMessageScheduleResponse> {
        match action {
            InAppMessageScheduleAction::Deliver => self.deliver(request),
            InAppMessageScheduleAction::Delay => self.delay(request),
            InAppMessageScheduleAction::Ignore => self.ignore(request),
        }
    }
}

/// Handles schedules coming straight from a trigger.
pub struct TriggeredInAppMessageScheduler {
    deliver_processor: Arc<InAppMessageDeliverProcessor>,
    delay_manager: Arc<InAppMessageDelayManager>,
}

impl TriggeredInAppMessageScheduler {
    #[allow(missing_docs)]
    pub fn new(
        deliver_processor: Arc<InAppMessageDeliverProcessor>,
        delay_manager: Arc<InAppMessageDelayManager>,
    ) -> TriggeredInAppMessageScheduler {
        TriggeredInAppMessageScheduler {
            deliver_processor,
            delay_manager,
        }
    }
}

impl InAppMessageScheduler for TriggeredInAppMessageScheduler {
    fn supports(&self, schedule_type: InAppMessageScheduleType) -> bool {
        schedule_type == InAppMessageScheduleType::Triggered
    }

    fn deliver(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageScheduleResponse> {
        let response = self
            .deliver_processor
            .process(InAppMessageDeliverRequest::of(request));
        Ok(InAppMessageScheduleResponse::deliver(request, response))
    }

    fn delay(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageScheduleResponse> {
        let delay = self.delay_manager.register_and_delay(request)?;
        Ok(InAppMessageScheduleResponse::delay(request, delay))
    }

    fn ignore(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageScheduleResponse> {
        Ok(InAppMessageScheduleResponse::ignore(request))
    }
}

/// Handles schedules whose delay timer fired.
///
/// Delivering or ignoring removes the delay entry of the dispatch.
pub struct DelayedInAppMessageScheduler {
    deliver_processor: Arc<InAppMessageDeliverProcessor>,
    delay_manager: Arc<InAppMessageDelayManager>,
}

impl DelayedInAppMessageScheduler {
    #[allow(missing_docs)]
    pub fn new(
        deliver_processor: Arc<InAppMessageDeliverProcessor>,
        delay_manager: Arc<InAppMessageDelayManager>,
    ) -> DelayedInAppMessageScheduler {
        DelayedInAppMessageScheduler {
            deliver_processor,
            delay_manager,
        }
    }
}

impl InAppMessageScheduler for DelayedInAppMessageScheduler {
    fn supports(&self, schedule_type: InAppMessageScheduleType) -> bool {
        schedule_type == InAppMessageScheduleType::Delayed
    }

    /// # Errors
    ///
    /// - [`Error::DelayNotFound`] if no delay is registered for the dispatch.
    fn deliver(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageScheduleResponse> {
        self.delay_manager
            .delete(request)
            .ok_or_else(|| Error::DelayNotFound {
                dispatch_id: request.dispatch_id().to_owned(),
            })?;

        let response = self
            .deliver_processor
            .process(InAppMessageDeliverRequest::of(request));
        Ok(InAppMessageScheduleResponse::deliver(request, response))
    }

    fn delay(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageScheduleResponse> {
        let delay = self.delay_manager.delay(request)?;
        Ok(InAppMessageScheduleResponse::delay(request, delay))
    }

    fn ignore(&self, request: &InAppMessageScheduleRequest) -> Result<InAppMessageScheduleResponse> {
        self.delay_manager.delete(request);
        Ok(InAppMessageScheduleResponse::ignore(request))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::{DelayedInAppMessageScheduler, InAppMessageScheduler, TriggeredInAppMessageScheduler};
    use crate::{
        inappmessage::{
            deliver::InAppMessageDeliverResponseCode,
            schedule::{
                InAppMessageScheduleAction, InAppMessageScheduleRequest,
                InAppMessageScheduleResponseCode, InAppMessageScheduleType,
            },
            test_support::{delay_manager, deliver_processor, schedule, FakeScheduler},
        },
        test_support::{in_app_message, now},
        Error,
    };

    fn request(
        schedule_type: InAppMessageScheduleType,
        deliver_in_millis: i64,
    ) -> InAppMessageScheduleRequest {
        InAppMessageScheduleRequest::new(
            schedule(42, now() + Duration::milliseconds(deliver_in_millis)),
            schedule_type,
            now(),
        )
    }

    fn schedulers() -> (
        TriggeredInAppMessageScheduler,
        DelayedInAppMessageScheduler,
        Arc<FakeScheduler>,
    ) {
        let deliver_processor = Arc::new(deliver_processor(vec![in_app_message(42)]));
        let (delay_manager, scheduler) = delay_manager();
        let delay_manager = Arc::new(delay_manager);
        (
            TriggeredInAppMessageScheduler::new(deliver_processor.clone(), delay_manager.clone()),
            DelayedInAppMessageScheduler::new(deliver_processor, delay_manager),
            scheduler,
        )
    }

    #[test]
    fn each_scheduler_supports_one_type() {
        let (triggered, delayed, _) = schedulers();

        assert!(triggered.supports(InAppMessageScheduleType::Triggered));
        assert!(!triggered.supports(InAppMessageScheduleType::Delayed));
        assert!(delayed.supports(InAppMessageScheduleType::Delayed));
        assert!(!delayed.supports(InAppMessageScheduleType::Triggered));
    }

    #[test]
    fn triggered_deliver_presents() {
        let (triggered, _, _) = schedulers();
        let request = request(InAppMessageScheduleType::Triggered, 0);

        let response = triggered
            .schedule(InAppMessageScheduleAction::Deliver, &request)
            .unwrap();

        assert_eq!(response.code, InAppMessageScheduleResponseCode::Deliver);
        assert_eq!(response.dispatch_id, request.schedule.dispatch_id);
        assert_eq!(
            response.deliver_response.map(|it| it.code),
            Some(InAppMessageDeliverResponseCode::Present)
        );
    }

    #[test]
    fn triggered_delay_registers_task() {
        let (triggered, _, scheduler) = schedulers();
        let request = request(InAppMessageScheduleType::Triggered, 5000);

        let response = triggered
            .schedule(InAppMessageScheduleAction::Delay, &request)
            .unwrap();

        assert_eq!(response.code, InAppMessageScheduleResponseCode::Delay);
        assert_eq!(response.delay.map(|it| it.delay_millis()), Some(5000));
        assert_eq!(scheduler.delays(), vec![std::time::Duration::from_millis(5000)]);
    }

    #[test]
    fn triggered_ignore() {
        let (triggered, _, scheduler) = schedulers();
        let request = request(InAppMessageScheduleType::Triggered, -120_000);

        let response = triggered
            .schedule(InAppMessageScheduleAction::Ignore, &request)
            .unwrap();

        assert_eq!(response.code, InAppMessageScheduleResponseCode::Ignore);
        assert!(scheduler.delays().is_empty());
    }

    #[test]
    fn delayed_deliver_requires_registered_delay() {
        let (_, delayed, _) = schedulers();
        let request = request(InAppMessageScheduleType::Delayed, 0);

        let result = delayed.schedule(InAppMessageScheduleAction::Deliver, &request);

        assert!(
            matches!(&result, Err(Error::DelayNotFound { dispatch_id }) if dispatch_id == request.dispatch_id()),
            "{result:?}"
        );
    }

    #[test]
    fn delayed_deliver_removes_delay_and_presents() {
        let (triggered, delayed, scheduler) = schedulers();
        let triggered_request = request(InAppMessageScheduleType::Triggered, 5000);
        triggered
            .schedule(InAppMessageScheduleAction::Delay, &triggered_request)
            .unwrap();
        scheduler.complete_all();

        let delayed_request = InAppMessageScheduleRequest::new(
            triggered_request.schedule.clone(),
            InAppMessageScheduleType::Delayed,
            now() + Duration::milliseconds(5000),
        );
        let response = delayed
            .schedule(InAppMessageScheduleAction::Deliver, &delayed_request)
            .unwrap();

        assert_eq!(response.code, InAppMessageScheduleResponseCode::Deliver);
        assert_eq!(
            response.deliver_response.map(|it| it.code),
            Some(InAppMessageDeliverResponseCode::Present)
        );
        // delivering again finds no delay
        assert!(delayed
            .schedule(InAppMessageScheduleAction::Deliver, &delayed_request)
            .is_err());
    }

    #[test]
    fn delayed_delay_redelays_completed_task() {
        let (triggered, delayed, scheduler) = schedulers();
        let triggered_request = request(InAppMessageScheduleType::Triggered, 5000);
        triggered
            .schedule(InAppMessageScheduleAction::Delay, &triggered_request)
            .unwrap();

        // timer fired early, e.g. the clock moved backwards
        scheduler.complete_all();
        let delayed_request = InAppMessageScheduleRequest::new(
            triggered_request.schedule.clone(),
            InAppMessageScheduleType::Delayed,
            now() + Duration::milliseconds(1000),
        );
        let response = delayed
            .schedule(InAppMessageScheduleAction::Delay, &delayed_request)
            .unwrap();

        assert_eq!(response.code, InAppMessageScheduleResponseCode::Delay);
        assert_eq!(
            scheduler.delays(),
            vec![
                std::time::Duration::from_millis(5000),
                std::time::Duration::from_millis(4000)
            ]
        );
    }

    #[test]
    fn delayed_delay_fails_while_task_pending() {
        let (triggered, delayed, _) = schedulers();
        let triggered_request = request(InAppMessageScheduleType::Triggered, 5000);
        triggered
            .schedule(InAppMessageScheduleAction::Delay, &triggered_request)
            .unwrap();

        let result = delayed.schedule(InAppMessageScheduleAction::Delay, &triggered_request);

        assert!(matches!(result, Err(Error::DelayInProgress { .. })), "{result:?}");
    }

    #[test]
    fn delayed_ignore_removes_delay() {
        let (triggered, delayed, _) = schedulers();
        let triggered_request = request(InAppMessageScheduleType::Triggered, 5000);
        triggered
            .schedule(InAppMessageScheduleAction::Delay, &triggered_request)
            .unwrap();

        let response = delayed
            .schedule(InAppMessageScheduleAction::Ignore, &triggered_request)
            .unwrap();

        assert_eq!(response.code, InAppMessageScheduleResponseCode::Ignore);
        assert!(delayed
            .schedule(InAppMessageScheduleAction::Deliver, &triggered_request)
            .is_err());
    }
}
