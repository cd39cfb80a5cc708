use crate::{Error, Result};

use super::{
    InAppMessageScheduleActionDeterminer, InAppMessageScheduleListener, InAppMessageScheduleRequest,
    InAppMessageScheduleResponse, InAppMessageScheduleType, InAppMessageScheduler,
};

/// Picks the scheduler handling a schedule type.
pub struct InAppMessageSchedulerFactory {
    schedulers: Vec<Box<dyn InAppMessageScheduler>>,
}

impl InAppMessageSchedulerFactory {
    #[allow(missing_docs)]
    pub fn new(schedulers: Vec<Box<dyn InAppMessageScheduler>>) -> InAppMessageSchedulerFactory {
        InAppMessageSchedulerFactory { schedulers }
    }

    /// Returns the scheduler supporting `schedule_type`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedScheduleType`] if no scheduler supports it.
    /// - [`Error::AmbiguousScheduleType`] if more than one scheduler claims it.
    pub fn get(&self, schedule_type: InAppMessageScheduleType) -> Result<&dyn InAppMessageScheduler> {
        let mut supporting = self
            .schedulers
            .iter()
            .filter(|scheduler| scheduler.supports(schedule_type));
        let scheduler = supporting
            .next()
            .ok_or(Error::UnsupportedScheduleType(schedule_type))?;
        if supporting.next().is_some() {
            return Err(Error::AmbiguousScheduleType(schedule_type));
        }
        Ok(scheduler.as_ref())
    }
}

/// Entry point of every schedule request, triggered or delayed.
pub struct InAppMessageScheduleProcessor {
    action_determiner: InAppMessageScheduleActionDeterminer,
    scheduler_factory: InAppMessageSchedulerFactory,
}

impl InAppMessageScheduleProcessor {
    #[allow(missing_docs)]
    pub fn new(scheduler_factory: InAppMessageSchedulerFactory) -> InAppMessageScheduleProcessor {
        InAppMessageScheduleProcessor {
            action_determiner: InAppMessageScheduleActionDeterminer,
            scheduler_factory,
        }
    }

    /// Process `request`. Never fails: errors are logged and reported as
    /// [`Exception`](super::InAppMessageScheduleResponseCode::Exception).
    pub fn process(&self, request: InAppMessageScheduleRequest) -> InAppMessageScheduleResponse {
        match self.schedule(&request) {
            Ok(response) => response,
            Err(err) => {
                log::error!(target: "inapp",
                            dispatch_id = request.dispatch_id(),
                            in_app_message_key = request.schedule.in_app_message_key,
                            schedule_type:serde = request.schedule_type;
                            "failed to schedule in-app message: {err}");
                InAppMessageScheduleResponse::exception(&request)
            }
        }
    }

    /// Determine the action for `request` and perform it with the matching scheduler.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedScheduleType`] or [`Error::AmbiguousScheduleType`] if not exactly one
    ///   scheduler handles the request type.
    /// - [`Error::DelayInProgress`] and [`Error::DelayNotFound`] from the delay bookkeeping.
    pub fn schedule(
        &self,
        request: &InAppMessageScheduleRequest,
    ) -> Result<InAppMessageScheduleResponse> {
        let action = self.action_determiner.determine(request);
        let scheduler = self.scheduler_factory.get(request.schedule_type)?;
        let response = scheduler.schedule(action, request)?;

        log::debug!(target: "inapp",
                    dispatch_id = request.dispatch_id(),
                    in_app_message_key = request.schedule.in_app_message_key,
                    schedule_type:serde = request.schedule_type,
                    code:serde = response.code;
                    "in-app message scheduled");
        Ok(response)
    }
}

impl InAppMessageScheduleListener for InAppMessageScheduleProcessor {
    fn on_schedule(&self, request: InAppMessageScheduleRequest) {
        self.process(request);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Weak};

    use chrono::Duration;

    use super::{InAppMessageScheduleProcessor, InAppMessageSchedulerFactory};
    use crate::{
        clock::ManualClock,
        inappmessage::{
            delay::{InAppMessageDelayManager, InAppMessageDelayScheduler},
            deliver::InAppMessageDeliverResponseCode,
            schedule::{
                DelayedInAppMessageScheduler, InAppMessageScheduleListener,
                InAppMessageScheduleRequest, InAppMessageScheduleResponseCode,
                InAppMessageScheduleType, TriggeredInAppMessageScheduler,
            },
            test_support::{delay_manager, deliver_processor, schedule, FakeScheduler},
        },
        test_support::{in_app_message, now},
        Error,
    };

    struct Fixture {
        processor: Arc<InAppMessageScheduleProcessor>,
        delay_manager: Arc<InAppMessageDelayManager>,
        scheduler: Arc<FakeScheduler>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let deliver_processor = Arc::new(deliver_processor(vec![in_app_message(42)]));
        let clock = Arc::new(ManualClock::new(now()));
        let scheduler = Arc::new(FakeScheduler::default());
        let delay_manager = Arc::new(InAppMessageDelayManager::new(
            InAppMessageDelayScheduler::new(clock.clone(), scheduler.clone()),
        ));
        let processor = Arc::new(InAppMessageScheduleProcessor::new(
            InAppMessageSchedulerFactory::new(vec![
                Box::new(TriggeredInAppMessageScheduler::new(
                    deliver_processor.clone(),
                    delay_manager.clone(),
                )),
                Box::new(DelayedInAppMessageScheduler::new(
                    deliver_processor,
                    delay_manager.clone(),
                )),
            ]),
        ));
        let listener: Weak<dyn InAppMessageScheduleListener> = Arc::downgrade(&processor) as _;
        delay_manager.scheduler().set_listener(listener);
        Fixture {
            processor,
            delay_manager,
            scheduler,
            clock,
        }
    }

    fn triggered(deliver_in_millis: i64) -> InAppMessageScheduleRequest {
        InAppMessageScheduleRequest::new(
            schedule(42, now() + Duration::milliseconds(deliver_in_millis)),
            InAppMessageScheduleType::Triggered,
            now(),
        )
    }

    #[test]
    fn delivers_due_schedule() {
        let fixture = fixture();
        let request = triggered(0);

        let response = fixture.processor.process(request.clone());

        assert_eq!(response.code, InAppMessageScheduleResponseCode::Deliver);
        let deliver_response = response.deliver_response.unwrap();
        assert_eq!(deliver_response.code, InAppMessageDeliverResponseCode::Present);
        assert_eq!(
            deliver_response.present_response.unwrap().dispatch_id,
            request.schedule.dispatch_id
        );
    }

    #[test]
    fn delays_future_schedule_and_delivers_when_fired() {
        let fixture = fixture();

        let response = fixture.processor.process(triggered(5000));
        assert_eq!(response.code, InAppMessageScheduleResponseCode::Delay);
        assert_eq!(fixture.delay_manager.len(), 1);

        fixture.clock.advance_millis(5000);
        fixture.scheduler.fire_all();

        // the delayed request found its delay and removed it
        assert!(fixture.delay_manager.is_empty());
        assert_eq!(fixture.scheduler.delays().len(), 1);
    }

    #[test]
    fn early_fire_delays_again() {
        let fixture = fixture();
        fixture.processor.process(triggered(5000));

        fixture.clock.advance_millis(3000);
        fixture.scheduler.fire_all();

        assert_eq!(fixture.delay_manager.len(), 1);
        assert_eq!(
            fixture.scheduler.delays(),
            vec![
                std::time::Duration::from_millis(5000),
                std::time::Duration::from_millis(2000)
            ]
        );

        fixture.clock.advance_millis(2000);
        fixture.scheduler.fire_all();
        assert!(fixture.delay_manager.is_empty());
    }

    #[test]
    fn ignores_stale_schedule() {
        let fixture = fixture();

        let response = fixture.processor.process(triggered(-60_001));

        assert_eq!(response.code, InAppMessageScheduleResponseCode::Ignore);
        assert_eq!(response.deliver_response, None);
        assert!(fixture.delay_manager.is_empty());
    }

    #[test]
    fn missing_scheduler_is_an_exception() {
        let (delay_manager, _) = delay_manager();
        let processor = InAppMessageScheduleProcessor::new(InAppMessageSchedulerFactory::new(vec![
            Box::new(TriggeredInAppMessageScheduler::new(
                Arc::new(deliver_processor(vec![])),
                Arc::new(delay_manager),
            )),
        ]));
        let request = InAppMessageScheduleRequest::new(
            schedule(42, now()),
            InAppMessageScheduleType::Delayed,
            now(),
        );

        let result = processor.schedule(&request);
        assert!(
            matches!(result, Err(Error::UnsupportedScheduleType(InAppMessageScheduleType::Delayed))),
            "{result:?}"
        );

        let response = processor.process(request);
        assert_eq!(response.code, InAppMessageScheduleResponseCode::Exception);
    }

    #[test]
    fn schedule_type_claimed_twice_is_an_exception() {
        let (delay_manager, _) = delay_manager();
        let deliver_processor = Arc::new(deliver_processor(vec![in_app_message(42)]));
        let delay_manager = Arc::new(delay_manager);
        let processor = InAppMessageScheduleProcessor::new(InAppMessageSchedulerFactory::new(vec![
            Box::new(TriggeredInAppMessageScheduler::new(
                deliver_processor.clone(),
                delay_manager.clone(),
            )),
            Box::new(TriggeredInAppMessageScheduler::new(
                deliver_processor,
                delay_manager,
            )),
        ]));

        let result = processor.schedule(&triggered(0));
        assert!(
            matches!(result, Err(Error::AmbiguousScheduleType(InAppMessageScheduleType::Triggered))),
            "{result:?}"
        );

        assert_eq!(
            processor.process(triggered(0)).code,
            InAppMessageScheduleResponseCode::Exception
        );
    }

    #[test]
    fn delayed_request_without_delay_is_an_exception() {
        let processor = fixture().processor;
        let request = InAppMessageScheduleRequest::new(
            schedule(42, now()),
            InAppMessageScheduleType::Delayed,
            now(),
        );

        assert!(matches!(
            processor.schedule(&request),
            Err(Error::DelayNotFound { .. })
        ));
        assert_eq!(
            processor.process(request).code,
            InAppMessageScheduleResponseCode::Exception
        );
    }
}
