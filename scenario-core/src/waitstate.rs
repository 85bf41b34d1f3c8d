use crate::deferred::DeferredActions;
use crate::delegate::WaitstateInfo;
use crate::scenario::{ProcessScenario, WaitstateAction};
use crate::types::*;

/// Where a waitstate's action comes from.
pub(crate) enum ActionSource {
    /// Registered ahead of time; taken from the registry at execution.
    Deferred,
    /// Resolved through the scenario's per-kind lookup.
    Resolved(WaitstateAction),
}

/// An immutable snapshot of one blocked point in one process instance.
///
/// Waitstates are ephemeral: recomputed every scheduling cycle, never
/// persisted. `end_time` is the timer's due time for timer-backed waits and
/// the current virtual clock value for everything else.
pub struct Waitstate {
    pub info: WaitstateInfo,
    pub end_time: Timestamp,
    /// Backing timer job, present only for timer waitstates.
    pub job_id: Option<String>,
    pub(crate) action: Option<ActionSource>,
}

impl Waitstate {
    /// Materialize a waitstate from an engine wait marker.
    ///
    /// The deferred registry wins over the scenario lookup; its action is
    /// only *checked* here and consumed when the waitstate executes, so an
    /// unselected waitstate reappears intact next cycle.
    pub(crate) fn materialize(
        instance_id: InstanceId,
        marker: WaitMarker,
        now: Timestamp,
        deferred: &DeferredActions,
        scenario: &dyn ProcessScenario,
    ) -> Option<Waitstate> {
        if !marker.kind.is_waitstate() {
            return None;
        }
        let action = if deferred.contains(&marker.activity_id) {
            Some(ActionSource::Deferred)
        } else {
            Self::lookup(marker.kind, &marker.activity_id, scenario).map(ActionSource::Resolved)
        };
        Some(Waitstate {
            end_time: marker.due_time.unwrap_or(now),
            job_id: marker.job_id,
            info: WaitstateInfo {
                instance_id,
                id: marker.id,
                activity_id: marker.activity_id,
                activity_name: marker.activity_name,
                kind: marker.kind,
            },
            action,
        })
    }

    fn lookup(
        kind: ActivityKind,
        activity_id: &str,
        scenario: &dyn ProcessScenario,
    ) -> Option<WaitstateAction> {
        match kind {
            ActivityKind::TimerIntermediateEvent => scenario
                .waits_at_timer_intermediate_event(activity_id)
                .map(WaitstateAction::Timer),
            ActivityKind::ReceiveTask => scenario
                .waits_at_receive_task(activity_id)
                .map(WaitstateAction::ReceiveTask),
            ActivityKind::UserTask => scenario
                .waits_at_user_task(activity_id)
                .map(WaitstateAction::UserTask),
            ActivityKind::EventBasedGateway => scenario
                .acts_on_event_based_gateway(activity_id)
                .map(WaitstateAction::EventBasedGateway),
            ActivityKind::CallActivity => scenario
                .runs_call_activity(activity_id)
                .map(WaitstateAction::CallActivity),
            _ => None,
        }
    }

    /// Timer waitstates fire their backing job during execution even without
    /// a registered action; for every other kind an absent action means the
    /// scenario intentionally leaves the block unresolved.
    pub fn is_timer(&self) -> bool {
        self.info.kind == ActivityKind::TimerIntermediateEvent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::act;
    use uuid::Uuid;

    struct GatewayOnly;

    impl ProcessScenario for GatewayOnly {
        fn acts_on_event_based_gateway(
            &self,
            _activity_id: &str,
        ) -> Option<crate::scenario::EventBasedGatewayAction> {
            Some(act(|_g: crate::delegate::EventBasedGatewayDelegate| async {
                Ok(())
            }))
        }
    }

    fn marker(kind: ActivityKind, due: Option<Timestamp>) -> WaitMarker {
        WaitMarker {
            id: "a1".into(),
            activity_id: "Activity".into(),
            activity_name: None,
            kind,
            due_time: due,
            job_id: due.map(|_| "job-1".to_string()),
        }
    }

    #[test]
    fn timer_end_time_is_due_time() {
        let ws = Waitstate::materialize(
            Uuid::now_v7(),
            marker(ActivityKind::TimerIntermediateEvent, Some(7_200_000)),
            500,
            &DeferredActions::new(),
            &GatewayOnly,
        )
        .unwrap();
        assert_eq!(ws.end_time, 7_200_000);
        assert!(ws.is_timer());
        assert!(ws.action.is_none());
    }

    #[test]
    fn non_timer_end_time_is_clock_now() {
        let ws = Waitstate::materialize(
            Uuid::now_v7(),
            marker(ActivityKind::EventBasedGateway, None),
            500,
            &DeferredActions::new(),
            &GatewayOnly,
        )
        .unwrap();
        assert_eq!(ws.end_time, 500);
        assert!(matches!(
            ws.action,
            Some(ActionSource::Resolved(WaitstateAction::EventBasedGateway(_)))
        ));
    }

    #[test]
    fn deferred_registration_wins_without_consuming() {
        let mut deferred = DeferredActions::new();
        deferred.register(
            "Activity",
            WaitstateAction::EventBasedGateway(act(
                |_g: crate::delegate::EventBasedGatewayDelegate| async { Ok(()) },
            )),
        );
        let ws = Waitstate::materialize(
            Uuid::now_v7(),
            marker(ActivityKind::EventBasedGateway, None),
            0,
            &deferred,
            &GatewayOnly,
        )
        .unwrap();
        assert!(matches!(ws.action, Some(ActionSource::Deferred)));
        // Still registered; consumption happens at execution.
        assert!(deferred.contains("Activity"));
    }

    #[test]
    fn non_wait_kinds_are_skipped() {
        assert!(Waitstate::materialize(
            Uuid::now_v7(),
            marker(ActivityKind::ServiceTask, None),
            0,
            &DeferredActions::new(),
            &GatewayOnly,
        )
        .is_none());
    }
}
