use crate::delegate::{
    EventBasedGatewayDelegate, EventSubscriptionDelegate, TimerDelegate, UserTaskDelegate,
};
use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future used by action closures (same shape `async-trait` produces).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An action invoked when execution waits at an activity of kind `D`.
/// The delegate is handed over by value; it is a cheap handle.
pub type Action<D> = Box<dyn Fn(D) -> BoxFuture<'static, Result<()>> + Send + Sync>;

pub type TimerAction = Action<TimerDelegate>;
pub type ReceiveTaskAction = Action<EventSubscriptionDelegate>;
pub type UserTaskAction = Action<UserTaskDelegate>;
pub type EventBasedGatewayAction = Action<EventBasedGatewayDelegate>;

/// Box an async closure into an [`Action`].
///
/// ```ignore
/// fn waits_at_user_task(&self, _: &str) -> Option<UserTaskAction> {
///     Some(act(|task: UserTaskDelegate| async move { task.complete().await }))
/// }
/// ```
pub fn act<D, F, Fut>(f: F) -> Action<D>
where
    D: 'static,
    F: Fn(D) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Box::new(move |delegate| Box::pin(f(delegate)))
}

/// A resolved action for one waitstate, tagged by activity kind.
pub enum WaitstateAction {
    Timer(TimerAction),
    ReceiveTask(ReceiveTaskAction),
    UserTask(UserTaskAction),
    EventBasedGateway(EventBasedGatewayAction),
    /// Child observer for the sub-process spawned by a call activity.
    CallActivity(Arc<dyn ProcessScenario>),
}

impl WaitstateAction {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            WaitstateAction::Timer(_) => "timer",
            WaitstateAction::ReceiveTask(_) => "receive task",
            WaitstateAction::UserTask(_) => "user task",
            WaitstateAction::EventBasedGateway(_) => "event-based gateway",
            WaitstateAction::CallActivity(_) => "call activity",
        }
    }
}

/// The test author's side of a scenario: lifecycle observer plus per-kind
/// action lookup.
///
/// Every method has a no-op / `None` default, so an implementation only
/// spells out what it observes or acts on. Lookups returning `None` leave
/// the blocked point unresolved.
#[allow(unused_variables)]
pub trait ProcessScenario: Send + Sync {
    // ── Lifecycle notifications ──

    fn has_started(&self, activity_id: &str) {}
    fn has_finished(&self, activity_id: &str) {}
    fn has_completed(&self, activity_id: &str) {}
    fn has_canceled(&self, activity_id: &str) {}

    // ── Action lookup, one case per waitstate kind ──

    fn waits_at_timer_intermediate_event(&self, activity_id: &str) -> Option<TimerAction> {
        None
    }

    fn waits_at_receive_task(&self, activity_id: &str) -> Option<ReceiveTaskAction> {
        None
    }

    fn waits_at_user_task(&self, activity_id: &str) -> Option<UserTaskAction> {
        None
    }

    fn acts_on_event_based_gateway(
        &self,
        activity_id: &str,
    ) -> Option<EventBasedGatewayAction> {
        None
    }

    /// Observer for the sub-process a call activity spawns. `None` leaves
    /// the sub-process undriven and the call activity blocked.
    fn runs_call_activity(&self, activity_id: &str) -> Option<Arc<dyn ProcessScenario>> {
        None
    }
}
