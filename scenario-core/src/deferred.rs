use crate::scenario::WaitstateAction;
use std::collections::HashMap;

/// Actions registered for an activity id before the engine has reached it.
///
/// Presence is consulted every time a waitstate is materialized, so an
/// early-registered action is never lost to the per-kind scenario lookup;
/// the action itself is taken exactly once, when its waitstate executes.
#[derive(Default)]
pub struct DeferredActions {
    actions: HashMap<String, WaitstateAction>,
}

impl DeferredActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action for an activity id. Replaces a previous registration.
    pub fn register(&mut self, activity_id: impl Into<String>, action: WaitstateAction) {
        self.actions.insert(activity_id.into(), action);
    }

    pub fn contains(&self, activity_id: &str) -> bool {
        self.actions.contains_key(activity_id)
    }

    /// Consume the action registered for an activity id.
    pub fn take(&mut self, activity_id: &str) -> Option<WaitstateAction> {
        self.actions.remove(activity_id)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::act;

    #[test]
    fn take_consumes_exactly_once() {
        let mut deferred = DeferredActions::new();
        deferred.register(
            "UserTask",
            WaitstateAction::UserTask(act(|task: crate::delegate::UserTaskDelegate| {
                let _ = task;
                async { Ok(()) }
            })),
        );
        assert!(deferred.contains("UserTask"));
        assert!(deferred.take("UserTask").is_some());
        assert!(!deferred.contains("UserTask"));
        assert!(deferred.take("UserTask").is_none());
        assert!(deferred.is_empty());
    }
}
