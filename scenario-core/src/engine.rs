use crate::error::ScenarioError;
use crate::types::*;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The external process engine, specified only at its interface boundary.
///
/// The scheduler drives an arbitrary engine exclusively through this trait.
/// Every call is awaited before the next scheduling decision is made, so a
/// conforming implementation needs no internal ordering guarantees beyond
/// answering each call against its current state.
#[async_trait]
pub trait ProcessEngine: Send + Sync {
    /// Feature availability. Probed once per scenario execution.
    fn capabilities(&self) -> EngineCapabilities;

    // ── Instance startup ──

    /// Start an instance by process definition key. `overrides` selects
    /// explicit start activities and requires
    /// [`EngineCapabilities::start_activity_override`].
    async fn start_by_key(
        &self,
        process_key: &str,
        variables: Variables,
        overrides: &[StartOverride],
    ) -> Result<InstanceId>;

    /// Start an instance by message start event name.
    async fn start_by_message(&self, message: &str, variables: Variables)
        -> Result<InstanceId>;

    // ── Queries ──

    /// Currently blocked points of one instance.
    async fn wait_markers(&self, instance_id: InstanceId) -> Result<Vec<WaitMarker>>;

    /// Historic activity records of one instance, in discovery order.
    async fn historic_activities(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<HistoricActivity>>;

    /// Pending timer jobs of one instance.
    async fn pending_timers(&self, instance_id: InstanceId) -> Result<Vec<TimerJob>>;

    /// Message event subscriptions of one instance.
    async fn event_subscriptions(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<EventSubscription>>;

    /// The sub-process instance spawned by a call activity, identified by the
    /// call activity's wait marker id. `None` while no child exists.
    async fn call_activity_instance(
        &self,
        instance_id: InstanceId,
        marker_id: &str,
    ) -> Result<Option<InstanceId>>;

    // ── Triggers ──

    /// Execute one specific timer job. The engine's due-time comparison is
    /// strict (`now > due`), so callers nudge the clock past the due time first.
    async fn execute_job(&self, job_id: &str) -> Result<()>;

    /// Correlate a message against one blocked instance.
    async fn correlate_message(
        &self,
        instance_id: InstanceId,
        message: &str,
        variables: Variables,
    ) -> Result<()>;

    /// Complete a user task identified by its wait marker id.
    async fn complete_task(
        &self,
        instance_id: InstanceId,
        marker_id: &str,
        variables: Variables,
    ) -> Result<()>;

    // ── Clock ──

    /// Assign the engine's notion of "current time".
    async fn set_time(&self, time: Timestamp) -> Result<()>;

    /// Read the engine's notion of "current time".
    async fn current_time(&self) -> Result<Timestamp>;
}

// ─── Engine registry ──────────────────────────────────────────

/// Named registration of available engines.
///
/// A builder without an explicitly selected engine resolves against a
/// registry; anything but exactly one registered engine is a configuration
/// error, raised before any instance starts.
#[derive(Default)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn ProcessEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under a name. Replaces any previous registration.
    pub fn register(&mut self, name: impl Into<String>, engine: Arc<dyn ProcessEngine>) {
        self.engines.insert(name.into(), engine);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProcessEngine>> {
        self.engines.get(name).cloned()
    }

    /// Resolve the single registered engine.
    pub fn single(&self) -> Result<Arc<dyn ProcessEngine>, ScenarioError> {
        match self.engines.len() {
            1 => Ok(self.engines.values().next().cloned().unwrap()),
            0 => Err(ScenarioError::Configuration(
                "no process engine registered".into(),
            )),
            n => Err(ScenarioError::Configuration(format!(
                "{n} process engines registered; select one explicitly"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_memory::MemoryEngine;

    #[test]
    fn registry_resolution() {
        let mut registry = EngineRegistry::new();
        assert!(matches!(
            registry.single(),
            Err(ScenarioError::Configuration(_))
        ));

        registry.register("default", Arc::new(MemoryEngine::new()));
        assert!(registry.single().is_ok());
        assert!(registry.get("default").is_some());

        registry.register("second", Arc::new(MemoryEngine::new()));
        assert!(matches!(
            registry.single(),
            Err(ScenarioError::Configuration(_))
        ));
    }
}
