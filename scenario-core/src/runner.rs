use crate::deferred::DeferredActions;
use crate::engine::ProcessEngine;
use crate::error::ScenarioError;
use crate::scenario::{BoxFuture, ProcessScenario, WaitstateAction};
use crate::types::*;
use crate::waitstate::Waitstate;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// User-supplied instance starter, for starts the builder shortcuts don't cover.
pub type ProcessStarter = Box<
    dyn Fn(Arc<dyn ProcessEngine>) -> BoxFuture<'static, Result<InstanceId>> + Send + Sync,
>;

/// Box an async closure into a [`ProcessStarter`].
pub fn starter<F, Fut>(f: F) -> ProcessStarter
where
    F: Fn(Arc<dyn ProcessEngine>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<InstanceId>> + Send + 'static,
{
    Box::new(move |engine| Box::pin(f(engine)))
}

/// How a runner obtains its process instance.
pub(crate) enum StartSpec {
    ByKey {
        process_key: String,
        variables: Variables,
        overrides: Vec<StartOverride>,
    },
    ByMessage {
        message: String,
        variables: Variables,
    },
    ByStarter(ProcessStarter),
}

impl StartSpec {
    pub(crate) fn label(&self) -> String {
        match self {
            StartSpec::ByKey { process_key, .. } => process_key.clone(),
            StartSpec::ByMessage { message, .. } => format!("message '{message}'"),
            StartSpec::ByStarter(_) => "starter".to_string(),
        }
    }

    pub(crate) fn overrides(&self) -> &[StartOverride] {
        match self {
            StartSpec::ByKey { overrides, .. } => overrides,
            _ => &[],
        }
    }
}

/// One process instance's viewpoint: startup, waitstate discovery, competing
/// timers, and lifecycle-notification bookkeeping.
///
/// Created once per instance: for each configured top-level scenario and,
/// dynamically, for every call-activity sub-process encountered mid-run.
pub struct Runner {
    engine: Arc<dyn ProcessEngine>,
    scenario: Arc<dyn ProcessScenario>,
    start: Option<StartSpec>,
    instance: Option<InstanceId>,
    /// Historic record ids already reported as started / finished.
    started: HashSet<String>,
    finished: HashSet<String>,
    /// Waitstate ids already resolved; never executed twice.
    executed: HashSet<String>,
    deferred: DeferredActions,
    /// Copied from the capability probe; when false, completed/canceled
    /// notifications are skipped for the whole run.
    distinguishes_canceled: bool,
    label: String,
}

impl Runner {
    /// A top-level runner that will start its own instance.
    pub(crate) fn new(
        engine: Arc<dyn ProcessEngine>,
        scenario: Arc<dyn ProcessScenario>,
        start: StartSpec,
        deferred: DeferredActions,
        distinguishes_canceled: bool,
    ) -> Self {
        let label = start.label();
        Self {
            engine,
            scenario,
            start: Some(start),
            instance: None,
            started: HashSet::new(),
            finished: HashSet::new(),
            executed: HashSet::new(),
            deferred,
            distinguishes_canceled,
            label,
        }
    }

    /// A nested runner bound to an already-running sub-process instance.
    pub(crate) fn bound(
        engine: Arc<dyn ProcessEngine>,
        scenario: Arc<dyn ProcessScenario>,
        instance: InstanceId,
        label: String,
        distinguishes_canceled: bool,
    ) -> Self {
        Self {
            engine,
            scenario,
            start: None,
            instance: Some(instance),
            started: HashSet::new(),
            finished: HashSet::new(),
            executed: HashSet::new(),
            deferred: DeferredActions::new(),
            distinguishes_canceled,
            label,
        }
    }

    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    /// Start the backing instance exactly once. A runner already bound to a
    /// running instance is a no-op.
    pub async fn start_if_needed(&mut self) -> Result<InstanceId> {
        if let Some(instance) = self.instance {
            return Ok(instance);
        }
        let start = self.start.as_ref().ok_or_else(|| {
            anyhow::Error::from(ScenarioError::Configuration(
                "runner has neither a start strategy nor a bound instance".into(),
            ))
        })?;
        let instance = match start {
            StartSpec::ByKey {
                process_key,
                variables,
                overrides,
            } => {
                self.engine
                    .start_by_key(process_key, variables.clone(), overrides)
                    .await?
            }
            StartSpec::ByMessage { message, variables } => {
                self.engine.start_by_message(message, variables.clone()).await?
            }
            StartSpec::ByStarter(starter) => starter(self.engine.clone()).await?,
        };
        self.instance = Some(instance);
        Ok(instance)
    }

    /// All of this runner's currently pending waitstates, minus the ones
    /// already resolved. May return several, e.g. for parallel branches.
    pub async fn pending_waitstates(&self, now: Timestamp) -> Result<Vec<Waitstate>> {
        let Some(instance) = self.instance else {
            return Ok(Vec::new());
        };
        let markers = self.engine.wait_markers(instance).await?;
        Ok(markers
            .into_iter()
            .filter(|m| !self.executed.contains(&m.id))
            .filter_map(|m| {
                Waitstate::materialize(instance, m, now, &self.deferred, self.scenario.as_ref())
            })
            .collect())
    }

    /// Pending timers of this runner's instance due strictly before `before`.
    /// Used only during fast-forward.
    pub async fn competing_timers(&self, before: Timestamp) -> Result<Vec<TimerJob>> {
        let Some(instance) = self.instance else {
            return Ok(Vec::new());
        };
        let timers = self.engine.pending_timers(instance).await?;
        Ok(timers.into_iter().filter(|t| t.due_time < before).collect())
    }

    /// Record a resolved waitstate id. Atomic with execution from the
    /// scheduler's point of view; nothing runs between the action returning
    /// and this call.
    pub(crate) fn mark_executed(&mut self, waitstate_id: &str) {
        self.executed.insert(waitstate_id.to_string());
    }

    pub(crate) fn take_deferred(&mut self, activity_id: &str) -> Option<WaitstateAction> {
        self.deferred.take(activity_id)
    }

    /// Diff historic activity records against the sets already reported and
    /// emit the missing notifications. Idempotent; called after every
    /// instance start and after every waitstate execution.
    ///
    /// For each record: `has_started` fires at most once and always precedes
    /// `has_finished`; `has_completed`/`has_canceled` follow `has_finished`
    /// only while the engine distinguishes the two outcomes.
    pub async fn sync_lifecycle(&mut self) -> Result<()> {
        let Some(instance) = self.instance else {
            return Ok(());
        };
        let records = self.engine.historic_activities(instance).await?;
        for record in records {
            if !self.started.contains(&record.id) {
                self.scenario.has_started(&record.activity_id);
                self.started.insert(record.id.clone());
            }
            if record.end_time.is_some() && !self.finished.contains(&record.id) {
                self.scenario.has_finished(&record.activity_id);
                if self.distinguishes_canceled {
                    if record.canceled.unwrap_or(false) {
                        self.scenario.has_canceled(&record.activity_id);
                    } else {
                        self.scenario.has_completed(&record.activity_id);
                    }
                }
                self.finished.insert(record.id);
            }
        }
        Ok(())
    }
}
