use crate::clock::VirtualClock;
use crate::deferred::DeferredActions;
use crate::delegate::{
    EventBasedGatewayDelegate, EventSubscriptionDelegate, TimerDelegate, UserTaskDelegate,
    WaitstateInfo,
};
use crate::engine::{EngineRegistry, ProcessEngine};
use crate::error::ScenarioError;
use crate::runner::{ProcessStarter, Runner, StartSpec};
use crate::scenario::{ProcessScenario, WaitstateAction};
use crate::types::*;
use crate::waitstate::{ActionSource, Waitstate};
use anyhow::anyhow;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ─── Entry point and builder ──────────────────────────────────

/// Entry point: `Scenario::run(observer).by_key("Process").engine(e).execute()`.
pub struct Scenario;

impl Scenario {
    pub fn run(scenario: Arc<dyn ProcessScenario>) -> ScenarioBuilder {
        ScenarioBuilder {
            engine: None,
            config_err: None,
            baseline: None,
            runs: vec![RunConfig::new(scenario)],
        }
    }
}

struct RunConfig {
    scenario: Arc<dyn ProcessScenario>,
    start: Option<StartSpec>,
    overrides: Vec<StartOverride>,
    deferred: DeferredActions,
}

impl RunConfig {
    fn new(scenario: Arc<dyn ProcessScenario>) -> Self {
        Self {
            scenario,
            start: None,
            overrides: Vec::new(),
            deferred: DeferredActions::new(),
        }
    }
}

/// Fluent configuration of one scenario execution. Start strategy methods
/// and `defer`/`from_*` apply to the most recently added scenario.
pub struct ScenarioBuilder {
    engine: Option<Arc<dyn ProcessEngine>>,
    /// First configuration mistake seen while chaining; surfaced by
    /// `execute` so builder methods stay infallible.
    config_err: Option<ScenarioError>,
    baseline: Option<Timestamp>,
    runs: Vec<RunConfig>,
}

impl ScenarioBuilder {
    fn current(&mut self) -> &mut RunConfig {
        self.runs.last_mut().expect("builder always holds one run")
    }

    /// Start the current scenario's instance by process definition key.
    pub fn by_key(mut self, process_key: impl Into<String>) -> Self {
        self.current().start = Some(StartSpec::ByKey {
            process_key: process_key.into(),
            variables: Variables::new(),
            overrides: Vec::new(),
        });
        self
    }

    /// Start the current scenario's instance by message start event name.
    pub fn by_message(mut self, message: impl Into<String>) -> Self {
        self.current().start = Some(StartSpec::ByMessage {
            message: message.into(),
            variables: Variables::new(),
        });
        self
    }

    /// Start the current scenario's instance through an explicit starter.
    pub fn by_starter(mut self, starter: ProcessStarter) -> Self {
        self.current().start = Some(StartSpec::ByStarter(starter));
        self
    }

    /// Initial variables carried into the instance start. Must follow the
    /// `by_key`/`by_message` call they belong to; a starter closure carries
    /// its own variables.
    pub fn with_variables(mut self, variables: Variables) -> Self {
        let applied = match &mut self.current().start {
            Some(StartSpec::ByKey { variables: v, .. })
            | Some(StartSpec::ByMessage { variables: v, .. }) => {
                *v = variables;
                true
            }
            _ => false,
        };
        if !applied {
            self.config_err.get_or_insert(ScenarioError::Configuration(
                "with_variables must follow a by_key or by_message start".into(),
            ));
        }
        self
    }

    /// Start execution before the given activity instead of the start event.
    pub fn from_before(mut self, activity_id: impl Into<String>) -> Self {
        self.current().overrides.push(StartOverride::Before(activity_id.into()));
        self
    }

    /// Start execution after the given activity.
    pub fn from_after(mut self, activity_id: impl Into<String>) -> Self {
        self.current().overrides.push(StartOverride::After(activity_id.into()));
        self
    }

    /// Register an action for an activity the engine has not reached yet.
    pub fn defer(mut self, activity_id: impl Into<String>, action: WaitstateAction) -> Self {
        self.current().deferred.register(activity_id, action);
        self
    }

    /// Add another top-level scenario to the same execution.
    pub fn and_run(mut self, scenario: Arc<dyn ProcessScenario>) -> Self {
        self.runs.push(RunConfig::new(scenario));
        self
    }

    /// Select the engine explicitly.
    pub fn engine(mut self, engine: Arc<dyn ProcessEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Resolve the engine from a registry; exactly one registration required.
    pub fn engine_registry(mut self, registry: &EngineRegistry) -> Self {
        match registry.single() {
            Ok(engine) => self.engine = Some(engine),
            Err(err) => {
                self.config_err.get_or_insert(err);
            }
        }
        self
    }

    /// Virtual clock baseline. Defaults to the engine's current time.
    pub fn starting_at(mut self, baseline: Timestamp) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Run the scenario to quiescence.
    pub async fn execute(self) -> Result<ScenarioRun, ScenarioError> {
        if let Some(err) = self.config_err {
            return Err(err);
        }
        let engine = self.engine.ok_or_else(|| {
            ScenarioError::Configuration("no process engine selected".into())
        })?;
        let caps = engine.capabilities();

        let mut runners = Vec::with_capacity(self.runs.len());
        for mut run in self.runs {
            let Some(mut start) = run.start.take() else {
                return Err(ScenarioError::Configuration(
                    "scenario has no start strategy (by_key / by_message / by_starter)".into(),
                ));
            };
            if !run.overrides.is_empty() {
                let StartSpec::ByKey { overrides, .. } = &mut start else {
                    return Err(ScenarioError::Configuration(
                        "from_before/from_after require a by_key start".into(),
                    ));
                };
                if !caps.start_activity_override {
                    return Err(ScenarioError::UnsupportedCapability(
                        "engine cannot start instances at explicitly selected activity ids"
                            .into(),
                    ));
                }
                *overrides = run.overrides;
            }
            runners.push(Runner::new(
                engine.clone(),
                run.scenario,
                start,
                run.deferred,
                caps.distinguishes_canceled,
            ));
        }

        let baseline = match self.baseline {
            Some(baseline) => baseline,
            None => engine
                .current_time()
                .await
                .map_err(ScenarioError::from_engine)?,
        };

        let executor = ScenarioExecutor {
            clock: VirtualClock::new(engine.clone()),
            engine,
            runners,
            distinguishes_canceled: caps.distinguishes_canceled,
        };
        executor.execute(baseline).await
    }
}

/// Result of one scenario execution.
#[derive(Debug)]
pub struct ScenarioRun {
    instance: Option<InstanceId>,
}

impl ScenarioRun {
    /// The last top-level instance started by the run.
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }
}

// ─── Scheduler ────────────────────────────────────────────────

/// Owns the runner set and the virtual clock; resolves every reachable
/// waitstate in non-decreasing virtual-time order.
struct ScenarioExecutor {
    engine: Arc<dyn ProcessEngine>,
    clock: VirtualClock,
    /// Grows mid-run: call-activity binding appends nested runners, and the
    /// loop re-reads this collection on every cycle.
    runners: Vec<Runner>,
    distinguishes_canceled: bool,
}

impl ScenarioExecutor {
    async fn execute(mut self, baseline: Timestamp) -> Result<ScenarioRun, ScenarioError> {
        self.clock
            .reset(baseline)
            .await
            .map_err(ScenarioError::from_engine)?;
        if !self.distinguishes_canceled {
            warn!(
                "engine cannot distinguish canceled from completed activities; \
                 has_completed/has_canceled notifications are disabled for this run"
            );
        }

        let mut last_instance = None;
        for i in 0..self.runners.len() {
            let instance = self.runners[i]
                .start_if_needed()
                .await
                .map_err(ScenarioError::from_engine)?;
            last_instance = Some(instance);
            self.runners[i]
                .sync_lifecycle()
                .await
                .map_err(ScenarioError::from_engine)?;
        }

        while let Some((idx, waitstate)) = self.next_waitstate().await? {
            if self.fast_forward(&waitstate).await? {
                self.execute_waitstate(idx, waitstate).await?;
            }
            // Not executable: an earlier competing timer fired instead; the
            // selection is discarded and discovery re-runs, since the firing
            // may have unblocked activities or spawned new runners.
        }

        for i in 0..self.runners.len() {
            self.runners[i]
                .sync_lifecycle()
                .await
                .map_err(ScenarioError::from_engine)?;
        }
        Ok(ScenarioRun {
            instance: last_instance,
        })
    }

    /// Merge every runner's pending waitstates and pick the earliest.
    /// Ties break by discovery order: runner registration order, then the
    /// engine's marker order. Stable within a run, not meaningful across runs.
    async fn next_waitstate(&mut self) -> Result<Option<(usize, Waitstate)>, ScenarioError> {
        let now = self.clock.now();
        let mut earliest: Option<(usize, Waitstate)> = None;
        for i in 0..self.runners.len() {
            let pending = self.runners[i]
                .pending_waitstates(now)
                .await
                .map_err(ScenarioError::from_engine)?;
            for waitstate in pending {
                let replace = match &earliest {
                    None => true,
                    Some((_, best)) => waitstate.end_time < best.end_time,
                };
                if replace {
                    earliest = Some((i, waitstate));
                }
            }
        }
        Ok(earliest)
    }

    /// Resolve timers that must fire strictly before the chosen waitstate's
    /// end time. Returns true when the waitstate may execute now.
    async fn fast_forward(&mut self, waitstate: &Waitstate) -> Result<bool, ScenarioError> {
        let mut competing: Option<TimerJob> = None;
        for i in 0..self.runners.len() {
            let timers = self.runners[i]
                .competing_timers(waitstate.end_time)
                .await
                .map_err(ScenarioError::from_engine)?;
            for timer in timers {
                let replace = match &competing {
                    None => true,
                    Some(best) => timer.due_time < best.due_time,
                };
                if replace {
                    competing = Some(timer);
                }
            }
        }
        match competing {
            Some(timer) => {
                debug!(
                    job_id = %timer.id,
                    due_time = timer.due_time,
                    "fast-forwarding past competing timer"
                );
                self.fire_timer_job(&timer.id, timer.due_time)
                    .await
                    .map_err(ScenarioError::from_engine)?;
                // The fired timer's transitions must be observed before any
                // later waitstate executes, not on that waitstate's own sync.
                for i in 0..self.runners.len() {
                    self.runners[i]
                        .sync_lifecycle()
                        .await
                        .map_err(ScenarioError::from_engine)?;
                }
                Ok(false)
            }
            None => {
                self.clock
                    .set(waitstate.end_time)
                    .await
                    .map_err(ScenarioError::from_engine)?;
                Ok(true)
            }
        }
    }

    /// Advance the clock one millisecond past the due time (the engine's
    /// due-time comparison is strict), execute the job, then snap back so
    /// subsequent lifecycle timestamps stay at the nominal due time.
    async fn fire_timer_job(&mut self, job_id: &str, due_time: Timestamp) -> anyhow::Result<()> {
        self.clock.set(due_time + 1).await?;
        self.engine.execute_job(job_id).await?;
        self.clock.set(due_time).await?;
        Ok(())
    }

    /// Execute one ready waitstate: run its action through a typed delegate,
    /// fire the backing timer job for timer waits, record the waitstate as
    /// executed, then sync lifecycle (owning runner first, then the rest).
    async fn execute_waitstate(
        &mut self,
        idx: usize,
        waitstate: Waitstate,
    ) -> Result<(), ScenarioError> {
        let is_timer = waitstate.is_timer();
        let action = match waitstate.action {
            None => None,
            Some(ActionSource::Deferred) => {
                self.runners[idx].take_deferred(&waitstate.info.activity_id)
            }
            Some(ActionSource::Resolved(action)) => Some(action),
        };
        let info = waitstate.info.clone();

        if let Some(action) = action {
            info!(
                kind = action.kind_name(),
                activity_name = info.activity_name.as_deref().unwrap_or(""),
                activity_id = %info.activity_id,
                process = self.runners[idx].label(),
                instance_id = %info.instance_id,
                "acting on waitstate"
            );
            match action {
                WaitstateAction::CallActivity(child_scenario) => {
                    self.bind_nested(&info, child_scenario)
                        .await
                        .map_err(ScenarioError::from_engine)?;
                }
                other => {
                    self.invoke(&info, other)
                        .await
                        .map_err(|e| ScenarioError::from_action(&info.activity_id, e))?;
                }
            }
        }

        if is_timer {
            let job_id = waitstate.job_id.as_deref().ok_or_else(|| {
                ScenarioError::Engine(anyhow!(
                    "timer waitstate '{}' reported without a backing job",
                    info.activity_id
                ))
            })?;
            self.fire_timer_job(job_id, waitstate.end_time)
                .await
                .map_err(ScenarioError::from_engine)?;
        }

        self.runners[idx].mark_executed(&waitstate.info.id);
        self.runners[idx]
            .sync_lifecycle()
            .await
            .map_err(ScenarioError::from_engine)?;
        for i in 0..self.runners.len() {
            if i != idx {
                self.runners[i]
                    .sync_lifecycle()
                    .await
                    .map_err(ScenarioError::from_engine)?;
            }
        }
        Ok(())
    }

    /// Invoke a non-call-activity action with its kind's delegate.
    async fn invoke(&self, info: &WaitstateInfo, action: WaitstateAction) -> anyhow::Result<()> {
        match action {
            WaitstateAction::Timer(f) => {
                let delegate = TimerDelegate { info: info.clone() };
                f(delegate).await
            }
            WaitstateAction::ReceiveTask(f) => {
                let subscriptions =
                    self.engine.event_subscriptions(info.instance_id).await?;
                let subscription = subscriptions
                    .into_iter()
                    .find(|s| s.activity_id == info.activity_id)
                    .ok_or_else(|| {
                        anyhow!(
                            "no event subscription for receive task '{}'",
                            info.activity_id
                        )
                    })?;
                let delegate = EventSubscriptionDelegate {
                    engine: self.engine.clone(),
                    info: info.clone(),
                    event_name: subscription.event_name,
                };
                f(delegate).await
            }
            WaitstateAction::UserTask(f) => {
                let delegate = UserTaskDelegate {
                    engine: self.engine.clone(),
                    info: info.clone(),
                };
                f(delegate).await
            }
            WaitstateAction::EventBasedGateway(f) => {
                let delegate = EventBasedGatewayDelegate {
                    engine: self.engine.clone(),
                    info: info.clone(),
                };
                f(delegate).await
            }
            WaitstateAction::CallActivity(_) => {
                Err(anyhow!("call activity actions bind a nested runner"))
            }
        }
    }

    /// Bind a nested runner to the sub-process instance a call-activity
    /// waitstate resolved into. From this point the nested runner
    /// participates in scheduling exactly like a top-level one.
    async fn bind_nested(
        &mut self,
        info: &WaitstateInfo,
        child_scenario: Arc<dyn ProcessScenario>,
    ) -> anyhow::Result<()> {
        let child = self
            .engine
            .call_activity_instance(info.instance_id, &info.id)
            .await?
            .ok_or_else(|| {
                anyhow!(
                    "call activity '{}' has not spawned a sub-process instance",
                    info.activity_id
                )
            })?;
        debug!(
            call_activity = %info.activity_id,
            child_instance = %child,
            "binding nested runner"
        );
        let mut runner = Runner::bound(
            self.engine.clone(),
            child_scenario,
            child,
            format!("call activity '{}'", info.activity_id),
            self.distinguishes_canceled,
        );
        runner.sync_lifecycle().await?;
        self.runners.push(runner);
        Ok(())
    }
}
