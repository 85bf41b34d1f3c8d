use crate::engine::ProcessEngine;
use crate::types::*;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

// ─── Process definitions ──────────────────────────────────────

/// One step of a linear process definition.
#[derive(Clone, Debug)]
enum Step {
    StartEvent,
    MessageStartEvent { message: String },
    EndEvent,
    ServiceTask,
    Timer { duration_ms: i64 },
    ReceiveTask { message: String },
    UserTask,
    EventBasedGateway { branches: Vec<GatewayBranch> },
    CallActivity { process_key: String },
}

#[derive(Clone, Debug)]
struct GatewayBranch {
    activity_id: String,
    message: String,
}

#[derive(Clone, Debug)]
struct ActivityDef {
    id: String,
    step: Step,
}

/// A deployable linear process definition for [`MemoryEngine`].
#[derive(Clone, Debug)]
pub struct ProcessDefinition {
    key: String,
    activities: Vec<ActivityDef>,
}

/// Builds linear process definitions, one activity at a time.
pub struct ProcessDefinitionBuilder {
    definition: ProcessDefinition,
}

impl ProcessDefinitionBuilder {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            definition: ProcessDefinition {
                key: key.into(),
                activities: Vec::new(),
            },
        }
    }

    fn push(mut self, id: impl Into<String>, step: Step) -> Self {
        self.definition.activities.push(ActivityDef {
            id: id.into(),
            step,
        });
        self
    }

    pub fn start_event(self, id: impl Into<String>) -> Self {
        self.push(id, Step::StartEvent)
    }

    pub fn message_start_event(
        self,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.push(
            id,
            Step::MessageStartEvent {
                message: message.into(),
            },
        )
    }

    pub fn service_task(self, id: impl Into<String>) -> Self {
        self.push(id, Step::ServiceTask)
    }

    pub fn timer_intermediate_event(self, id: impl Into<String>, duration_ms: i64) -> Self {
        self.push(id, Step::Timer { duration_ms })
    }

    pub fn receive_task(self, id: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(
            id,
            Step::ReceiveTask {
                message: message.into(),
            },
        )
    }

    pub fn user_task(self, id: impl Into<String>) -> Self {
        self.push(id, Step::UserTask)
    }

    pub fn event_based_gateway<I, S, M>(self, id: impl Into<String>, branches: I) -> Self
    where
        I: IntoIterator<Item = (S, M)>,
        S: Into<String>,
        M: Into<String>,
    {
        let branches = branches
            .into_iter()
            .map(|(activity_id, message)| GatewayBranch {
                activity_id: activity_id.into(),
                message: message.into(),
            })
            .collect();
        self.push(id, Step::EventBasedGateway { branches })
    }

    pub fn call_activity(self, id: impl Into<String>, process_key: impl Into<String>) -> Self {
        self.push(
            id,
            Step::CallActivity {
                process_key: process_key.into(),
            },
        )
    }

    pub fn end_event(self, id: impl Into<String>) -> Self {
        self.push(id, Step::EndEvent)
    }

    pub fn build(self) -> ProcessDefinition {
        self.definition
    }
}

// ─── Runtime state ────────────────────────────────────────────

#[derive(Debug)]
enum OpenWaitDetail {
    Timer { job: TimerJob },
    ReceiveTask { message: String },
    UserTask,
    EventBasedGateway { branches: Vec<GatewayBranch> },
    CallActivity { child: InstanceId },
}

#[derive(Debug)]
struct OpenWait {
    marker: WaitMarker,
    history_index: usize,
    detail: OpenWaitDetail,
}

#[derive(Debug)]
struct Instance {
    process_key: String,
    cursor: usize,
    ended: bool,
    history: Vec<HistoricActivity>,
    wait: Option<OpenWait>,
    variables: Variables,
    /// Parent instance and the parent's call-activity marker id.
    parent: Option<(InstanceId, String)>,
}

#[derive(Default)]
struct EngineState {
    now: Timestamp,
    seq: u64,
    definitions: HashMap<String, ProcessDefinition>,
    /// Message start event name → process key.
    message_starts: HashMap<String, String>,
    instances: HashMap<InstanceId, Instance>,
}

impl EngineState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.seq += 1;
        format!("{prefix}:{}", self.seq)
    }

    fn instance_mut(&mut self, id: InstanceId) -> Result<&mut Instance> {
        self.instances
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown process instance {id}"))
    }
}

/// In-memory reference implementation of the [`ProcessEngine`] boundary.
///
/// Interprets linear process definitions with strict timer due-time
/// comparison (`now > due`) and engine-clock-stamped history, which is all
/// the scenario scheduler assumes of a real engine.
pub struct MemoryEngine {
    caps: EngineCapabilities,
    state: Mutex<EngineState>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::with_capabilities(EngineCapabilities {
            start_activity_override: true,
            distinguishes_canceled: true,
        })
    }

    /// An engine with a reduced feature set, for capability-gating tests.
    pub fn with_capabilities(caps: EngineCapabilities) -> Self {
        Self {
            caps,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Deploy a process definition, registering any message start event.
    pub fn deploy(&self, definition: ProcessDefinition) {
        let mut state = self.state.lock().unwrap();
        if let Some(ActivityDef {
            step: Step::MessageStartEvent { message },
            ..
        }) = definition.activities.first()
        {
            state
                .message_starts
                .insert(message.clone(), definition.key.clone());
        }
        state.definitions.insert(definition.key.clone(), definition);
    }

    /// Current variables of an instance (start variables merged with
    /// everything carried in by messages and task completions).
    pub fn variables(&self, instance_id: InstanceId) -> Variables {
        let state = self.state.lock().unwrap();
        state
            .instances
            .get(&instance_id)
            .map(|i| i.variables.clone())
            .unwrap_or_default()
    }

    pub fn is_ended(&self, instance_id: InstanceId) -> bool {
        let state = self.state.lock().unwrap();
        state
            .instances
            .get(&instance_id)
            .map(|i| i.ended)
            .unwrap_or(false)
    }

    /// Cancel a blocked instance: its open waitstate ends as canceled and no
    /// further progress happens.
    pub fn cancel_instance(&self, instance_id: InstanceId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let now = state.now;
        let canceled = self.caps.distinguishes_canceled.then_some(true);
        let instance = state.instance_mut(instance_id)?;
        let wait = instance
            .wait
            .take()
            .ok_or_else(|| anyhow!("instance {instance_id} has no open waitstate"))?;
        let record = &mut instance.history[wait.history_index];
        record.end_time = Some(now);
        record.canceled = canceled;
        instance.ended = true;
        Ok(())
    }

    // ── Internal execution ──

    fn start_instance(
        &self,
        state: &mut EngineState,
        process_key: &str,
        variables: Variables,
        cursor: usize,
        parent: Option<(InstanceId, String)>,
    ) -> Result<InstanceId> {
        if !state.definitions.contains_key(process_key) {
            bail!("no process definition deployed for key '{process_key}'");
        }
        let id = Uuid::now_v7();
        state.instances.insert(
            id,
            Instance {
                process_key: process_key.to_string(),
                cursor,
                ended: false,
                history: Vec::new(),
                wait: None,
                variables,
                parent,
            },
        );
        self.advance(state, id)?;
        Ok(id)
    }

    /// Run an instance forward until it blocks or ends.
    fn advance(&self, state: &mut EngineState, id: InstanceId) -> Result<()> {
        loop {
            let instance = state.instance_mut(id)?;
            if instance.ended {
                return Ok(());
            }
            let cursor = instance.cursor;
            let process_key = instance.process_key.clone();
            let definition = state
                .definitions
                .get(&process_key)
                .ok_or_else(|| anyhow!("definition '{process_key}' vanished"))?;
            let Some(activity) = definition.activities.get(cursor).cloned() else {
                return self.end_instance(state, id);
            };
            match &activity.step {
                Step::StartEvent
                | Step::MessageStartEvent { .. }
                | Step::EndEvent
                | Step::ServiceTask => {
                    let record = self.record(state, &activity, true);
                    let instance = state.instance_mut(id)?;
                    instance.history.push(record);
                    instance.cursor += 1;
                }
                Step::Timer { duration_ms } => {
                    let due = state.now + *duration_ms;
                    let job = TimerJob {
                        id: state.next_id("job"),
                        due_time: due,
                    };
                    self.park(
                        state,
                        id,
                        &activity,
                        ActivityKind::TimerIntermediateEvent,
                        Some(&job),
                        OpenWaitDetail::Timer { job: job.clone() },
                    )?;
                    return Ok(());
                }
                Step::ReceiveTask { message } => {
                    self.park(
                        state,
                        id,
                        &activity,
                        ActivityKind::ReceiveTask,
                        None,
                        OpenWaitDetail::ReceiveTask {
                            message: message.clone(),
                        },
                    )?;
                    return Ok(());
                }
                Step::UserTask => {
                    self.park(
                        state,
                        id,
                        &activity,
                        ActivityKind::UserTask,
                        None,
                        OpenWaitDetail::UserTask,
                    )?;
                    return Ok(());
                }
                Step::EventBasedGateway { branches } => {
                    self.park(
                        state,
                        id,
                        &activity,
                        ActivityKind::EventBasedGateway,
                        None,
                        OpenWaitDetail::EventBasedGateway {
                            branches: branches.clone(),
                        },
                    )?;
                    return Ok(());
                }
                Step::CallActivity { process_key } => {
                    let marker_id = self.park(
                        state,
                        id,
                        &activity,
                        ActivityKind::CallActivity,
                        None,
                        // Placeholder until the child instance exists.
                        OpenWaitDetail::UserTask,
                    )?;
                    let child = self.start_instance(
                        state,
                        process_key,
                        Variables::new(),
                        0,
                        Some((id, marker_id.clone())),
                    )?;
                    // The child may have run to completion already, advancing
                    // this instance past the call activity, so only bind the
                    // child handle while the call activity is still open.
                    if let Some(wait) = &mut state.instance_mut(id)?.wait {
                        if wait.marker.id == marker_id {
                            wait.detail = OpenWaitDetail::CallActivity { child };
                        }
                    }
                    return Ok(());
                }
            }
        }
    }

    fn record(
        &self,
        state: &mut EngineState,
        activity: &ActivityDef,
        finished: bool,
    ) -> HistoricActivity {
        let kind = match activity.step {
            Step::StartEvent => ActivityKind::StartEvent,
            Step::MessageStartEvent { .. } => ActivityKind::MessageStartEvent,
            Step::EndEvent => ActivityKind::EndEvent,
            Step::ServiceTask => ActivityKind::ServiceTask,
            Step::Timer { .. } => ActivityKind::TimerIntermediateEvent,
            Step::ReceiveTask { .. } => ActivityKind::ReceiveTask,
            Step::UserTask => ActivityKind::UserTask,
            Step::EventBasedGateway { .. } => ActivityKind::EventBasedGateway,
            Step::CallActivity { .. } => ActivityKind::CallActivity,
        };
        let id = state.next_id(&activity.id);
        HistoricActivity {
            id,
            activity_id: activity.id.clone(),
            activity_name: None,
            kind,
            start_time: state.now,
            end_time: finished.then_some(state.now),
            canceled: (finished && self.caps.distinguishes_canceled).then_some(false),
        }
    }

    /// Record an unfinished historic activity and an open wait marker.
    fn park(
        &self,
        state: &mut EngineState,
        id: InstanceId,
        activity: &ActivityDef,
        kind: ActivityKind,
        job: Option<&TimerJob>,
        detail: OpenWaitDetail,
    ) -> Result<String> {
        let record = self.record(state, activity, false);
        let marker = WaitMarker {
            id: record.id.clone(),
            activity_id: activity.id.clone(),
            activity_name: None,
            kind,
            due_time: job.map(|j| j.due_time),
            job_id: job.map(|j| j.id.clone()),
        };
        let marker_id = marker.id.clone();
        let instance = state.instance_mut(id)?;
        let history_index = instance.history.len();
        instance.history.push(record);
        instance.wait = Some(OpenWait {
            marker,
            history_index,
            detail,
        });
        Ok(marker_id)
    }

    /// Close the open wait, stamp its history record, and run forward.
    fn complete_wait(&self, state: &mut EngineState, id: InstanceId) -> Result<()> {
        let now = state.now;
        let canceled = self.caps.distinguishes_canceled.then_some(false);
        let instance = state.instance_mut(id)?;
        let wait = instance
            .wait
            .take()
            .ok_or_else(|| anyhow!("instance {id} has no open waitstate"))?;
        let record = &mut instance.history[wait.history_index];
        record.end_time = Some(now);
        record.canceled = canceled;
        instance.cursor += 1;
        self.advance(state, id)
    }

    fn end_instance(&self, state: &mut EngineState, id: InstanceId) -> Result<()> {
        let instance = state.instance_mut(id)?;
        instance.ended = true;
        let parent = instance.parent.as_ref().map(|(parent, _)| *parent);
        if let Some(parent) = parent {
            // The sub-process finished: the parent's call activity completes
            // and the parent continues.
            self.complete_wait(state, parent)?;
        }
        Ok(())
    }
}

// ─── ProcessEngine implementation ─────────────────────────────

#[async_trait]
impl ProcessEngine for MemoryEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.caps
    }

    async fn start_by_key(
        &self,
        process_key: &str,
        variables: Variables,
        overrides: &[StartOverride],
    ) -> Result<InstanceId> {
        let mut state = self.state.lock().unwrap();
        let cursor = if overrides.is_empty() {
            0
        } else {
            if !self.caps.start_activity_override {
                bail!("engine does not support start-activity overrides");
            }
            if overrides.len() > 1 {
                bail!(
                    "{} start-activity overrides given; at most one is supported",
                    overrides.len()
                );
            }
            let definition = state
                .definitions
                .get(process_key)
                .ok_or_else(|| anyhow!("no process definition for key '{process_key}'"))?;
            let target = match &overrides[0] {
                StartOverride::Before(activity_id) => activity_id,
                StartOverride::After(activity_id) => activity_id,
            };
            let index = definition
                .activities
                .iter()
                .position(|a| &a.id == target)
                .ok_or_else(|| anyhow!("unknown start activity '{target}'"))?;
            match &overrides[0] {
                StartOverride::Before(_) => index,
                StartOverride::After(_) => index + 1,
            }
        };
        self.start_instance(&mut state, process_key, variables, cursor, None)
    }

    async fn start_by_message(&self, message: &str, variables: Variables) -> Result<InstanceId> {
        let mut state = self.state.lock().unwrap();
        let process_key = state
            .message_starts
            .get(message)
            .cloned()
            .ok_or_else(|| anyhow!("no message start event subscribed to '{message}'"))?;
        self.start_instance(&mut state, &process_key, variables, 0, None)
    }

    async fn wait_markers(&self, instance_id: InstanceId) -> Result<Vec<WaitMarker>> {
        let mut state = self.state.lock().unwrap();
        let instance = state.instance_mut(instance_id)?;
        Ok(instance.wait.iter().map(|w| w.marker.clone()).collect())
    }

    async fn historic_activities(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<HistoricActivity>> {
        let mut state = self.state.lock().unwrap();
        let instance = state.instance_mut(instance_id)?;
        let mut records = instance.history.clone();
        if !self.caps.distinguishes_canceled {
            for record in &mut records {
                record.canceled = None;
            }
        }
        Ok(records)
    }

    async fn pending_timers(&self, instance_id: InstanceId) -> Result<Vec<TimerJob>> {
        let mut state = self.state.lock().unwrap();
        let instance = state.instance_mut(instance_id)?;
        Ok(instance
            .wait
            .iter()
            .filter_map(|w| match &w.detail {
                OpenWaitDetail::Timer { job } => Some(job.clone()),
                _ => None,
            })
            .collect())
    }

    async fn event_subscriptions(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<EventSubscription>> {
        let mut state = self.state.lock().unwrap();
        let instance = state.instance_mut(instance_id)?;
        let Some(wait) = &instance.wait else {
            return Ok(Vec::new());
        };
        Ok(match &wait.detail {
            OpenWaitDetail::ReceiveTask { message } => vec![EventSubscription {
                activity_id: wait.marker.activity_id.clone(),
                event_name: message.clone(),
            }],
            OpenWaitDetail::EventBasedGateway { branches } => branches
                .iter()
                .map(|b| EventSubscription {
                    activity_id: b.activity_id.clone(),
                    event_name: b.message.clone(),
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn call_activity_instance(
        &self,
        instance_id: InstanceId,
        marker_id: &str,
    ) -> Result<Option<InstanceId>> {
        let mut state = self.state.lock().unwrap();
        let instance = state.instance_mut(instance_id)?;
        Ok(instance.wait.as_ref().and_then(|w| match &w.detail {
            OpenWaitDetail::CallActivity { child } if w.marker.id == marker_id => Some(*child),
            _ => None,
        }))
    }

    async fn execute_job(&self, job_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let owner = state
            .instances
            .iter()
            .find_map(|(id, instance)| match &instance.wait {
                Some(OpenWait {
                    detail: OpenWaitDetail::Timer { job },
                    ..
                }) if job.id == job_id => Some((*id, job.due_time)),
                _ => None,
            });
        let Some((instance_id, due_time)) = owner else {
            bail!("no pending timer job '{job_id}'");
        };
        if state.now <= due_time {
            bail!(
                "timer job '{job_id}' is not due (now {} <= due {})",
                state.now,
                due_time
            );
        }
        self.complete_wait(&mut state, instance_id)
    }

    async fn correlate_message(
        &self,
        instance_id: InstanceId,
        message: &str,
        variables: Variables,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let now = state.now;
        let canceled = self.caps.distinguishes_canceled.then_some(false);
        let gateway_branch = {
            let instance = state.instance_mut(instance_id)?;
            instance.variables.extend(variables);
            let wait = instance
                .wait
                .as_ref()
                .ok_or_else(|| anyhow!("instance {instance_id} is not waiting for a message"))?;
            match &wait.detail {
                OpenWaitDetail::ReceiveTask { message: expected } => {
                    if expected != message {
                        bail!("instance {instance_id} is not subscribed to message '{message}'");
                    }
                    None
                }
                OpenWaitDetail::EventBasedGateway { branches } => Some(
                    branches
                        .iter()
                        .find(|b| b.message == message)
                        .cloned()
                        .ok_or_else(|| {
                            anyhow!("no gateway branch subscribed to message '{message}'")
                        })?,
                ),
                _ => bail!("instance {instance_id} is not waiting for a message"),
            }
        };
        if let Some(branch) = gateway_branch {
            // The gateway resolves, the winning catch event fires, and the
            // flow continues after the gateway.
            let catch_id = state.next_id(&branch.activity_id);
            let instance = state.instance_mut(instance_id)?;
            instance.history.push(HistoricActivity {
                id: catch_id,
                activity_id: branch.activity_id,
                activity_name: None,
                kind: ActivityKind::MessageIntermediateCatchEvent,
                start_time: now,
                end_time: Some(now),
                canceled,
            });
        }
        self.complete_wait(&mut state, instance_id)
    }

    async fn complete_task(
        &self,
        instance_id: InstanceId,
        marker_id: &str,
        variables: Variables,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let instance = state.instance_mut(instance_id)?;
        let open = matches!(
            &instance.wait,
            Some(OpenWait {
                detail: OpenWaitDetail::UserTask,
                marker,
                ..
            }) if marker.id == marker_id
        );
        if !open {
            bail!("instance {instance_id} has no open user task '{marker_id}'");
        }
        instance.variables.extend(variables);
        self.complete_wait(&mut state, instance_id)
    }

    async fn set_time(&self, time: Timestamp) -> Result<()> {
        self.state.lock().unwrap().now = time;
        Ok(())
    }

    async fn current_time(&self) -> Result<Timestamp> {
        Ok(self.state.lock().unwrap().now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_timer_process() -> ProcessDefinition {
        ProcessDefinitionBuilder::new("TimerProcess")
            .start_event("StartEvent")
            .timer_intermediate_event("Timer", 3_600_000)
            .end_event("EndEvent")
            .build()
    }

    #[tokio::test]
    async fn runs_to_timer_and_blocks() {
        let engine = MemoryEngine::new();
        engine.deploy(linear_timer_process());
        let instance = engine
            .start_by_key("TimerProcess", Variables::new(), &[])
            .await
            .unwrap();

        let markers = engine.wait_markers(instance).await.unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].activity_id, "Timer");
        assert_eq!(markers[0].due_time, Some(3_600_000));

        let history = engine.historic_activities(instance).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].end_time.is_some());
        assert!(history[1].end_time.is_none());
    }

    #[tokio::test]
    async fn timer_job_requires_strictly_elapsed_clock() {
        let engine = MemoryEngine::new();
        engine.deploy(linear_timer_process());
        let instance = engine
            .start_by_key("TimerProcess", Variables::new(), &[])
            .await
            .unwrap();
        let job = engine.pending_timers(instance).await.unwrap().remove(0);

        engine.set_time(job.due_time).await.unwrap();
        assert!(engine.execute_job(&job.id).await.is_err());

        engine.set_time(job.due_time + 1).await.unwrap();
        engine.execute_job(&job.id).await.unwrap();
        assert!(engine.is_ended(instance));
    }

    #[tokio::test]
    async fn start_overrides_skip_activities() {
        let engine = MemoryEngine::new();
        engine.deploy(
            ProcessDefinitionBuilder::new("P")
                .start_event("StartEvent")
                .user_task("UserTask")
                .end_event("EndEvent")
                .build(),
        );
        let instance = engine
            .start_by_key(
                "P",
                Variables::new(),
                &[StartOverride::After("UserTask".into())],
            )
            .await
            .unwrap();
        assert!(engine.is_ended(instance));

        let history = engine.historic_activities(instance).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].activity_id, "EndEvent");
    }

    #[tokio::test]
    async fn multiple_start_overrides_are_rejected() {
        let engine = MemoryEngine::new();
        engine.deploy(
            ProcessDefinitionBuilder::new("P")
                .start_event("StartEvent")
                .user_task("UserTask")
                .end_event("EndEvent")
                .build(),
        );
        let err = engine
            .start_by_key(
                "P",
                Variables::new(),
                &[
                    StartOverride::Before("UserTask".into()),
                    StartOverride::After("UserTask".into()),
                ],
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at most one"));
    }

    #[tokio::test]
    async fn call_activity_completes_with_child() {
        let engine = MemoryEngine::new();
        engine.deploy(
            ProcessDefinitionBuilder::new("Child")
                .start_event("SubStart")
                .receive_task("SubReceive", "go")
                .end_event("SubEnd")
                .build(),
        );
        engine.deploy(
            ProcessDefinitionBuilder::new("Parent")
                .start_event("StartEvent")
                .call_activity("CallActivity", "Child")
                .end_event("EndEvent")
                .build(),
        );

        let parent = engine
            .start_by_key("Parent", Variables::new(), &[])
            .await
            .unwrap();
        let marker = engine.wait_markers(parent).await.unwrap().remove(0);
        let child = engine
            .call_activity_instance(parent, &marker.id)
            .await
            .unwrap()
            .expect("child instance spawned");

        engine
            .correlate_message(child, "go", Variables::new())
            .await
            .unwrap();
        assert!(engine.is_ended(child));
        assert!(engine.is_ended(parent));
    }

    #[tokio::test]
    async fn degraded_engine_hides_canceled_flag() {
        let engine = MemoryEngine::with_capabilities(EngineCapabilities {
            start_activity_override: true,
            distinguishes_canceled: false,
        });
        engine.deploy(linear_timer_process());
        let instance = engine
            .start_by_key("TimerProcess", Variables::new(), &[])
            .await
            .unwrap();
        let history = engine.historic_activities(instance).await.unwrap();
        assert!(history.iter().all(|r| r.canceled.is_none()));
    }
}
