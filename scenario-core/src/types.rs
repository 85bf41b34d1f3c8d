use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ─── Scalar aliases ───────────────────────────────────────────

/// Epoch milliseconds (UTC). All scenario time is virtual.
pub type Timestamp = i64;

/// Identifier of one process instance (top-level or nested).
pub type InstanceId = Uuid;

/// Process variables carried into instance starts and task completions.
pub type Variables = BTreeMap<String, serde_json::Value>;

// ─── Activity kinds ───────────────────────────────────────────

/// Closed set of BPMN activity kinds the scenario driver understands.
///
/// Only five of these can appear as waitstates (see [`ActivityKind::is_waitstate`]);
/// the rest show up in historic activity records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    StartEvent,
    MessageStartEvent,
    EndEvent,
    ServiceTask,
    TimerIntermediateEvent,
    MessageIntermediateCatchEvent,
    ReceiveTask,
    UserTask,
    EventBasedGateway,
    CallActivity,
}

impl ActivityKind {
    /// Kinds at which execution blocks awaiting an external trigger.
    pub fn is_waitstate(&self) -> bool {
        matches!(
            self,
            ActivityKind::TimerIntermediateEvent
                | ActivityKind::ReceiveTask
                | ActivityKind::UserTask
                | ActivityKind::EventBasedGateway
                | ActivityKind::CallActivity
        )
    }
}

// ─── Engine boundary records ──────────────────────────────────

/// One currently blocked point of a process instance, as reported by the engine.
///
/// `id` is the activity *instance* id, unique per visit and identical to the
/// id of the matching historic record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaitMarker {
    pub id: String,
    pub activity_id: String,
    pub activity_name: Option<String>,
    pub kind: ActivityKind,
    /// Due time of the backing timer job. `None` for non-timer waits.
    pub due_time: Option<Timestamp>,
    /// Id of the backing timer job. `None` for non-timer waits.
    pub job_id: Option<String>,
}

/// Historic activity record. `end_time` is `None` while the activity runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoricActivity {
    pub id: String,
    pub activity_id: String,
    pub activity_name: Option<String>,
    pub kind: ActivityKind,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    /// `None` when the engine cannot distinguish cancellation from completion.
    pub canceled: Option<bool>,
}

/// A pending timer job belonging to some instance. Consulted only during
/// fast-forward to detect competing, earlier-firing timers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerJob {
    pub id: String,
    pub due_time: Timestamp,
}

/// A message event subscription of a blocked instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventSubscription {
    pub activity_id: String,
    pub event_name: String,
}

// ─── Start configuration ──────────────────────────────────────

/// Explicit start-activity override (`fromBefore` / `fromAfter`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartOverride {
    Before(String),
    After(String),
}

/// Engine feature availability, probed once per scenario execution.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineCapabilities {
    /// Instance starts at an explicitly selected activity id.
    pub start_activity_override: bool,
    /// Historic records carry the canceled/completed distinction.
    pub distinguishes_canceled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waitstate_kinds() {
        assert!(ActivityKind::TimerIntermediateEvent.is_waitstate());
        assert!(ActivityKind::ReceiveTask.is_waitstate());
        assert!(ActivityKind::UserTask.is_waitstate());
        assert!(ActivityKind::EventBasedGateway.is_waitstate());
        assert!(ActivityKind::CallActivity.is_waitstate());
        assert!(!ActivityKind::StartEvent.is_waitstate());
        assert!(!ActivityKind::EndEvent.is_waitstate());
        assert!(!ActivityKind::ServiceTask.is_waitstate());
    }
}
