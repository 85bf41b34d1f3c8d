use thiserror::Error;

/// Failure taxonomy surfaced by [`crate::ScenarioBuilder::execute`].
///
/// The scheduler performs no local recovery beyond the one documented
/// graceful-degradation case (missing canceled/completed distinction);
/// every other failure unwinds the scheduling loop unchanged.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Raised before any instance starts: no engine selected, no start
    /// strategy configured, and similar wiring mistakes.
    #[error("scenario configuration error: {0}")]
    Configuration(String),

    /// The engine lacks a capability whose absence would silently corrupt
    /// scenario semantics (e.g. explicit start-activity overrides).
    #[error("engine capability unavailable: {0}")]
    UnsupportedCapability(String),

    /// A collaborator call into the process engine failed.
    #[error("process engine failure")]
    Engine(#[source] anyhow::Error),

    /// A user-registered action raised; aborts the remainder of the run.
    #[error("waitstate action failed at activity '{activity_id}'")]
    Action {
        activity_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ScenarioError {
    /// Wrap an action failure, passing through errors that already carry
    /// scenario-level kind.
    pub(crate) fn from_action(activity_id: &str, err: anyhow::Error) -> Self {
        match err.downcast::<ScenarioError>() {
            Ok(already) => already,
            Err(other) => ScenarioError::Action {
                activity_id: activity_id.to_string(),
                source: other,
            },
        }
    }

    /// Wrap a collaborator failure, passing through errors that already carry
    /// scenario-level kind.
    pub(crate) fn from_engine(err: anyhow::Error) -> Self {
        match err.downcast::<ScenarioError>() {
            Ok(already) => already,
            Err(other) => ScenarioError::Engine(other),
        }
    }
}
