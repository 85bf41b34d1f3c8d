//! Deterministic scenario testing for external process engines.
//!
//! A scenario drives one or more process instances through every blocked
//! point ("waitstate") they reach: the scheduler discovers all currently
//! pending waitstates across a dynamically growing set of per-instance
//! runners, orders them by virtual time, fast-forwards the virtual clock
//! past competing timers, invokes the test author's action at each blocked
//! point, and reports every activity lifecycle transition to the scenario
//! observer.
//!
//! ```ignore
//! let run = Scenario::run(observer)
//!     .by_key("OrderProcess")
//!     .engine(engine)
//!     .execute()
//!     .await?;
//! ```

pub mod clock;
pub mod deferred;
pub mod delegate;
pub mod engine;
pub mod engine_memory;
pub mod error;
pub mod executor;
pub mod runner;
pub mod scenario;
pub mod types;
pub mod waitstate;

pub use clock::VirtualClock;
pub use deferred::DeferredActions;
pub use delegate::{
    EventBasedGatewayDelegate, EventSubscriptionDelegate, TimerDelegate, UserTaskDelegate,
    WaitstateInfo,
};
pub use engine::{EngineRegistry, ProcessEngine};
pub use engine_memory::{MemoryEngine, ProcessDefinition, ProcessDefinitionBuilder};
pub use error::ScenarioError;
pub use executor::{Scenario, ScenarioBuilder, ScenarioRun};
pub use runner::{starter, ProcessStarter, Runner};
pub use scenario::{
    act, Action, BoxFuture, EventBasedGatewayAction, ProcessScenario, ReceiveTaskAction,
    TimerAction, UserTaskAction, WaitstateAction,
};
pub use types::{
    ActivityKind, EngineCapabilities, EventSubscription, HistoricActivity, InstanceId,
    StartOverride, TimerJob, Timestamp, Variables, WaitMarker,
};
pub use waitstate::Waitstate;
