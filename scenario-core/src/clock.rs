use crate::engine::ProcessEngine;
use crate::types::Timestamp;
use anyhow::Result;
use std::sync::Arc;

/// Scheduler-owned virtual clock.
///
/// Every assignment is pushed into the engine so that all engine-side
/// time queries observe the same value. Only the scheduler mutates it;
/// runners and waitstates read time indirectly through engine queries.
pub struct VirtualClock {
    engine: Arc<dyn ProcessEngine>,
    now: Timestamp,
}

impl VirtualClock {
    pub fn new(engine: Arc<dyn ProcessEngine>) -> Self {
        Self { engine, now: 0 }
    }

    /// Reset to the scenario baseline. Called once at the start of each run.
    pub async fn reset(&mut self, baseline: Timestamp) -> Result<()> {
        self.set(baseline).await
    }

    /// Assign an absolute point in time.
    pub async fn set(&mut self, time: Timestamp) -> Result<()> {
        self.engine.set_time(time).await?;
        self.now = time;
        Ok(())
    }

    /// The last assigned value.
    pub fn now(&self) -> Timestamp {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_memory::MemoryEngine;

    #[tokio::test]
    async fn set_propagates_to_engine() {
        let engine = Arc::new(MemoryEngine::new());
        let mut clock = VirtualClock::new(engine.clone());
        clock.reset(1_000).await.unwrap();
        clock.set(5_000).await.unwrap();
        assert_eq!(clock.now(), 5_000);
        assert_eq!(engine.current_time().await.unwrap(), 5_000);
    }
}
