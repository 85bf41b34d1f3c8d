use crate::engine::ProcessEngine;
use crate::types::*;
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// What a delegate knows about the blocked point it stands for.
#[derive(Clone, Debug)]
pub struct WaitstateInfo {
    pub instance_id: InstanceId,
    /// Activity instance id (the wait marker id).
    pub id: String,
    pub activity_id: String,
    pub activity_name: Option<String>,
    pub kind: ActivityKind,
}

/// Delegate for a timer intermediate event. The timer fires by itself once
/// the virtual clock reaches its due time; the delegate only exposes the
/// blocked point's identity.
pub struct TimerDelegate {
    pub(crate) info: WaitstateInfo,
}

impl TimerDelegate {
    pub fn info(&self) -> &WaitstateInfo {
        &self.info
    }
}

/// Delegate for one message event subscription: a receive task or one
/// branch of an event-based gateway.
pub struct EventSubscriptionDelegate {
    pub(crate) engine: Arc<dyn ProcessEngine>,
    pub(crate) info: WaitstateInfo,
    pub(crate) event_name: String,
}

impl EventSubscriptionDelegate {
    pub fn info(&self) -> &WaitstateInfo {
        &self.info
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Receive the subscribed message.
    pub async fn receive(&self) -> Result<()> {
        self.receive_with(Variables::new()).await
    }

    /// Receive the subscribed message, carrying variables.
    pub async fn receive_with(&self, variables: Variables) -> Result<()> {
        self.engine
            .correlate_message(self.info.instance_id, &self.event_name, variables)
            .await
    }
}

/// Delegate for a user task.
pub struct UserTaskDelegate {
    pub(crate) engine: Arc<dyn ProcessEngine>,
    pub(crate) info: WaitstateInfo,
}

impl UserTaskDelegate {
    pub fn info(&self) -> &WaitstateInfo {
        &self.info
    }

    /// Complete the task without variables.
    pub async fn complete(&self) -> Result<()> {
        self.complete_with(Variables::new()).await
    }

    /// Complete the task with variables.
    pub async fn complete_with(&self, variables: Variables) -> Result<()> {
        self.engine
            .complete_task(self.info.instance_id, &self.info.id, variables)
            .await
    }
}

/// Delegate for an event-based gateway. Exposes the gateway's event
/// subscriptions so an action can pick the branch to trigger.
pub struct EventBasedGatewayDelegate {
    pub(crate) engine: Arc<dyn ProcessEngine>,
    pub(crate) info: WaitstateInfo,
}

impl EventBasedGatewayDelegate {
    pub fn info(&self) -> &WaitstateInfo {
        &self.info
    }

    /// The subscription of one gateway branch, by the branch's activity id.
    pub async fn event_subscription(
        &self,
        activity_id: &str,
    ) -> Result<EventSubscriptionDelegate> {
        let subscriptions = self.engine.event_subscriptions(self.info.instance_id).await?;
        let subscription = subscriptions
            .into_iter()
            .find(|s| s.activity_id == activity_id)
            .ok_or_else(|| {
                anyhow!(
                    "no event subscription for activity '{activity_id}' at gateway '{}'",
                    self.info.activity_id
                )
            })?;
        Ok(EventSubscriptionDelegate {
            engine: self.engine.clone(),
            info: WaitstateInfo {
                activity_id: subscription.activity_id.clone(),
                ..self.info.clone()
            },
            event_name: subscription.event_name,
        })
    }
}
