//! The chat-transport collaborator contract.
use async_trait::async_trait;
use thiserror::Error;

use crate::job::ChatId;

/// Delivers broadcast text to a chat destination.
///
/// This is the effect a due job invokes. The core imposes no timeout on an
/// individual delivery: a hanging send stalls the remainder of that tick
/// (and only that tick) until it returns.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, destination: ChatId, text: &str) -> Result<(), DeliveryError>;
}

/// The transport failed to deliver a message.
///
/// The scheduler reports these and moves on; the job's next occurrence gets
/// a fresh attempt.
#[derive(Debug, Error)]
#[error("failed to deliver to chat {destination}: {reason}")]
pub struct DeliveryError {
    pub destination: ChatId,
    pub reason: String,
}
