//! Helpers for testing.
//!
//! Small [`Delivery`] doubles so scheduler behavior can be asserted without
//! a chat transport: [`CapturingDelivery`] records every send, and
//! [`FailingDelivery`] rejects them all.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::delivery::{Delivery, DeliveryError};
use crate::job::ChatId;

/// A [`Delivery`] that records every message instead of sending it.
#[derive(Clone, Default)]
pub struct CapturingDelivery {
    sent: Arc<Mutex<Vec<(ChatId, String)>>>,
}

impl CapturingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in delivery order.
    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().expect("delivery lock poisoned").clone()
    }
}

#[async_trait]
impl Delivery for CapturingDelivery {
    async fn send(&self, destination: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .expect("delivery lock poisoned")
            .push((destination, text.to_owned()));
        Ok(())
    }
}

/// A [`Delivery`] that fails every send, counting the attempts.
#[derive(Clone, Default)]
pub struct FailingDelivery {
    attempts: Arc<Mutex<u32>>,
}

impl FailingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().expect("delivery lock poisoned")
    }
}

#[async_trait]
impl Delivery for FailingDelivery {
    async fn send(&self, destination: ChatId, _text: &str) -> Result<(), DeliveryError> {
        *self.attempts.lock().expect("delivery lock poisoned") += 1;
        Err(DeliveryError {
            destination,
            reason: "transport unavailable".to_owned(),
        })
    }
}
