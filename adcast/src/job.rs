//! The scheduler's runtime representation of an advert.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::Recurrence;

/// The identifier of an advert.
///
/// Matches the identifier assigned by the store when the advert record was
/// inserted. Identifiers are never reused within a process lifetime.
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct AdvertId(i64);

impl From<i64> for AdvertId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<AdvertId> for i64 {
    fn from(value: AdvertId) -> Self {
        value.0
    }
}

impl Display for AdvertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identifier of the chat a broadcast is delivered to.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct ChatId(i64);

impl From<i64> for ChatId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<ChatId> for i64 {
    fn from(value: ChatId) -> Self {
        value.0
    }
}

impl Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single scheduled broadcast: cadence, next due time, and the payload to
/// deliver when it fires.
///
/// `next_fire_at` is always the earliest occurrence of `recurrence` strictly
/// after the last fire (or after creation if the job has never fired). Only
/// [`crate::scheduler::Scheduler::tick`] advances it; request-handling code
/// inserts and removes whole jobs, never edits the fire time.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: AdvertId,
    pub recurrence: Recurrence,
    pub next_fire_at: DateTime<Utc>,
    pub destination: ChatId,
    pub text: String,
}

impl Job {
    pub fn new(
        id: AdvertId,
        recurrence: Recurrence,
        next_fire_at: DateTime<Utc>,
        destination: ChatId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            recurrence,
            next_fire_at,
            destination,
            text: text.into(),
        }
    }

    /// A job is due once its fire time is at or before the tick's clock
    /// reading.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_fire_at <= now
    }
}
