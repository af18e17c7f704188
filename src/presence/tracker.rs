use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::common::{
    BROADCAST_RECIPIENT, ChatError, ChatMessage, ChatResult, JOINED_STATUS, LEFT_STATUS,
    Participant,
};
use crate::storage::{ChatStore, StoreResult};

/// Registration, heartbeats and inactivity eviction of chat participants.
///
/// Holds no state of its own; every decision is made against the store.
pub struct PresenceTracker {
    store: Arc<dyn ChatStore>,
}

/// Outcome of one sweep pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: Vec<String>,
    pub failures: Vec<SweepFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub name: String,
    pub error: String,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.failures.is_empty()
    }
}

impl PresenceTracker {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub fn register(&self, name: &str, now: DateTime<Utc>) -> ChatResult<Participant> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::validation("participant name must not be empty"));
        }
        // Private messages addressed to this name would be readable by everyone.
        if name == BROADCAST_RECIPIENT {
            return Err(ChatError::Validation(format!(
                "`{BROADCAST_RECIPIENT}` is reserved for broadcasts"
            )));
        }

        if self.store.find_participant(name)?.is_some() {
            return Err(ChatError::Conflict(format!("name `{name}` is already in use")));
        }

        let participant = Participant::new(name, now);
        // The primary key still guards against a concurrent registration.
        if !self.store.insert_participant(&participant)? {
            return Err(ChatError::Conflict(format!("name `{name}` is already in use")));
        }

        self.store
            .insert_message(&ChatMessage::status(name, JOINED_STATUS, now))?;
        log::info!("Participant registered: {name}");

        Ok(participant)
    }

    pub fn heartbeat(&self, name: &str, now: DateTime<Utc>) -> ChatResult<()> {
        if self.store.update_heartbeat(name, now.timestamp_millis())? {
            log::debug!("Heartbeat from {name}");
            Ok(())
        } else {
            Err(ChatError::NotFound(format!("participant `{name}`")))
        }
    }

    pub fn participants(&self) -> ChatResult<Vec<Participant>> {
        Ok(self.store.list_participants()?)
    }

    /// Evict every participant whose last heartbeat is at least `threshold`
    /// older than `now`, writing a "left" status message for each.
    ///
    /// Only a failure to list participants aborts the pass; per-participant
    /// failures are logged and collected in the report.
    pub fn sweep(&self, now: DateTime<Utc>, threshold: Duration) -> ChatResult<SweepReport> {
        let now_ms = now.timestamp_millis();
        let threshold_ms = i64::try_from(threshold.as_millis()).unwrap_or(i64::MAX);

        let mut report = SweepReport::default();
        for participant in self.store.list_participants()? {
            if now_ms.saturating_sub(participant.last_heartbeat) < threshold_ms {
                continue;
            }

            match self.evict(&participant, now) {
                Ok(true) => {
                    log::info!(
                        "Evicted {} after {} ms of inactivity",
                        participant.name,
                        now_ms - participant.last_heartbeat
                    );
                    report.evicted.push(participant.name);
                }
                Ok(false) => {
                    log::debug!("{} refreshed during sweep; keeping", participant.name);
                }
                Err(err) => {
                    log::warn!("Failed to evict {}: {err}", participant.name);
                    report.failures.push(SweepFailure {
                        name: participant.name,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    // Removal and the status write are separate single-row operations; a
    // failure between them leaves the participant gone without a "left" entry.
    fn evict(&self, participant: &Participant, now: DateTime<Utc>) -> StoreResult<bool> {
        if !self
            .store
            .remove_participant_if_unchanged(&participant.name, participant.last_heartbeat)?
        {
            return Ok(false);
        }

        self.store
            .insert_message(&ChatMessage::status(&participant.name, LEFT_STATUS, now))?;
        Ok(true)
    }
}
