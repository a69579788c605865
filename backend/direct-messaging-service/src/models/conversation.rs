use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unordered pair of participants, normalised so that `low < high`
///
/// `ParticipantPair::new(a, b) == ParticipantPair::new(b, a)` for all `a != b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantPair {
    low: Uuid,
    high: Uuid,
}

impl ParticipantPair {
    pub fn new(a: Uuid, b: Uuid) -> Result<Self, AppError> {
        if a == b {
            return Err(AppError::Validation(
                "a conversation needs two distinct participants".into(),
            ));
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.low == user_id || self.high == user_id
    }
}

/// Two-party conversation
///
/// Participants are stored normalised (`participant_a < participant_b`), which is
/// what the storage uniqueness constraint is declared on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub active: bool,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(pair: ParticipantPair, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            participant_a: pair.low(),
            participant_b: pair.high(),
            active: true,
            last_activity_at: now,
            created_at: now,
        }
    }

    pub fn pair(&self) -> ParticipantPair {
        ParticipantPair {
            low: self.participant_a,
            high: self.participant_b,
        }
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// Counterpart of `user_id`, or None when `user_id` is not a participant
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if self.participant_a == user_id {
            Some(self.participant_b)
        } else if self.participant_b == user_id {
            Some(self.participant_a)
        } else {
            None
        }
    }
}
