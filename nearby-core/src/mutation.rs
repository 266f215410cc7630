//! Write operations recorded while offline.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::Timestamp;

/// Client-generated mutation identifier (UUIDv7, sortable by creation time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(Uuid);

impl MutationId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the mutation does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MutationKind {
    /// Post a new review for a business.
    #[serde(rename_all = "camelCase")]
    AddReview {
        business_id: String,
        rating: u8,
        text: String,
    },
    /// Delete one of the user's reviews.
    #[serde(rename_all = "camelCase")]
    DeleteReview {
        business_id: String,
        review_id: String,
    },
    /// Adjust the helpful-vote count of a review.
    #[serde(rename_all = "camelCase")]
    HelpfulVoteDelta { review_id: String, delta: i32 },
}

impl MutationKind {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddReview { .. } => "add-review",
            Self::DeleteReview { .. } => "delete-review",
            Self::HelpfulVoteDelta { .. } => "helpful-vote-delta",
        }
    }
}

/// A pending write captured while the device was offline.
///
/// The id is assigned by the producer so callers can detect duplicates
/// themselves; the queue stores whatever it is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineMutation {
    pub id: MutationId,
    pub created_at: Timestamp,
    pub kind: MutationKind,
}

impl OfflineMutation {
    /// Build a mutation with an explicit id.
    pub fn new(id: MutationId, created_at: Timestamp, kind: MutationKind) -> Self {
        Self {
            id,
            created_at,
            kind,
        }
    }

    /// Build a mutation with a freshly generated id.
    pub fn with_fresh_id(created_at: Timestamp, kind: MutationKind) -> Self {
        Self::new(MutationId::new(), created_at, kind)
    }
}
