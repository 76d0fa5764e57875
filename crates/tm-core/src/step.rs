//! Migration steps: immutable, content-addressed units of schema change.

use crate::diff::Changeset;
use crate::identifier::define_identifier;
use crate::operation::{invert_all, Operation};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the content hash.
pub const STEP_ID_LEN: usize = 12;

const MAX_SLUG_LEN: usize = 40;

/// Step ids are short alphanumeric tokens (content hashes, or hand-picked).
fn is_step_id(s: &str) -> bool {
    !s.is_empty() && s.len() <= 64 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

define_identifier! {
    /// Identifier of a migration step.
    pub struct StepId: is_step_id;
}

/// One recorded migration step.
///
/// `reverse_ops` is in execution order: it is the inverse of each forward
/// operation with the list reversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStep {
    /// Content-derived identifier
    pub id: StepId,

    /// Human-readable description
    pub message: String,

    /// Predecessor in the chain; `None` for the first step
    pub parent_id: Option<StepId>,

    /// When the step was recorded
    pub created_at: DateTime<Utc>,

    /// Operations applied on upgrade
    pub forward_ops: Vec<Operation>,

    /// Operations applied on downgrade
    pub reverse_ops: Vec<Operation>,
}

impl MigrationStep {
    /// Create a step stamped with the current time.
    pub fn new(
        parent_id: Option<StepId>,
        message: impl Into<String>,
        changeset: Changeset,
    ) -> serde_json::Result<Self> {
        Self::with_timestamp(parent_id, message, changeset, Utc::now())
    }

    /// Create a step with an explicit timestamp; the id is derived from the
    /// content so the same inputs always produce the same id.
    pub fn with_timestamp(
        parent_id: Option<StepId>,
        message: impl Into<String>,
        changeset: Changeset,
        created_at: DateTime<Utc>,
    ) -> serde_json::Result<Self> {
        let message = message.into();
        let id = content_id(
            parent_id.as_ref(),
            &message,
            created_at,
            &changeset.forward,
        )?;
        Ok(Self {
            id,
            message,
            parent_id,
            created_at,
            forward_ops: changeset.forward,
            reverse_ops: changeset.reverse,
        })
    }

    /// Recompute the id from the step's content.
    pub fn computed_id(&self) -> serde_json::Result<StepId> {
        content_id(
            self.parent_id.as_ref(),
            &self.message,
            self.created_at,
            &self.forward_ops,
        )
    }

    /// Whether `reverse_ops` undoes `forward_ops` exactly.
    pub fn reverse_is_inverse(&self) -> bool {
        self.reverse_ops == invert_all(&self.forward_ops)
    }

    /// A step that changes nothing.
    pub fn is_empty(&self) -> bool {
        self.forward_ops.is_empty()
    }

    /// Filename-safe form of the message: lowercase words joined by `_`.
    pub fn slug(&self) -> String {
        let mut slug = String::new();
        for word in self
            .message
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if !slug.is_empty() {
                slug.push('_');
            }
            slug.push_str(&word.to_ascii_lowercase());
            if slug.len() >= MAX_SLUG_LEN {
                slug.truncate(MAX_SLUG_LEN);
                break;
            }
        }
        if slug.is_empty() {
            slug.push_str("step");
        }
        slug
    }

    /// Forward and reverse operations as a changeset.
    pub fn changeset(&self) -> Changeset {
        Changeset {
            forward: self.forward_ops.clone(),
            reverse: self.reverse_ops.clone(),
        }
    }
}

fn content_id(
    parent_id: Option<&StepId>,
    message: &str,
    created_at: DateTime<Utc>,
    forward: &[Operation],
) -> serde_json::Result<StepId> {
    let ops = serde_json::to_string(forward)?;
    let mut hasher = Sha256::new();
    hasher.update(parent_id.map_or("", |p| p.as_str()).as_bytes());
    hasher.update(b"\n");
    hasher.update(message.as_bytes());
    hasher.update(b"\n");
    hasher.update(
        created_at
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
            .as_bytes(),
    );
    hasher.update(b"\n");
    hasher.update(ops.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    Ok(StepId::new(&digest[..STEP_ID_LEN]))
}

#[cfg(test)]
#[path = "step_test.rs"]
mod tests;
