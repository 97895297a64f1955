//! Document — the thin envelope a revision history hangs off.
//!
//! A document holds only identity metadata and a pointer to its latest
//! revision number. Everything review-related lives on the revisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A controlled document, identified by a unique human-facing key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub document_id:      Uuid,
  /// Unique document number, e.g. `FAC09001-CTR-000-EXP-LAY-4891`.
  pub document_key:     String,
  pub title:            String,
  pub created_at:       DateTime<Utc>,
  /// Number of the latest authored revision.
  pub current_revision: u32,
}

/// Input to [`crate::store::WorkflowStore::add_document`].
/// `document_id` and `created_at` are always set by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
  pub document_key: String,
  pub title:        String,
}
