//! Review records — the per-reviewer bookkeeping of one revision's review.
//!
//! One record exists per `(document, revision, reviewer)`, created as a set
//! when the review starts and deleted as a set when it is cancelled.
//! Placeholder ("void") records are synthesised for display when a review
//! was never started; they are never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Roles ───────────────────────────────────────────────────────────────────

/// The part a participant plays in a revision's review.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewRole {
  Reviewer,
  Leader,
  Approver,
}

// ─── ReviewRecord ────────────────────────────────────────────────────────────

/// One participant's record of one revision's review.
///
/// Persisted records are always created with [`ReviewRole::Reviewer`] — the
/// leader's and approver's progress is tracked on the revision's date fields.
/// Leader/approver roles appear only on synthesised placeholder records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
  /// Nil for placeholder records, which never touch the store.
  pub review_id:   Uuid,
  pub document_id: Uuid,
  pub revision:    u32,
  pub reviewer:    Uuid,
  pub role:        ReviewRole,
  /// When this reviewer posted their review, if they have.
  pub reviewed_on: Option<NaiveDate>,
  /// Whether this reviewer's step has been sealed.
  pub closed:      bool,
  /// Path to this reviewer's comments in external file storage.
  pub comments:    Option<String>,
}

impl ReviewRecord {
  /// A fresh record for a reviewer, created when the review starts.
  pub fn new(document_id: Uuid, revision: u32, reviewer: Uuid) -> Self {
    Self {
      review_id: Uuid::new_v4(),
      document_id,
      revision,
      reviewer,
      role: ReviewRole::Reviewer,
      reviewed_on: None,
      closed: false,
      comments: None,
    }
  }

  /// A placeholder record for a revision whose review never started.
  ///
  /// Exists purely so a "not yet started" revision can still display its
  /// intended distribution list.
  pub fn void(
    document_id: Uuid,
    revision: u32,
    role: ReviewRole,
    reviewer: Uuid,
  ) -> Self {
    Self {
      review_id: Uuid::nil(),
      document_id,
      revision,
      reviewer,
      role,
      reviewed_on: None,
      closed: false,
      comments: None,
    }
  }

  pub fn is_void(&self) -> bool {
    self.review_id.is_nil()
  }
}

// ─── RoleComments ────────────────────────────────────────────────────────────

/// A comment attachment, tagged by the role posting it.
///
/// Reviewer comments live on the review record; leader and approver comments
/// live on the revision itself (and are cleared when the review is
/// cancelled).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleComments {
  Reviewer { reviewer: Uuid, path: String },
  Leader { path: String },
  Approver { path: String },
}

impl RoleComments {
  pub fn role(&self) -> ReviewRole {
    match self {
      Self::Reviewer { .. } => ReviewRole::Reviewer,
      Self::Leader { .. } => ReviewRole::Leader,
      Self::Approver { .. } => ReviewRole::Approver,
    }
  }
}
