//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings; workflow dates as
//! `YYYY-MM-DD`. UUIDs are stored as hyphenated lowercase strings. Roles are
//! stored as their snake_case discriminant.

use chrono::{DateTime, NaiveDate, Utc};
use docket_core::{
  document::Document,
  review::{ReviewRecord, ReviewRole},
  revision::Revision,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ReviewRole ──────────────────────────────────────────────────────────────

pub fn encode_role(r: ReviewRole) -> &'static str {
  match r {
    ReviewRole::Reviewer => "reviewer",
    ReviewRole::Leader => "leader",
    ReviewRole::Approver => "approver",
  }
}

pub fn decode_role(s: &str) -> Result<ReviewRole> {
  match s {
    "reviewer" => Ok(ReviewRole::Reviewer),
    "leader" => Ok(ReviewRole::Leader),
    "approver" => Ok(ReviewRole::Approver),
    other => Err(Error::DateParse(format!("unknown review role: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `documents` row.
pub struct RawDocument {
  pub document_id:      String,
  pub document_key:     String,
  pub title:            String,
  pub created_at:       String,
  pub current_revision: i64,
}

impl RawDocument {
  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id:      decode_uuid(&self.document_id)?,
      document_key:     self.document_key,
      title:            self.title,
      created_at:       decode_dt(&self.created_at)?,
      current_revision: self.current_revision as u32,
    })
  }
}

/// Raw strings read directly from a `revisions` row. The reviewer list is
/// joined in afterwards from `revision_reviewers`.
pub struct RawRevision {
  pub document_id:           String,
  pub revision:              i64,
  pub created_at:            String,
  pub review_start_date:     Option<String>,
  pub review_due_date:       Option<String>,
  pub reviewers_step_closed: Option<String>,
  pub leader_step_closed:    Option<String>,
  pub review_end_date:       Option<String>,
  pub leader:                Option<String>,
  pub approver:              Option<String>,
  pub leader_comments:       Option<String>,
  pub approver_comments:     Option<String>,
}

impl RawRevision {
  pub fn into_revision(self, reviewers: Vec<String>) -> Result<Revision> {
    let decode_opt_date =
      |s: &Option<String>| s.as_deref().map(decode_date).transpose();
    let decode_opt_uuid =
      |s: &Option<String>| s.as_deref().map(decode_uuid).transpose();

    Ok(Revision {
      document_id:           decode_uuid(&self.document_id)?,
      revision:              self.revision as u32,
      created_at:            decode_dt(&self.created_at)?,
      review_start_date:     decode_opt_date(&self.review_start_date)?,
      review_due_date:       decode_opt_date(&self.review_due_date)?,
      reviewers_step_closed: decode_opt_date(&self.reviewers_step_closed)?,
      leader_step_closed:    decode_opt_date(&self.leader_step_closed)?,
      review_end_date:       decode_opt_date(&self.review_end_date)?,
      reviewers:             reviewers
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<Result<_>>()?,
      leader:                decode_opt_uuid(&self.leader)?,
      approver:              decode_opt_uuid(&self.approver)?,
      leader_comments:       self.leader_comments,
      approver_comments:     self.approver_comments,
    })
  }
}

/// Raw strings read directly from a `reviews` row.
pub struct RawReview {
  pub review_id:   String,
  pub document_id: String,
  pub revision:    i64,
  pub reviewer:    String,
  pub role:        String,
  pub reviewed_on: Option<String>,
  pub closed:      bool,
  pub comments:    Option<String>,
}

impl RawReview {
  pub fn into_record(self) -> Result<ReviewRecord> {
    Ok(ReviewRecord {
      review_id:   decode_uuid(&self.review_id)?,
      document_id: decode_uuid(&self.document_id)?,
      revision:    self.revision as u32,
      reviewer:    decode_uuid(&self.reviewer)?,
      role:        decode_role(&self.role)?,
      reviewed_on: self.reviewed_on.as_deref().map(decode_date).transpose()?,
      closed:      self.closed,
      comments:    self.comments,
    })
  }
}
