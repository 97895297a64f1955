//! Revision — one dated version of a document, with its own independent
//! review cycle.
//!
//! The review workflow is an ordered five-step machine. The current step is
//! never stored; it is computed from four optional date fields, each of which
//! marks the moment a step was left behind (`None` meaning "not yet
//! reached"). Closing a later step fast-forwards through any earlier step
//! that was skipped, filling in its date with today's — this is deliberate
//! behaviour, not an error path.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Steps ───────────────────────────────────────────────────────────────────

/// The five ordered phases of a revision's review.
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
pub enum ReviewStep {
  Pending,
  Reviewers,
  Leader,
  Approver,
  Closed,
}

// ─── Revision ────────────────────────────────────────────────────────────────

/// One dated version of a document's metadata.
///
/// Identity is `(document_id, revision)`. Role assignments may be edited
/// freely before the review starts; the workflow dates are mutated only by
/// the review engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
  pub document_id: Uuid,
  pub revision:    u32,
  pub created_at:  DateTime<Utc>,

  // Workflow dates. `None` means the step has not been reached yet.
  pub review_start_date:     Option<NaiveDate>,
  pub review_due_date:       Option<NaiveDate>,
  pub reviewers_step_closed: Option<NaiveDate>,
  pub leader_step_closed:    Option<NaiveDate>,
  pub review_end_date:       Option<NaiveDate>,

  // Role assignments. Identities are opaque references; the engine only
  // ever compares them for equality.
  pub reviewers: Vec<Uuid>,
  pub leader:    Option<Uuid>,
  pub approver:  Option<Uuid>,

  // Role-specific comment attachments — paths into external file storage.
  pub leader_comments:   Option<String>,
  pub approver_comments: Option<String>,
}

impl Revision {
  // ── Derived state ─────────────────────────────────────────────────────────

  /// The current review step, computed from the four workflow dates.
  ///
  /// The precedence order is fixed: the first unset date wins, from
  /// `review_start_date` down to `review_end_date`.
  pub fn current_step(&self) -> ReviewStep {
    if self.review_start_date.is_none() {
      return ReviewStep::Pending;
    }
    if self.reviewers_step_closed.is_none() {
      return ReviewStep::Reviewers;
    }
    if self.leader_step_closed.is_none() {
      return ReviewStep::Leader;
    }
    if self.review_end_date.is_none() {
      return ReviewStep::Approver;
    }
    ReviewStep::Closed
  }

  pub fn is_at_step(&self, step: ReviewStep) -> bool {
    self.current_step() == step
  }

  /// Is this revision ready to be put under review?
  ///
  /// A revision can only be reviewed once all roles are filled (leader,
  /// approver and at least one reviewer), and only once: a set
  /// `review_start_date` disqualifies it.
  ///
  /// [`start_review`](crate::store::WorkflowStore::persist_review_start)
  /// does NOT check this — it is a caller contract.
  pub fn is_reviewable(&self) -> bool {
    self.leader.is_some()
      && self.approver.is_some()
      && !self.reviewers.is_empty()
      && self.review_start_date.is_none()
  }

  /// Under review iff the review has started but not ended.
  pub fn is_under_review(&self) -> bool {
    self.review_start_date.is_some() && self.review_end_date.is_none()
  }

  /// Overdue iff the due date is set and strictly before `today`.
  /// A review due today is not overdue.
  pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
    self.review_due_date.is_some_and(|due| due < today)
  }

  pub fn is_overdue(&self) -> bool {
    self.is_overdue_on(Utc::now().date_naive())
  }

  pub fn is_reviewer(&self, user: Uuid) -> bool {
    self.reviewers.contains(&user)
  }

  // ── In-memory transitions ─────────────────────────────────────────────────
  //
  // These mutate the value only; persistence is the store's job. The review
  // engine pairs each of them with the matching composite store operation.

  /// Record the review as started today, due `duration_days` later.
  pub fn begin_review(&mut self, today: NaiveDate, duration_days: i64) {
    self.review_start_date = Some(today);
    self.review_due_date = Some(today + Duration::days(duration_days));
  }

  /// Reset every workflow date and the leader/approver comment attachments.
  ///
  /// This reverts the revision to its pre-review state. It loses data.
  pub fn reset_review(&mut self) {
    self.review_start_date = None;
    self.review_due_date = None;
    self.reviewers_step_closed = None;
    self.leader_step_closed = None;
    self.review_end_date = None;
    self.leader_comments = None;
    self.approver_comments = None;
  }

  /// Close the reviewers step.
  pub fn close_reviewers_step(&mut self, today: NaiveDate) {
    self.reviewers_step_closed = Some(today);
  }

  /// Close the leader step, first closing the reviewers step if it was
  /// skipped.
  pub fn close_leader_step(&mut self, today: NaiveDate) {
    self.leader_step_closed = Some(today);
    if self.reviewers_step_closed.is_none() {
      self.close_reviewers_step(today);
    }
  }

  /// Close the review, first closing any earlier step that was skipped.
  pub fn close_review(&mut self, today: NaiveDate) {
    self.review_end_date = Some(today);
    if self.leader_step_closed.is_none() {
      self.close_leader_step(today);
    }
  }
}

// ─── NewRevision ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::WorkflowStore::add_revision`].
/// All workflow dates start unset; `created_at` is set by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRevision {
  pub document_id: Uuid,
  pub revision:    u32,
  #[serde(default)]
  pub reviewers:   Vec<Uuid>,
  pub leader:      Option<Uuid>,
  pub approver:    Option<Uuid>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use uuid::Uuid;

  use super::{ReviewStep, Revision};

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
  }

  fn revision() -> Revision {
    Revision {
      document_id:           Uuid::new_v4(),
      revision:              1,
      created_at:            chrono::Utc::now(),
      review_start_date:     None,
      review_due_date:       None,
      reviewers_step_closed: None,
      leader_step_closed:    None,
      review_end_date:       None,
      reviewers:             vec![Uuid::new_v4(), Uuid::new_v4()],
      leader:                Some(Uuid::new_v4()),
      approver:              Some(Uuid::new_v4()),
      leader_comments:       None,
      approver_comments:     None,
    }
  }

  #[test]
  fn step_precedence_follows_the_date_fields() {
    let mut r = revision();
    assert_eq!(r.current_step(), ReviewStep::Pending);

    r.review_start_date = Some(day(1));
    assert_eq!(r.current_step(), ReviewStep::Reviewers);

    r.reviewers_step_closed = Some(day(2));
    assert_eq!(r.current_step(), ReviewStep::Leader);

    r.leader_step_closed = Some(day(3));
    assert_eq!(r.current_step(), ReviewStep::Approver);

    r.review_end_date = Some(day(4));
    assert_eq!(r.current_step(), ReviewStep::Closed);
  }

  #[test]
  fn reviewable_requires_all_roles_and_no_start_date() {
    let mut r = revision();
    assert!(r.is_reviewable());

    let mut no_leader = r.clone();
    no_leader.leader = None;
    assert!(!no_leader.is_reviewable());

    let mut no_approver = r.clone();
    no_approver.approver = None;
    assert!(!no_approver.is_reviewable());

    let mut no_reviewers = r.clone();
    no_reviewers.reviewers.clear();
    assert!(!no_reviewers.is_reviewable());

    r.review_start_date = Some(day(1));
    assert!(!r.is_reviewable());
  }

  #[test]
  fn under_review_matches_the_three_middle_steps() {
    let mut r = revision();
    assert!(!r.is_under_review()); // Pending

    r.begin_review(day(1), 15);
    assert!(r.is_under_review()); // Reviewers

    r.close_reviewers_step(day(2));
    assert!(r.is_under_review()); // Leader

    r.close_leader_step(day(3));
    assert!(r.is_under_review()); // Approver

    r.close_review(day(4));
    assert!(!r.is_under_review()); // Closed
  }

  #[test]
  fn overdue_is_strict() {
    let mut r = revision();
    assert!(!r.is_overdue_on(day(10))); // no due date

    r.review_due_date = Some(day(10));
    assert!(!r.is_overdue_on(day(9)));
    assert!(!r.is_overdue_on(day(10))); // due today is not overdue
    assert!(r.is_overdue_on(day(11)));
  }

  #[test]
  fn begin_review_sets_start_and_due_dates() {
    let mut r = revision();
    r.begin_review(day(1), 15);
    assert_eq!(r.review_start_date, Some(day(1)));
    assert_eq!(r.review_due_date, Some(day(16)));
  }

  #[test]
  fn closing_the_review_directly_fast_forwards_earlier_steps() {
    let mut direct = revision();
    direct.begin_review(day(1), 15);
    direct.close_review(day(5));

    let mut stepped = revision();
    stepped.begin_review(day(1), 15);
    stepped.close_reviewers_step(day(5));
    stepped.close_leader_step(day(5));
    stepped.close_review(day(5));

    assert_eq!(direct.reviewers_step_closed, stepped.reviewers_step_closed);
    assert_eq!(direct.leader_step_closed, stepped.leader_step_closed);
    assert_eq!(direct.review_end_date, stepped.review_end_date);
    assert_eq!(direct.current_step(), ReviewStep::Closed);
  }

  #[test]
  fn closing_the_leader_step_closes_the_reviewers_step() {
    let mut r = revision();
    r.begin_review(day(1), 15);
    r.close_leader_step(day(3));

    assert_eq!(r.reviewers_step_closed, Some(day(3)));
    assert_eq!(r.leader_step_closed, Some(day(3)));
    assert_eq!(r.current_step(), ReviewStep::Approver);
  }

  #[test]
  fn reset_review_clears_dates_and_attachments() {
    let mut r = revision();
    r.begin_review(day(1), 15);
    r.close_review(day(5));
    r.leader_comments = Some("leader.pdf".into());
    r.approver_comments = Some("approver.pdf".into());

    r.reset_review();

    assert_eq!(r.current_step(), ReviewStep::Pending);
    assert!(r.review_due_date.is_none());
    assert!(r.leader_comments.is_none());
    assert!(r.approver_comments.is_none());
    assert!(r.is_reviewable()); // roles survive the reset
  }
}
