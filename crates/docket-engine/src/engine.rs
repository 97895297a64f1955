//! [`ReviewEngine`] — the guarded review transitions over a
//! [`WorkflowStore`].
//!
//! Each transition mutates the revision value in memory (the pure state
//! machine lives on [`Revision`]), commits it through one composite store
//! transaction, invalidates the owning document's cache entries, and emits a
//! lifecycle event. Transitions on the same revision are serialised through
//! a per-revision lock.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use docket_core::{
  review::{ReviewRecord, RoleComments},
  revision::{ReviewStep, Revision},
  store::WorkflowStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  cache::ReviewCache,
  config::ReviewConfig,
  error::{Error, Result},
  events::{EventSink, ReviewEvent},
  locks::RevisionLocks,
};

pub struct ReviewEngine<S> {
  store:  Arc<S>,
  config: ReviewConfig,
  cache:  ReviewCache,
  locks:  RevisionLocks,
  sink:   Option<Arc<dyn EventSink>>,
}

impl<S: WorkflowStore> ReviewEngine<S> {
  pub fn new(store: Arc<S>, config: ReviewConfig) -> Self {
    let cache = ReviewCache::new(config.cache_ttl());
    Self {
      store,
      config,
      cache,
      locks: RevisionLocks::new(),
      sink: None,
    }
  }

  /// Attach an observer for review lifecycle events.
  pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
    self.sink = Some(sink);
    self
  }

  /// The underlying store, for plain CRUD that needs no workflow guard.
  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  pub fn config(&self) -> &ReviewConfig {
    &self.config
  }

  fn today() -> NaiveDate {
    Utc::now().date_naive()
  }

  fn notify(&self, event: ReviewEvent) {
    if let Some(sink) = &self.sink {
      sink.emit(&event);
    }
  }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// Start the review: stamp the start/due dates and create one review
  /// record per assigned reviewer.
  ///
  /// Eligibility ([`Revision::is_reviewable`]) is NOT checked here — it is
  /// the caller's contract, and calling this on a non-reviewable revision is
  /// caller error. Debug builds assert it to make misuse loud under test.
  pub async fn start_review(
    &self,
    revision: &mut Revision,
  ) -> Result<Vec<ReviewRecord>, S::Error> {
    let records = self.apply_start(revision).await?;
    self.cache.invalidate_document(revision.document_id).await;
    Ok(records)
  }

  /// Cancel the review, reverting the revision to its pre-review state.
  ///
  /// Deletes every review record for the `(document, revision)` and clears
  /// the workflow dates and leader/approver comment attachments. This is
  /// destructive: the revision's review history is permanently lost.
  pub async fn cancel_review(
    &self,
    revision: &mut Revision,
  ) -> Result<(), S::Error> {
    self.apply_cancel(revision).await?;
    self.cache.invalidate_document(revision.document_id).await;
    Ok(())
  }

  /// Close the reviewers step: stamp its date and seal every review record.
  pub async fn end_reviewers_step(
    &self,
    revision: &mut Revision,
  ) -> Result<(), S::Error> {
    let _guard = self
      .locks
      .acquire(revision.document_id, revision.revision)
      .await;

    revision.close_reviewers_step(Self::today());
    self.store.persist_step_close(revision, true).await?;
    self.cache.invalidate(revision.document_id).await;

    info!(
      document_id = %revision.document_id,
      revision = revision.revision,
      step = %revision.current_step(),
      "reviewers step closed"
    );
    self.notify(ReviewEvent::StepClosed {
      document_id: revision.document_id,
      revision:    revision.revision,
      step:        ReviewStep::Reviewers,
    });
    Ok(())
  }

  /// Close the leader step, first fast-forwarding through the reviewers
  /// step if it was skipped.
  pub async fn end_leader_step(
    &self,
    revision: &mut Revision,
  ) -> Result<(), S::Error> {
    let _guard = self
      .locks
      .acquire(revision.document_id, revision.revision)
      .await;

    let cascades = revision.reviewers_step_closed.is_none();
    revision.close_leader_step(Self::today());
    self.store.persist_step_close(revision, cascades).await?;
    self.cache.invalidate(revision.document_id).await;

    info!(
      document_id = %revision.document_id,
      revision = revision.revision,
      step = %revision.current_step(),
      cascades,
      "leader step closed"
    );
    self.notify(ReviewEvent::StepClosed {
      document_id: revision.document_id,
      revision:    revision.revision,
      step:        ReviewStep::Leader,
    });
    Ok(())
  }

  /// Close the review, first fast-forwarding through any step that was
  /// skipped.
  pub async fn end_review(
    &self,
    revision: &mut Revision,
  ) -> Result<(), S::Error> {
    let _guard = self
      .locks
      .acquire(revision.document_id, revision.revision)
      .await;

    let cascades = revision.reviewers_step_closed.is_none();
    revision.close_review(Self::today());
    self.store.persist_step_close(revision, cascades).await?;
    self.cache.invalidate(revision.document_id).await;

    info!(
      document_id = %revision.document_id,
      revision = revision.revision,
      "review ended"
    );
    self.notify(ReviewEvent::ReviewEnded {
      document_id: revision.document_id,
      revision:    revision.revision,
    });
    Ok(())
  }

  // ── Per-reviewer operations ───────────────────────────────────────────────

  /// Record that `reviewer` posted their review today.
  pub async fn mark_reviewed(
    &self,
    document_id: Uuid,
    revision: u32,
    reviewer: Uuid,
  ) -> Result<ReviewRecord, S::Error> {
    let _guard = self.locks.acquire(document_id, revision).await;

    let mut record = self
      .store
      .get_review(document_id, revision, reviewer)
      .await?
      .ok_or(Error::ReviewNotFound {
        document_id,
        revision,
        reviewer,
      })?;

    record.reviewed_on = Some(Self::today());
    self.store.update_review(&record).await?;
    self.cache.invalidate(document_id).await;
    Ok(record)
  }

  /// Attach a comments file for a role. Reviewer comments live on the
  /// review record; leader and approver comments live on the revision.
  pub async fn attach_comments(
    &self,
    revision: &mut Revision,
    comments: RoleComments,
  ) -> Result<(), S::Error> {
    match comments {
      RoleComments::Reviewer { reviewer, path } => {
        let mut record = self
          .store
          .get_review(revision.document_id, revision.revision, reviewer)
          .await?
          .ok_or(Error::ReviewNotFound {
            document_id: revision.document_id,
            revision: revision.revision,
            reviewer,
          })?;
        record.comments = Some(path);
        self.store.update_review(&record).await?;
        self.cache.invalidate(revision.document_id).await;
      }
      RoleComments::Leader { path } => {
        revision.leader_comments = Some(path);
        self.store.update_revision(revision).await?;
      }
      RoleComments::Approver { path } => {
        revision.approver_comments = Some(path);
        self.store.update_revision(revision).await?;
      }
    }
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// The ordered review records to display for `revision`, served through
  /// the aggregation cache (bounded staleness, see [`ReviewCache`]).
  pub async fn reviews_for_revision(
    &self,
    revision: &Revision,
  ) -> Result<Vec<ReviewRecord>, S::Error> {
    self
      .cache
      .reviews_for_revision(self.store.as_ref(), revision)
      .await
      .map_err(Error::Store)
  }

  /// Drop the cache entries for a document. Collaborators mutating the
  /// document outside the engine (new revisions, role edits) call this.
  pub async fn invalidate_document(&self, document_id: Uuid) {
    self.cache.invalidate_document(document_id).await;
  }

  // ── Shared transition bodies ──────────────────────────────────────────────
  //
  // The public operations invalidate immediately; the batch coordinator
  // runs these and invalidates once per document after the whole batch.

  pub(crate) async fn apply_start(
    &self,
    revision: &mut Revision,
  ) -> Result<Vec<ReviewRecord>, S::Error> {
    debug_assert!(
      revision.is_reviewable(),
      "start_review called on a non-reviewable revision (caller contract)"
    );

    let _guard = self
      .locks
      .acquire(revision.document_id, revision.revision)
      .await;

    revision.begin_review(Self::today(), self.config.review_duration_days);
    let records = self.store.persist_review_start(revision).await?;

    info!(
      document_id = %revision.document_id,
      revision = revision.revision,
      reviewers = records.len(),
      "review started"
    );
    self.notify(ReviewEvent::ReviewStarted {
      document_id: revision.document_id,
      revision:    revision.revision,
      // The due date was just stamped by begin_review.
      due:         revision.review_due_date.unwrap_or_else(Self::today),
    });
    Ok(records)
  }

  pub(crate) async fn apply_cancel(
    &self,
    revision: &mut Revision,
  ) -> Result<(), S::Error> {
    let _guard = self
      .locks
      .acquire(revision.document_id, revision.revision)
      .await;

    revision.reset_review();
    self.store.persist_review_cancel(revision).await?;

    info!(
      document_id = %revision.document_id,
      revision = revision.revision,
      "review canceled"
    );
    self.notify(ReviewEvent::ReviewCanceled {
      document_id: revision.document_id,
      revision:    revision.revision,
    });
    Ok(())
  }
}
