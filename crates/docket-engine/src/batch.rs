//! Batch start/cancel across many revisions.
//!
//! Each member's transition is its own atomic unit: a failure leaves the
//! already-committed members committed, and the report names the members
//! that failed. Cache invalidation runs once per distinct owning document,
//! after the whole batch, so no reader observes a half-invalidated set
//! mid-batch.

use std::collections::HashSet;

use docket_core::{revision::Revision, store::WorkflowStore};
use tracing::info;
use uuid::Uuid;

use crate::{engine::ReviewEngine, error::Error};

/// One revision a batch operation could not transition.
#[derive(Debug)]
pub struct BatchFailure<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  pub document_id: Uuid,
  pub revision:    u32,
  pub error:       Error<E>,
}

/// The outcome of a batch operation.
#[derive(Debug)]
pub struct BatchReport<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  /// Members whose transition committed, with their updated state.
  pub completed: Vec<Revision>,
  pub failed:    Vec<BatchFailure<E>>,
}

impl<E> BatchReport<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn new() -> Self {
    Self {
      completed: Vec::new(),
      failed:    Vec::new(),
    }
  }

  pub fn is_complete(&self) -> bool {
    self.failed.is_empty()
  }
}

impl<S: WorkflowStore> ReviewEngine<S> {
  /// Start the review on every member.
  ///
  /// Unlike the single-revision operation, non-eligible members are
  /// reported as failures instead of being a caller contract violation —
  /// batch callers select by list, not by inspection.
  pub async fn batch_start(
    &self,
    revisions: Vec<Revision>,
  ) -> BatchReport<S::Error> {
    let mut report = BatchReport::new();
    let mut documents = HashSet::new();

    for mut revision in revisions {
      if !revision.is_reviewable() {
        report.failed.push(BatchFailure {
          document_id: revision.document_id,
          revision:    revision.revision,
          error:       Error::NotReviewable {
            document_id: revision.document_id,
            revision:    revision.revision,
          },
        });
        continue;
      }
      match self.apply_start(&mut revision).await {
        Ok(_) => {
          documents.insert(revision.document_id);
          report.completed.push(revision);
        }
        Err(error) => report.failed.push(BatchFailure {
          document_id: revision.document_id,
          revision: revision.revision,
          error,
        }),
      }
    }

    self.finish_batch("batch start", &documents, &report).await;
    report
  }

  /// Cancel the review on every member.
  pub async fn batch_cancel(
    &self,
    revisions: Vec<Revision>,
  ) -> BatchReport<S::Error> {
    let mut report = BatchReport::new();
    let mut documents = HashSet::new();

    for mut revision in revisions {
      match self.apply_cancel(&mut revision).await {
        Ok(()) => {
          documents.insert(revision.document_id);
          report.completed.push(revision);
        }
        Err(error) => report.failed.push(BatchFailure {
          document_id: revision.document_id,
          revision: revision.revision,
          error,
        }),
      }
    }

    self.finish_batch("batch cancel", &documents, &report).await;
    report
  }

  async fn finish_batch(
    &self,
    operation: &str,
    documents: &HashSet<Uuid>,
    report: &BatchReport<S::Error>,
  ) {
    for &document_id in documents {
      self.invalidate_document(document_id).await;
    }
    info!(
      operation,
      completed = report.completed.len(),
      failed = report.failed.len(),
      documents = documents.len(),
      "batch finished"
    );
  }
}
