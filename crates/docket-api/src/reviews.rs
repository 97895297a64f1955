//! Handlers for the review workflow endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/documents/:id/revisions/:rev/reviews` | Cached aggregation |
//! | `POST` | `.../start` | 409 if not reviewable |
//! | `POST` | `.../cancel` | Destructive |
//! | `POST` | `.../close-reviewers` `.../close-leader` `.../close` | Step transitions |
//! | `POST` | `.../reviewed` | Body: `{"reviewer":"<uuid>"}` |
//! | `POST` | `.../comments` | Body: [`RoleComments`] |
//! | `POST` | `/reviews/batch-start`, `/reviews/batch-cancel` | Body: `[{"document_id":...,"revision":...}]` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use docket_core::{
  review::{ReviewRecord, RoleComments},
  revision::Revision,
  store::WorkflowStore,
};
use docket_engine::{BatchReport, ReviewEngine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  documents::{RevisionView, require_revision},
  error::ApiError,
};

// ─── Aggregated reads ─────────────────────────────────────────────────────────

/// `GET /documents/:id/revisions/:rev/reviews`
///
/// Served through the aggregation cache: persisted records when the review
/// has (or had) started, synthesised placeholder records otherwise.
pub async fn list_for_revision<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((id, rev)): Path<(Uuid, u32)>,
) -> Result<Json<Vec<ReviewRecord>>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let revision = require_revision(&engine, id, rev).await?;
  let reviews = engine
    .reviews_for_revision(&revision)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(reviews))
}

// ─── Transitions ──────────────────────────────────────────────────────────────

/// `POST /documents/:id/revisions/:rev/start`
///
/// The only handler that checks eligibility itself: the engine treats it as
/// a caller contract, and over HTTP this handler is the caller.
pub async fn start<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((id, rev)): Path<(Uuid, u32)>,
) -> Result<Json<RevisionView>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut revision = require_revision(&engine, id, rev).await?;
  if !revision.is_reviewable() {
    return Err(ApiError::Conflict(format!(
      "revision {rev} of document {id} is not reviewable"
    )));
  }
  engine
    .start_review(&mut revision)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(RevisionView::from(revision)))
}

/// `POST /documents/:id/revisions/:rev/cancel` — destructive: the review
/// history for this revision is permanently lost.
pub async fn cancel<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((id, rev)): Path<(Uuid, u32)>,
) -> Result<Json<RevisionView>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut revision = require_revision(&engine, id, rev).await?;
  engine
    .cancel_review(&mut revision)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(RevisionView::from(revision)))
}

/// `POST /documents/:id/revisions/:rev/close-reviewers`
pub async fn close_reviewers<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((id, rev)): Path<(Uuid, u32)>,
) -> Result<Json<RevisionView>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut revision = require_revision(&engine, id, rev).await?;
  engine
    .end_reviewers_step(&mut revision)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(RevisionView::from(revision)))
}

/// `POST /documents/:id/revisions/:rev/close-leader` — fast-forwards
/// through the reviewers step if it was skipped.
pub async fn close_leader<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((id, rev)): Path<(Uuid, u32)>,
) -> Result<Json<RevisionView>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut revision = require_revision(&engine, id, rev).await?;
  engine
    .end_leader_step(&mut revision)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(RevisionView::from(revision)))
}

/// `POST /documents/:id/revisions/:rev/close` — fast-forwards through any
/// earlier step that was skipped.
pub async fn close<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((id, rev)): Path<(Uuid, u32)>,
) -> Result<Json<RevisionView>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut revision = require_revision(&engine, id, rev).await?;
  engine
    .end_review(&mut revision)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(RevisionView::from(revision)))
}

// ─── Per-reviewer operations ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReviewedBody {
  pub reviewer: Uuid,
}

/// `POST /documents/:id/revisions/:rev/reviewed`
pub async fn mark_reviewed<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((id, rev)): Path<(Uuid, u32)>,
  Json(body): Json<ReviewedBody>,
) -> Result<Json<ReviewRecord>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let record = engine
    .mark_reviewed(id, rev, body.reviewer)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(record))
}

/// `POST /documents/:id/revisions/:rev/comments` — body is a
/// [`RoleComments`], e.g. `{"role":"leader","path":"leader.pdf"}`.
pub async fn attach_comments<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((id, rev)): Path<(Uuid, u32)>,
  Json(body): Json<RoleComments>,
) -> Result<Json<RevisionView>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut revision = require_revision(&engine, id, rev).await?;
  engine
    .attach_comments(&mut revision, body)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(RevisionView::from(revision)))
}

// ─── Batches ──────────────────────────────────────────────────────────────────

/// A `(document, revision)` reference in a batch request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RevisionRef {
  pub document_id: Uuid,
  pub revision:    u32,
}

#[derive(Debug, Serialize)]
pub struct BatchFailureView {
  pub document_id: Uuid,
  pub revision:    u32,
  pub error:       String,
}

#[derive(Debug, Serialize)]
pub struct BatchView {
  pub completed: Vec<RevisionView>,
  pub failed:    Vec<BatchFailureView>,
}

/// Resolve batch references, carrying unresolvable ones straight into the
/// failure list.
async fn resolve_refs<S>(
  engine: &ReviewEngine<S>,
  refs: Vec<RevisionRef>,
) -> Result<(Vec<Revision>, Vec<BatchFailureView>), ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut revisions = Vec::with_capacity(refs.len());
  let mut failed = Vec::new();
  for r in refs {
    match engine
      .store()
      .get_revision(r.document_id, r.revision)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
    {
      Some(revision) => revisions.push(revision),
      None => failed.push(BatchFailureView {
        document_id: r.document_id,
        revision:    r.revision,
        error:       "revision not found".into(),
      }),
    }
  }
  Ok((revisions, failed))
}

fn batch_view<E>(report: BatchReport<E>, mut failed: Vec<BatchFailureView>) -> BatchView
where
  E: std::error::Error + Send + Sync + 'static,
{
  failed.extend(report.failed.into_iter().map(|f| BatchFailureView {
    document_id: f.document_id,
    revision:    f.revision,
    error:       f.error.to_string(),
  }));
  BatchView {
    completed: report.completed.into_iter().map(RevisionView::from).collect(),
    failed,
  }
}

/// `POST /reviews/batch-start` — 207 when some members failed.
pub async fn batch_start<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Json(refs): Json<Vec<RevisionRef>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (revisions, failed) = resolve_refs(&engine, refs).await?;
  let view = batch_view(engine.batch_start(revisions).await, failed);
  let status = if view.failed.is_empty() {
    StatusCode::OK
  } else {
    StatusCode::MULTI_STATUS
  };
  Ok((status, Json(view)))
}

/// `POST /reviews/batch-cancel` — 207 when some members failed.
pub async fn batch_cancel<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Json(refs): Json<Vec<RevisionRef>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (revisions, failed) = resolve_refs(&engine, refs).await?;
  let view = batch_view(engine.batch_cancel(revisions).await, failed);
  let status = if view.failed.is_empty() {
    StatusCode::OK
  } else {
    StatusCode::MULTI_STATUS
  };
  Ok((status, Json(view)))
}
