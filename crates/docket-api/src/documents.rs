//! Handlers for `/documents` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/documents` | Optional `?key=<document_key>` exact match |
//! | `POST` | `/documents` | Body: [`NewDocument`] |
//! | `GET`  | `/documents/:id` | 404 if not found |
//! | `GET`  | `/documents/:id/revisions` | Newest first, with derived state |
//! | `POST` | `/documents/:id/revisions` | Body: [`NewRevisionBody`] |
//! | `GET`  | `/documents/:id/revisions/:rev` | Single revision |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use docket_core::{
  document::{Document, NewDocument},
  revision::{NewRevision, ReviewStep, Revision},
  store::WorkflowStore,
};
use docket_engine::ReviewEngine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Views ────────────────────────────────────────────────────────────────────

/// A revision together with its derived review state.
#[derive(Debug, Serialize)]
pub struct RevisionView {
  #[serde(flatten)]
  pub revision:        Revision,
  pub current_step:    ReviewStep,
  pub is_under_review: bool,
  pub is_overdue:      bool,
  pub is_reviewable:   bool,
}

impl From<Revision> for RevisionView {
  fn from(revision: Revision) -> Self {
    Self {
      current_step:    revision.current_step(),
      is_under_review: revision.is_under_review(),
      is_overdue:      revision.is_overdue(),
      is_reviewable:   revision.is_reviewable(),
      revision,
    }
  }
}

// ─── Shared lookups ───────────────────────────────────────────────────────────

/// Load a revision or produce the 404 the transition handlers share.
pub(crate) async fn require_revision<S>(
  engine: &ReviewEngine<S>,
  document_id: Uuid,
  revision: u32,
) -> Result<Revision, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  engine
    .store()
    .get_revision(document_id, revision)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "revision {revision} of document {document_id} not found"
      ))
    })
}

// ─── List / create documents ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub key: Option<String>,
}

/// `GET /documents[?key=<document_key>]`
pub async fn list<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Document>>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let store = engine.store();
  let documents = match params.key.as_deref() {
    Some(key) => store
      .get_document_by_key(key)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
      .into_iter()
      .collect(),
    None => store
      .list_documents()
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?,
  };
  Ok(Json(documents))
}

/// `POST /documents` — body: `{"document_key":"...","title":"..."}`
pub async fn create<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Json(body): Json<NewDocument>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let document = engine
    .store()
    .add_document(body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(document)))
}

/// `GET /documents/:id`
pub async fn get_one<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let document = engine
    .store()
    .get_document(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("document {id} not found")))?;
  Ok(Json(document))
}

// ─── Revisions ────────────────────────────────────────────────────────────────

/// `GET /documents/:id/revisions` — newest first.
pub async fn list_revisions<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<RevisionView>>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let revisions = engine
    .store()
    .list_revisions(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(revisions.into_iter().map(RevisionView::from).collect()))
}

/// JSON body accepted by `POST /documents/:id/revisions`. The document id
/// comes from the path.
#[derive(Debug, Deserialize)]
pub struct NewRevisionBody {
  pub revision:  u32,
  #[serde(default)]
  pub reviewers: Vec<Uuid>,
  pub leader:    Option<Uuid>,
  pub approver:  Option<Uuid>,
}

/// `POST /documents/:id/revisions` — returns 201 + the revision view.
pub async fn create_revision<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewRevisionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let revision = engine
    .store()
    .add_revision(NewRevision {
      document_id: id,
      revision:    body.revision,
      reviewers:   body.reviewers,
      leader:      body.leader,
      approver:    body.approver,
    })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  // A new revision changes the document's placeholder distribution lists.
  engine.invalidate_document(id).await;

  Ok((StatusCode::CREATED, Json(RevisionView::from(revision))))
}

/// `GET /documents/:id/revisions/:rev`
pub async fn get_revision<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((id, rev)): Path<(Uuid, u32)>,
) -> Result<Json<RevisionView>, ApiError>
where
  S: WorkflowStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let revision = require_revision(&engine, id, rev).await?;
  Ok(Json(RevisionView::from(revision)))
}
