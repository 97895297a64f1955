//! JSON REST API for Docket.
//!
//! Exposes an axum [`Router`] backed by a
//! [`docket_engine::ReviewEngine`] over any
//! [`docket_core::store::WorkflowStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", docket_api::api_router(engine.clone()))
//! ```

pub mod documents;
pub mod error;
pub mod reviews;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use docket_core::store::WorkflowStore;
use docket_engine::{ReviewConfig, ReviewEngine};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "defaults::host")]
  pub host:       String,
  #[serde(default = "defaults::port")]
  pub port:       u16,
  #[serde(default = "defaults::store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub review:     ReviewConfig,
}

mod defaults {
  use std::path::PathBuf;

  pub fn host() -> String { "127.0.0.1".into() }
  pub fn port() -> u16 { 8077 }
  pub fn store_path() -> PathBuf { "docket.db".into() }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<ReviewEngine<S>>) -> Router<()>
where
  S: WorkflowStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Documents
    .route(
      "/documents",
      get(documents::list::<S>).post(documents::create::<S>),
    )
    .route("/documents/{id}", get(documents::get_one::<S>))
    // Revisions
    .route(
      "/documents/{id}/revisions",
      get(documents::list_revisions::<S>)
        .post(documents::create_revision::<S>),
    )
    .route(
      "/documents/{id}/revisions/{rev}",
      get(documents::get_revision::<S>),
    )
    // Review workflow
    .route(
      "/documents/{id}/revisions/{rev}/reviews",
      get(reviews::list_for_revision::<S>),
    )
    .route(
      "/documents/{id}/revisions/{rev}/start",
      post(reviews::start::<S>),
    )
    .route(
      "/documents/{id}/revisions/{rev}/cancel",
      post(reviews::cancel::<S>),
    )
    .route(
      "/documents/{id}/revisions/{rev}/close-reviewers",
      post(reviews::close_reviewers::<S>),
    )
    .route(
      "/documents/{id}/revisions/{rev}/close-leader",
      post(reviews::close_leader::<S>),
    )
    .route(
      "/documents/{id}/revisions/{rev}/close",
      post(reviews::close::<S>),
    )
    .route(
      "/documents/{id}/revisions/{rev}/reviewed",
      post(reviews::mark_reviewed::<S>),
    )
    .route(
      "/documents/{id}/revisions/{rev}/comments",
      post(reviews::attach_comments::<S>),
    )
    // Batches
    .route("/reviews/batch-start", post(reviews::batch_start::<S>))
    .route("/reviews/batch-cancel", post(reviews::batch_cancel::<S>))
    .with_state(engine)
}
