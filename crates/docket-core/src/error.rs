//! Error types for `docket-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("document not found: {0}")]
  DocumentNotFound(Uuid),

  #[error("revision {revision} of document {document_id} not found")]
  RevisionNotFound { document_id: Uuid, revision: u32 },

  #[error(
    "no review by {reviewer} for revision {revision} of document \
     {document_id}"
  )]
  ReviewNotFound {
    document_id: Uuid,
    revision:    u32,
    reviewer:    Uuid,
  },

  #[error("document key already taken: {0:?}")]
  DuplicateDocumentKey(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
