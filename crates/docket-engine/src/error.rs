//! Error type for `docket-engine`, generic over the backing store's error.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  /// A store-level failure, propagated unmodified. The failed transaction
  /// rolled back; no partial state is visible.
  #[error("store error: {0}")]
  Store(#[from] E),

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

  #[error("revision {revision} of document {document_id} is not reviewable")]
  NotReviewable { document_id: Uuid, revision: u32 },
}

pub type Result<T, E> = std::result::Result<T, Error<E>>;
