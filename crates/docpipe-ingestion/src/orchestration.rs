//! Document orchestration rules
//!
//! Aggregate document status is derived from stage events; these functions
//! are the only places workers touch it. Orchestration owns no process —
//! it runs inside whatever handler observed the event, against the same
//! repository.

use std::sync::Arc;
use uuid::Uuid;

use docpipe_meta_data::{DocumentRepository, DocumentStatus, MetaDataError, MetaDataResult};

/// First extract attempt: `pending -> processing`
///
/// Re-dispatched extract items hit the no-op path of the transition rules;
/// an item re-delivered after the document already finished is allowed to
/// re-run (every stage is idempotent), so a rejected transition is not an
/// error here.
pub async fn on_extract_started(
    repository: &Arc<dyn DocumentRepository>,
    document_id: Uuid,
) -> MetaDataResult<()> {
    match repository
        .set_document_status(document_id, DocumentStatus::Processing)
        .await
    {
        Err(MetaDataError::InvalidTransition { from, to }) => {
            tracing::debug!(
                document_id = %document_id,
                from, to,
                "Extract re-delivered for a settled document"
            );
            Ok(())
        }
        other => other,
    }
}

/// A stage exhausted its retries or failed terminally: `-> failed`
///
/// Best-effort: a document deleted mid-flight (or a racing transition)
/// must not mask the original stage error, so repository errors are
/// logged and swallowed.
pub async fn on_stage_failed(repository: &Arc<dyn DocumentRepository>, document_id: Uuid) {
    if let Err(e) = repository
        .set_document_status(document_id, DocumentStatus::Failed)
        .await
    {
        tracing::warn!(
            document_id = %document_id,
            error = %e,
            "Could not mark document failed"
        );
    }
}

/// An embed completed: finalize the document iff every chunk is embedded
///
/// The count and the transition run in one repository transaction; returns
/// true when the document is completed after the call.
pub async fn on_embed_completed(
    repository: &Arc<dyn DocumentRepository>,
    document_id: Uuid,
) -> MetaDataResult<bool> {
    repository.complete_if_fully_embedded(document_id).await
}
