//! End-to-end pipeline scenarios over the in-memory store doubles

mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::Harness;
use docpipe_blob_data::BlobStore;
use docpipe_extraction::{ExtractionError, ExtractionResult, ExtractorRegistry, TextExtractor};
use docpipe_ingestion::{EmbedPayload, JobPayload, JobQueue, QueuedJob, handle_job};
use docpipe_meta_data::{DocumentRepository, DocumentStatus, JobKind, JobStatus};
use docpipe_search::SearchRequest;

#[tokio::test]
async fn happy_path_txt_document() {
    let h = Harness::new();
    let tenant = h.tenant("acme").await;

    let receipt = h
        .service
        .upload(&tenant, "a.txt", Bytes::from_static(b"Hello world. This is a test."))
        .await
        .unwrap();
    assert_eq!(receipt.status, DocumentStatus::Pending);

    h.host.drain_until_idle().await;

    // One chunk, index 0, carrying the full text
    let chunks = h
        .repository
        .get_document_chunks(receipt.document_id)
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[0].text, "Hello world. This is a test.");
    assert!(chunks[0].embedding_path.is_some());

    // One vector point whose id is the chunk id
    let points = h.vectors.all_points();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].id, chunks[0].chunk_id);

    // Aggregate status reached completed
    let document = h
        .repository
        .get_document(receipt.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Completed);

    // The extracted text and chunk blobs exist under the tenant prefix
    let text_path = format!("{}/{}/extracted_text.txt", tenant.tenant_id, receipt.document_id);
    assert!(h.blobs.get(&text_path).await.is_ok());

    // Search finds the chunk at threshold 0
    let hits = h
        .search_service()
        .search(
            tenant.tenant_id,
            &SearchRequest::new("hello").with_threshold(0.0).with_limit(1),
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk_id, chunks[0].chunk_id);
    assert_eq!(hits[0].filename, "a.txt");
}

#[tokio::test]
async fn embedding_artifact_is_readable() {
    let h = Harness::new();
    let tenant = h.tenant("artifacts").await;

    let receipt = h
        .service
        .upload(&tenant, "a.txt", Bytes::from_static(b"Artifact round trip."))
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    let chunks = h
        .repository
        .get_document_chunks(receipt.document_id)
        .await
        .unwrap();
    let artifact_path = chunks[0].embedding_path.clone().unwrap();

    let bytes = h.blobs.get(&artifact_path).await.unwrap();
    let artifact = docpipe_ingestion::decode_artifact(bytes).unwrap();
    assert_eq!(artifact.chunk_id, chunks[0].chunk_id);
    assert_eq!(artifact.vector.len(), common::DIM);
    assert_eq!(
        artifact.payload["tenant_id"],
        serde_json::json!(tenant.tenant_id.to_string())
    );
}

#[tokio::test]
async fn multi_chunk_document_with_overlap() {
    let h = Harness::new();
    let tenant = h.tenant("bulk").await;

    // ~5,000 chars of repeated sentences
    let text = "This is a repeated sentence for the chunker. ".repeat(110);
    let receipt = h
        .service
        .upload(&tenant, "big.txt", Bytes::from(text))
        .await
        .unwrap();

    h.host.drain_until_idle().await;

    let chunks = h
        .repository
        .get_document_chunks(receipt.document_id)
        .await
        .unwrap();
    assert!(chunks.len() >= 3, "expected >= 3 chunks, got {}", chunks.len());

    // Dense 0-based indexes
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index as usize, i);
        assert!(chunk.embedding_path.is_some());
    }

    // Every chunk produced a vector point
    assert_eq!(h.vectors.all_points().len(), chunks.len());

    // The completion predicate's counts agree
    let counts = h
        .repository
        .count_document_chunks(receipt.document_id)
        .await
        .unwrap();
    assert_eq!(counts.total as usize, chunks.len());
    assert_eq!(counts.embedded, counts.total);

    let document = h
        .repository
        .get_document(receipt.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn transient_embed_failures_retry_then_succeed() {
    use docpipe_embeddings::MockEmbeddingProvider;

    // First two embedder calls fail, the third succeeds
    let provider = Arc::new(MockEmbeddingProvider::new(common::DIM).failing_first(2));
    let h = Harness::with(Arc::clone(&provider), ExtractorRegistry::default());
    let tenant = h.tenant("retry").await;

    let receipt = h
        .service
        .upload(&tenant, "a.txt", Bytes::from_static(b"Retry me. Please."))
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    h.host.drain_until_idle().await;
    let elapsed = started.elapsed();

    // The embed job ends completed with retry_count 2
    let jobs = h.repository.get_document_jobs(receipt.document_id).await.unwrap();
    let embed_job = jobs.iter().rev().find(|j| j.kind == JobKind::Embed).unwrap();
    assert_eq!(embed_job.status, JobStatus::Completed);
    assert_eq!(embed_job.retry_count, 2);

    // Backoff slept at least base^1 + base^2 seconds (virtual time)
    assert!(
        elapsed >= std::time::Duration::from_secs(6),
        "expected >= 6s of backoff, saw {elapsed:?}"
    );

    let document = h
        .repository
        .get_document(receipt.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Completed);
}

/// Extractor that fails every time with a decode error
struct BrokenPdfExtractor;

impl TextExtractor for BrokenPdfExtractor {
    fn extract(&self, _bytes: &[u8], filename: &str) -> ExtractionResult<String> {
        Err(ExtractionError::DecodeError {
            filename: filename.to_string(),
            reason: "corrupt xref table".to_string(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn terminal_extract_failure_marks_document_failed() {
    use docpipe_embeddings::MockEmbeddingProvider;

    let extractors =
        ExtractorRegistry::default().register(".pdf", Arc::new(BrokenPdfExtractor));
    let h = Harness::with(Arc::new(MockEmbeddingProvider::new(common::DIM)), extractors);
    let tenant = h.tenant("doomed").await;

    let receipt = h
        .service
        .upload(&tenant, "report.pdf", Bytes::from_static(b"%PDF-1.4 garbage"))
        .await
        .unwrap();

    h.host.drain_until_idle().await;

    // max_retries (3) exhausted: retry_count ends past the limit
    let jobs = h.repository.get_document_jobs(receipt.document_id).await.unwrap();
    let extract_job = jobs.iter().find(|j| j.kind == JobKind::Extract).unwrap();
    assert_eq!(extract_job.status, JobStatus::Failed);
    assert_eq!(extract_job.retry_count, 4);
    assert!(extract_job.error_message.as_deref().unwrap().contains("corrupt"));

    let document = h
        .repository
        .get_document(receipt.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Failed);

    // No chunks, no vectors
    assert!(h.repository.get_document_chunks(receipt.document_id).await.unwrap().is_empty());
    assert!(h.vectors.all_points().is_empty());
}

#[tokio::test]
async fn unsupported_pdf_fails_without_retries() {
    // Default registry has no PDF decoder, so extraction is rejected as a
    // non-retriable input error
    let h = Harness::new();
    let tenant = h.tenant("no-pdf").await;

    let receipt = h
        .service
        .upload(&tenant, "doc.pdf", Bytes::from_static(b"%PDF-1.4"))
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    let jobs = h.repository.get_document_jobs(receipt.document_id).await.unwrap();
    let extract_job = jobs.iter().find(|j| j.kind == JobKind::Extract).unwrap();
    assert_eq!(extract_job.status, JobStatus::Failed);
    assert_eq!(extract_job.retry_count, 0);

    let document = h
        .repository
        .get_document(receipt.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Failed);
}

#[tokio::test]
async fn empty_document_fails_in_the_chunk_stage() {
    let h = Harness::new();
    let tenant = h.tenant("empty").await;

    let receipt = h
        .service
        .upload(&tenant, "blank.txt", Bytes::from_static(b"   \n\t  "))
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    let jobs = h.repository.get_document_jobs(receipt.document_id).await.unwrap();
    let chunk_job = jobs.iter().find(|j| j.kind == JobKind::Chunk).unwrap();
    assert_eq!(chunk_job.status, JobStatus::Failed);

    let document = h
        .repository
        .get_document(receipt.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Failed);
    assert!(h.repository.get_document_chunks(receipt.document_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_validation_rejects_bad_input() {
    let h = Harness::new();
    let tenant = h.tenant("strict").await;

    let err = h
        .service
        .upload(&tenant, "image.png", Bytes::from_static(b"\x89PNG"))
        .await
        .unwrap_err();
    assert!(matches!(err, docpipe_ingestion::IngestError::InvalidInput(_)));

    // Nothing was queued or recorded
    assert_eq!(h.queue.size(JobKind::Extract, None).await.unwrap(), 0);
    assert!(h
        .repository
        .list_tenant_documents(tenant.tenant_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn bulk_upload_reports_per_item_outcomes() {
    let h = Harness::new();
    let tenant = h.tenant("bulk-upload").await;

    let report = h
        .service
        .upload_bulk(
            &tenant,
            vec![
                ("good.txt".to_string(), Bytes::from_static(b"Fine text.")),
                ("bad.png".to_string(), Bytes::from_static(b"nope")),
                ("also-good.txt".to_string(), Bytes::from_static(b"More text.")),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.successful, 2);
    assert_eq!(report.failed, 1);
    assert!(report.items[0].accepted);
    assert!(!report.items[1].accepted);
    assert!(report.items[2].accepted);

    // Only the accepted files were queued
    assert_eq!(h.queue.size(JobKind::Extract, None).await.unwrap(), 2);
}

#[tokio::test]
async fn status_report_exposes_per_stage_progress() {
    let h = Harness::new();
    let tenant = h.tenant("status").await;

    let receipt = h
        .service
        .upload(&tenant, "a.txt", Bytes::from_static(b"Watch my progress."))
        .await
        .unwrap();

    // Before processing: pending, no stage rows yet
    let report = h.service.document_status(&tenant, receipt.document_id).await.unwrap();
    assert_eq!(report.status, DocumentStatus::Pending);
    assert!(report.extract.is_none());

    h.host.drain_until_idle().await;

    let report = h.service.document_status(&tenant, receipt.document_id).await.unwrap();
    assert_eq!(report.status, DocumentStatus::Completed);
    assert_eq!(report.extract.unwrap().status, JobStatus::Completed);
    assert_eq!(report.chunk.unwrap().status, JobStatus::Completed);
    assert_eq!(report.embed.unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn reprocessing_a_chunk_item_is_idempotent() {
    let h = Harness::new();
    let tenant = h.tenant("idempotent").await;

    let receipt = h
        .service
        .upload(&tenant, "a.txt", Bytes::from_static(b"Same state twice. Every time."))
        .await
        .unwrap();

    // Run extract, then capture the chunk item and handle it twice
    h.host.process_one(JobKind::Extract).await.unwrap();
    let chunk_item = h.queue.dequeue(JobKind::Chunk).await.unwrap().unwrap();

    handle_job(&h.ctx, &chunk_item).await.unwrap();
    let first_pass: Vec<_> = {
        let mut rows = h.repository.get_document_chunks(receipt.document_id).await.unwrap();
        rows.sort_by_key(|c| c.chunk_index);
        rows.iter().map(|c| (c.chunk_id, c.chunk_index, c.text.clone())).collect()
    };

    handle_job(&h.ctx, &chunk_item).await.unwrap();
    let second_pass: Vec<_> = {
        let mut rows = h.repository.get_document_chunks(receipt.document_id).await.unwrap();
        rows.sort_by_key(|c| c.chunk_index);
        rows.iter().map(|c| (c.chunk_id, c.chunk_index, c.text.clone())).collect()
    };

    // The duplicate execution changed nothing: same ids, same indexes,
    // same text
    assert_eq!(first_pass, second_pass);

    // Drain the (duplicated) embed jobs; the document still converges
    h.host.drain_until_idle().await;
    let document = h
        .repository
        .get_document(receipt.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Completed);
    assert_eq!(h.vectors.all_points().len(), first_pass.len());
}

#[tokio::test]
async fn reprocessing_an_embed_item_is_idempotent() {
    let h = Harness::new();
    let tenant = h.tenant("re-embed").await;

    let receipt = h
        .service
        .upload(&tenant, "a.txt", Bytes::from_static(b"Embed me once. Embed me twice."))
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    let chunks = h.repository.get_document_chunks(receipt.document_id).await.unwrap();
    let chunk = &chunks[0];
    let points_before = h.vectors.all_points().len();

    // Re-deliver the embed item for an already-embedded chunk
    let duplicate = QueuedJob {
        tenant_id: tenant.tenant_id,
        document_id: receipt.document_id,
        priority: 0,
        correlation_id: docpipe_common::CorrelationId::new(),
        payload: JobPayload::Embed(EmbedPayload {
            chunk_id: chunk.chunk_id,
            chunk_path: format!(
                "{}/{}/chunks/{}",
                tenant.tenant_id, receipt.document_id, chunk.chunk_id
            ),
            filename: "a.txt".to_string(),
        }),
    };
    handle_job(&h.ctx, &duplicate).await.unwrap();

    // Upsert replaced the same point; the document stayed completed
    assert_eq!(h.vectors.all_points().len(), points_before);
    let document = h
        .repository
        .get_document(receipt.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Completed);
}
