//! Tenant isolation and deletion-cascade properties

mod common;

use bytes::Bytes;
use common::Harness;
use docpipe_blob_data::BlobStore;
use docpipe_ingestion::{IngestError, JobQueue};
use docpipe_meta_data::{DocumentRepository, JobKind};
use docpipe_search::SearchRequest;

#[tokio::test]
async fn chunks_and_points_carry_the_owning_tenant() {
    let h = Harness::new();
    let tenant_a = h.tenant("tenant-a").await;
    let tenant_b = h.tenant("tenant-b").await;

    let doc_a = h
        .service
        .upload(&tenant_a, "a.txt", Bytes::from_static(b"Alpha content lives here."))
        .await
        .unwrap();
    let doc_b = h
        .service
        .upload(&tenant_b, "b.txt", Bytes::from_static(b"Beta content lives here."))
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    // Every chunk row's tenant matches its document's tenant
    for chunk in h.repository.all_chunks() {
        let document = h
            .repository
            .get_document(chunk.document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chunk.tenant_id, document.tenant_id);
    }

    // Every vector point's payload tenant matches its chunk row's tenant
    for point in h.vectors.all_points() {
        let chunk = h.repository.get_chunk(point.id).await.unwrap().unwrap();
        assert_eq!(point.payload.tenant_id, chunk.tenant_id);
    }

    // Both documents completed independently
    for doc in [doc_a.document_id, doc_b.document_id] {
        assert_eq!(
            h.repository.get_document(doc).await.unwrap().unwrap().status,
            docpipe_meta_data::DocumentStatus::Completed
        );
    }
}

#[tokio::test]
async fn search_never_crosses_tenants() {
    let h = Harness::new();
    let tenant_a = h.tenant("owner").await;
    let tenant_b = h.tenant("snoop").await;

    h.service
        .upload(
            &tenant_a,
            "secret.txt",
            Bytes::from_static(b"The launch codes are zebra pelican toast."),
        )
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    let search = h.search_service();

    // Tenant B sees nothing at threshold 0 and maximum limit
    let hits = search
        .search(
            tenant_b.tenant_id,
            &SearchRequest::new("zebra pelican").with_threshold(0.0).with_limit(100),
        )
        .await
        .unwrap();
    assert!(hits.is_empty());

    // Tenant A finds its own content
    let hits = search
        .search(
            tenant_a.tenant_id,
            &SearchRequest::new("zebra pelican").with_threshold(0.0).with_limit(100),
        )
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|hit| hit.tenant_id == tenant_a.tenant_id));
}

#[tokio::test]
async fn deleting_a_document_removes_every_shadow() {
    let h = Harness::new();
    let tenant = h.tenant("cleanup").await;

    let receipt = h
        .service
        .upload(&tenant, "gone.txt", Bytes::from_static(b"Delete all of this. Every copy."))
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    let chunks = h.repository.get_document_chunks(receipt.document_id).await.unwrap();
    assert!(!chunks.is_empty());
    assert!(!h.vectors.all_points().is_empty());

    h.service.delete_document(&tenant, receipt.document_id).await.unwrap();

    // Vectors, chunk rows, blobs, document row, job rows: all gone
    assert!(h.vectors.all_points().is_empty());
    assert!(h.repository.get_document_chunks(receipt.document_id).await.unwrap().is_empty());
    let prefix_blob = format!(
        "{}/{}/extracted_text.txt",
        tenant.tenant_id, receipt.document_id
    );
    assert!(!h.blobs.exists(&prefix_blob).await.unwrap());
    assert!(h.repository.get_document(receipt.document_id).await.unwrap().is_none());
    assert!(matches!(
        h.service.document_status(&tenant, receipt.document_id).await,
        Err(IngestError::NotFound(_))
    ));
}

#[tokio::test]
async fn a_tenant_cannot_touch_anothers_document() {
    let h = Harness::new();
    let owner = h.tenant("owner2").await;
    let intruder = h.tenant("intruder").await;

    let receipt = h
        .service
        .upload(&owner, "mine.txt", Bytes::from_static(b"Property of the owner."))
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    // Status lookups and deletes through the facade come back NotFound
    assert!(matches!(
        h.service.document_status(&intruder, receipt.document_id).await,
        Err(IngestError::NotFound(_))
    ));
    assert!(matches!(
        h.service.delete_document(&intruder, receipt.document_id).await,
        Err(IngestError::NotFound(_))
    ));

    // Nothing was removed
    assert!(!h.vectors.all_points().is_empty());
    assert!(h.repository.get_document(receipt.document_id).await.unwrap().is_some());
}

#[tokio::test]
async fn forged_chunk_ids_cannot_delete_foreign_points() {
    let h = Harness::new();
    let owner = h.tenant("victim").await;
    let attacker = h.tenant("attacker").await;

    h.service
        .upload(&owner, "data.txt", Bytes::from_static(b"Guard these vectors."))
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    let victim_ids = h.vectors.tenant_point_ids(owner.tenant_id);
    assert!(!victim_ids.is_empty());

    // The attacker somehow knows the exact point ids; the tenant filter
    // still protects them
    use docpipe_vector_data::VectorStorage;
    h.vectors
        .delete_points(&victim_ids, attacker.tenant_id)
        .await
        .unwrap();
    assert_eq!(h.vectors.tenant_point_ids(owner.tenant_id), victim_ids);
}

#[tokio::test]
async fn deleting_a_tenant_sweeps_everything_it_owns() {
    let h = Harness::new();
    let doomed = h.tenant("doomed-tenant").await;
    let survivor = h.tenant("survivor").await;

    h.service
        .upload(&doomed, "one.txt", Bytes::from_static(b"First doomed file."))
        .await
        .unwrap();
    h.service
        .upload(&doomed, "two.txt", Bytes::from_static(b"Second doomed file."))
        .await
        .unwrap();
    let kept = h
        .service
        .upload(&survivor, "keep.txt", Bytes::from_static(b"This one stays."))
        .await
        .unwrap();
    h.host.drain_until_idle().await;

    h.service.delete_tenant(doomed.tenant_id).await.unwrap();

    // The doomed tenant's state is gone everywhere
    assert!(h.vectors.tenant_point_ids(doomed.tenant_id).is_empty());
    assert!(h.repository.list_tenant_documents(doomed.tenant_id).await.unwrap().is_empty());
    assert!(h.repository.get_tenant(doomed.tenant_id).await.unwrap().is_none());

    // The survivor is untouched
    assert!(!h.vectors.tenant_point_ids(survivor.tenant_id).is_empty());
    assert!(h.repository.get_document(kept.document_id).await.unwrap().is_some());

    // Queues hold nothing for the deleted tenant
    for kind in JobKind::ALL {
        assert_eq!(h.queue.size(kind, Some(doomed.tenant_id)).await.unwrap(), 0);
    }
}
