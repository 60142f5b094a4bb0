//! In-memory tenant-fair queue
//!
//! One ordered multi-set per `(tenant, kind)`, keyed by priority (higher
//! first) with insertion order breaking ties. Dispatch per kind walks the
//! non-empty tenant queues round-robin behind a monotonically advancing
//! cursor, so no tenant can starve another however much it enqueues.
//!
//! The cursor is process-local; fairness across horizontally scaled
//! workers is statistical, not coordinated.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use docpipe_meta_data::JobKind;

use crate::queues::{JobQueue, QueueError, QueueResult, QueuedJob};

/// Priority-then-FIFO ordering: lower key dequeues first
type EntryKey = (Reverse<i32>, u64);

#[derive(Default)]
struct KindState {
    /// BTreeMap keeps tenants in a stable order for the cursor walk
    tenants: BTreeMap<Uuid, BTreeMap<EntryKey, Vec<u8>>>,
    /// Last tenant served; the next dequeue starts strictly after it
    cursor: Option<Uuid>,
}

#[derive(Default)]
struct State {
    kinds: HashMap<JobKind, KindState>,
    seq: u64,
}

/// Process-local tenant-fair job queue
#[derive(Default)]
pub struct TenantFairQueue {
    state: Mutex<State>,
}

impl TenantFairQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::unwrap_used)]
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn decode(bytes: &[u8]) -> QueueResult<QueuedJob> {
        serde_json::from_slice(bytes).map_err(|e| QueueError::Serialization(e.to_string()))
    }

    fn pop_from_tenant(
        kind_state: &mut KindState,
        tenant_id: Uuid,
    ) -> QueueResult<Option<QueuedJob>> {
        let Some(queue) = kind_state.tenants.get_mut(&tenant_id) else {
            return Ok(None);
        };
        let Some((_, bytes)) = queue.pop_first() else {
            kind_state.tenants.remove(&tenant_id);
            return Ok(None);
        };
        if queue.is_empty() {
            kind_state.tenants.remove(&tenant_id);
        }
        Self::decode(&bytes).map(Some)
    }

    /// Pick the next tenant after the cursor, wrapping; `None` when every
    /// queue is empty
    fn next_tenant(kind_state: &KindState) -> Option<Uuid> {
        if kind_state.tenants.is_empty() {
            return None;
        }
        let first = kind_state.tenants.keys().next().copied();
        match kind_state.cursor {
            None => first,
            Some(cursor) => kind_state
                .tenants
                .range((std::ops::Bound::Excluded(cursor), std::ops::Bound::Unbounded))
                .next()
                .map(|(tenant, _)| *tenant)
                .or(first),
        }
    }
}

#[async_trait]
impl JobQueue for TenantFairQueue {
    async fn enqueue(&self, job: QueuedJob) -> QueueResult<()> {
        let bytes = serde_json::to_vec(&job)?;
        let kind = job.kind();

        let mut state = self.lock();
        state.seq += 1;
        let key = (Reverse(job.priority), state.seq);
        state
            .kinds
            .entry(kind)
            .or_default()
            .tenants
            .entry(job.tenant_id)
            .or_default()
            .insert(key, bytes);
        Ok(())
    }

    async fn dequeue(&self, kind: JobKind) -> QueueResult<Option<QueuedJob>> {
        let mut state = self.lock();
        let Some(kind_state) = state.kinds.get_mut(&kind) else {
            return Ok(None);
        };

        let Some(tenant_id) = Self::next_tenant(kind_state) else {
            return Ok(None);
        };

        kind_state.cursor = Some(tenant_id);
        Self::pop_from_tenant(kind_state, tenant_id)
    }

    async fn dequeue_from(&self, tenant_id: Uuid, kind: JobKind) -> QueueResult<Option<QueuedJob>> {
        let mut state = self.lock();
        let Some(kind_state) = state.kinds.get_mut(&kind) else {
            return Ok(None);
        };
        Self::pop_from_tenant(kind_state, tenant_id)
    }

    async fn size(&self, kind: JobKind, tenant_id: Option<Uuid>) -> QueueResult<usize> {
        let state = self.lock();
        let Some(kind_state) = state.kinds.get(&kind) else {
            return Ok(0);
        };
        let size = match tenant_id {
            Some(tenant) => kind_state.tenants.get(&tenant).map_or(0, BTreeMap::len),
            None => kind_state.tenants.values().map(BTreeMap::len).sum(),
        };
        Ok(size)
    }

    async fn clear(&self, kind: JobKind, tenant_id: Option<Uuid>) -> QueueResult<usize> {
        let mut state = self.lock();
        let Some(kind_state) = state.kinds.get_mut(&kind) else {
            return Ok(0);
        };
        let removed = match tenant_id {
            Some(tenant) => kind_state
                .tenants
                .remove(&tenant)
                .map_or(0, |queue| queue.len()),
            None => {
                let total = kind_state.tenants.values().map(BTreeMap::len).sum();
                kind_state.tenants.clear();
                total
            }
        };
        Ok(removed)
    }
}
