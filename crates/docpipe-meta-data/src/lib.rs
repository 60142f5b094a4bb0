//! docpipe metadata layer for `PostgreSQL` state management

pub mod credential;
pub mod error;
pub mod migrations;
pub mod mock;
pub mod models;
pub mod pool_manager;
pub mod repository;
pub mod traits;

pub use credential::hash_credential;
pub use error::{MetaDataError, MetaDataResult};
pub use migrations::run_migrations;
pub use mock::MockMetadataStore;
pub use models::{
    Chunk, ChunkCounts, Document, DocumentStatus, Job, JobKind, JobStatus, StatusTransition,
    Tenant,
};
pub use pool_manager::{PoolConfig, PoolManager};
pub use repository::PgDocumentRepository;
pub use traits::DocumentRepository;
