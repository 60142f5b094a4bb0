//! Vector index abstraction
//!
//! One collection holds every tenant's points; isolation is enforced by a
//! keyword-indexed `tenant_id` payload field that every read and delete
//! must filter on.

pub mod mock;
pub mod qdrant;
mod traits;

pub use mock::MockVectorStorage;
pub use qdrant::QdrantStorage;
pub use traits::{PointPayload, SearchHit, VectorPoint, VectorStorage};
