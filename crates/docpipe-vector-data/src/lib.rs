//! Vector index capability for docpipe

pub mod error;
pub mod storage;

pub use error::{VectorDataError, VectorDataResult};
pub use storage::{MockVectorStorage, PointPayload, QdrantStorage, SearchHit, VectorPoint, VectorStorage};
