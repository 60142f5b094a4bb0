//! Blob storage capability for docpipe
//!
//! Tenant-prefixed, path-keyed byte storage over the `object_store`
//! ecosystem crate.

pub mod error;
pub mod store;

pub use error::{BlobDataError, BlobDataResult};
pub use store::{BlobStore, ObjectBlobStore};
