//! Embedding generation: provider traits, remote provider, test double

pub mod mock;
pub mod remote;
pub mod service;
mod traits;

pub use mock::MockEmbeddingProvider;
pub use remote::HttpEmbeddingProvider;
pub use service::DefaultEmbeddingService;
pub use traits::{EmbeddingProvider, EmbeddingService};
