//! Text extraction and chunking for docpipe
//!
//! The pure text-processing layer of the pipeline: format decoders behind
//! a registry, and the overlapping-window chunker.

pub mod chunking;
pub mod error;
pub mod extract;

pub use chunking::{ChunkingConfig, TextChunk, chunk_text};
pub use error::{ExtractionError, ExtractionResult};
pub use extract::{ExtractorRegistry, PlainTextExtractor, TextExtractor, file_extension};
