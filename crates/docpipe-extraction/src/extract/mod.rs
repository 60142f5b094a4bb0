//! Text extraction: pluggable per-format decoders behind one registry

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ExtractionError, ExtractionResult};

/// Turns raw file bytes into extracted UTF-8 text
///
/// Implementations are synchronous and CPU-bound; callers decide where to
/// run them. PDF decoding plugs in here as another implementation.
pub trait TextExtractor: Send + Sync {
    /// Extract text from the file's bytes
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::DecodeError` when the bytes cannot be
    /// interpreted.
    fn extract(&self, bytes: &[u8], filename: &str) -> ExtractionResult<String>;
}

/// Plain-text extractor: strict UTF-8 first, Windows-1252 fallback
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8], _filename: &str) -> ExtractionResult<String> {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Ok(text.to_string());
        }

        // Single-byte fallback cannot fail; it maps every byte somewhere
        let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
        Ok(decoded.into_owned())
    }
}

/// Lowercased extension of a filename, with the dot
pub fn file_extension(filename: &str) -> Option<String> {
    let dot = filename.rfind('.')?;
    if dot == 0 || dot + 1 == filename.len() {
        return None;
    }
    filename.get(dot..).map(str::to_ascii_lowercase)
}

/// Dispatches extraction by file extension
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Register an extractor for a lowercased extension (with the dot)
    pub fn register(mut self, extension: &str, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractors
            .insert(extension.to_ascii_lowercase(), extractor);
        self
    }

    /// Extract text, dispatching on the filename's extension
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::UnsupportedFormat` for extensions with no
    /// registered extractor, or the extractor's own `DecodeError`.
    pub fn extract(&self, bytes: &[u8], filename: &str) -> ExtractionResult<String> {
        let extension = file_extension(filename).unwrap_or_default();
        let extractor =
            self.extractors
                .get(&extension)
                .ok_or_else(|| ExtractionError::UnsupportedFormat {
                    extension: if extension.is_empty() {
                        "(none)".to_string()
                    } else {
                        extension.clone()
                    },
                })?;

        extractor.extract(bytes, filename)
    }
}

impl Default for ExtractorRegistry {
    /// Registry with the built-in plain-text extractor; PDF support is
    /// registered by the deployment that ships a decoder
    fn default() -> Self {
        Self::new().register(".txt", Arc::new(PlainTextExtractor))
    }
}
