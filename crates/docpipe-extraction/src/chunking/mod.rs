//! Character-window text chunking with sentence-boundary snapping
//!
//! Token counts are approximated as 4 characters per token. Each window
//! extends forward up to `BOUNDARY_WINDOW` characters to the nearest
//! sentence terminator so chunks tend to end on sentence boundaries, and
//! consecutive windows overlap so context survives the cut.

/// How far past the target size to look for a sentence terminator
const BOUNDARY_WINDOW: usize = 200;

/// Characters that end a sentence for boundary snapping
const TERMINATORS: [char; 4] = ['.', '!', '?', '\n'];

/// Approximate characters per token
const CHARS_PER_TOKEN: usize = 4;

/// Chunking window sizes, in characters
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size_chars: usize,
    pub overlap_chars: usize,
}

impl ChunkingConfig {
    /// Build from token-denominated settings
    pub const fn from_tokens(chunk_size_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            chunk_size_chars: chunk_size_tokens * CHARS_PER_TOKEN,
            overlap_chars: overlap_tokens * CHARS_PER_TOKEN,
        }
    }
}

/// One emitted chunk
///
/// `text` is the trimmed window content; `start_char`/`end_char` are the
/// untrimmed character offsets of the window in the source text, so the
/// original can be reassembled from consecutive windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Dense 0-based position; only non-empty windows are counted
    pub index: usize,
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
}

/// Segment text into overlapping chunks
///
/// Scans a window of `chunk_size_chars` from the current position, snaps
/// the end forward to just past the nearest sentence terminator (within
/// `BOUNDARY_WINDOW` characters), emits the trimmed window if non-empty,
/// and advances by `chunk_size - overlap`. The emitted `index` sequence is
/// 0, 1, 2, ... dense.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    while start < len {
        let mut end = start.saturating_add(config.chunk_size_chars).min(len);

        if end < len {
            let window_end = end.saturating_add(BOUNDARY_WINDOW).min(len);
            if let Some(offset) = chars
                .get(end..window_end)
                .and_then(|window| window.iter().position(|c| TERMINATORS.contains(c)))
            {
                end = end + offset + 1;
            }
        }

        let piece: String = chars.get(start..end).map(|s| s.iter().collect()).unwrap_or_default();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                index,
                text: trimmed.to_string(),
                start_char: start,
                end_char: end,
            });
            index += 1;
        }

        if end >= len {
            break;
        }

        let next = end.saturating_sub(config.overlap_chars);
        // Misconfigured overlap must not stall the scan
        start = if next > start { next } else { end };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size_chars: usize, overlap_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size_chars: size_chars,
            overlap_chars,
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("Hello world. This is a test.", &ChunkingConfig::from_tokens(512, 50));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello world. This is a test.");
    }

    #[test]
    fn empty_and_whitespace_texts_yield_nothing() {
        let cfg = ChunkingConfig::from_tokens(512, 50);
        assert!(chunk_text("", &cfg).is_empty());
        assert!(chunk_text("   \n\t  ", &cfg).is_empty());
    }

    #[test]
    fn indexes_are_dense_and_ordered() {
        let text = "One sentence here. ".repeat(400);
        let chunks = chunk_text(&text, &ChunkingConfig::from_tokens(512, 50));
        assert!(chunks.len() >= 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = "Word after word goes on. ".repeat(300);
        let cfg = ChunkingConfig::from_tokens(512, 50);
        let chunks = chunk_text(&text, &cfg);
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let overlap = pair[0].end_char.saturating_sub(pair[1].start_char);
            assert!(overlap > 0, "chunks should share an overlap region");
            assert!(overlap <= cfg.overlap_chars);
        }
    }

    #[test]
    fn boundaries_end_at_terminator_eof_or_window_limit() {
        let text = "Sentences everywhere. They keep arriving! Do they stop? Never\n".repeat(200);
        let chars: Vec<char> = text.chars().collect();
        let chunks = chunk_text(&text, &ChunkingConfig::from_tokens(512, 50));

        for chunk in &chunks {
            let last = chars[chunk.end_char - 1];
            let at_eof = chunk.end_char == chars.len();
            let at_terminator = TERMINATORS.contains(&last);
            // With terminators every ~60 chars the window limit never
            // triggers in this corpus
            assert!(at_eof || at_terminator, "chunk ended at {last:?} mid-window");
        }
    }

    #[test]
    fn window_limit_applies_when_no_terminator_exists() {
        // No terminators at all: every boundary is exactly the window size
        let text = "x".repeat(5000);
        let cfg = config(2048, 200);
        let chunks = chunk_text(&text, &cfg);

        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[0].end_char, 2048);
        assert_eq!(chunks[1].start_char, 2048 - 200);
    }

    #[test]
    fn offsets_reassemble_the_source() {
        let text = "The pipeline hums along. Another sentence lands! More text? Yes.\n".repeat(120);
        let chars: Vec<char> = text.chars().collect();
        let cfg = ChunkingConfig::from_tokens(512, 50);
        let chunks = chunk_text(&text, &cfg);
        assert!(chunks.len() >= 2);

        // Concatenate each chunk's region minus the part already covered
        let mut rebuilt = String::new();
        let mut covered = 0usize;
        for chunk in &chunks {
            let from = chunk.start_char.max(covered);
            rebuilt.extend(&chars[from..chunk.end_char]);
            covered = chunk.end_char;
        }
        let original: String = chars[chunks[0].start_char..covered].iter().collect();
        assert_eq!(rebuilt, original);
        // And the final chunk reaches the end of the text
        assert_eq!(covered, chars.len());
    }

    #[test]
    fn multi_chunk_five_thousand_chars_with_defaults() {
        // ~5000 chars of repeated sentences, defaults 2048/200
        let text = "This is a repeated sentence for the chunker. ".repeat(110);
        let chunks = chunk_text(&text, &ChunkingConfig::from_tokens(512, 50));
        assert!(chunks.len() >= 3, "expected >= 3 chunks, got {}", chunks.len());
        let indexes: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indexes, (0..chunks.len()).collect::<Vec<_>>());
    }
}
