//! Text chunking
//!
//! Splits raw document text into overlapping chunks of bounded size:
//! - Chunks never exceed `size` bytes
//! - Breaks prefer paragraph, then line, then sentence, then word boundaries
//! - Consecutive chunks share up to `overlap` bytes of context
//! - Boundaries are deterministic for the same input and settings

mod boundaries;

pub use boundaries::*;

use crate::config::ChunkConfig;
use blake3::Hasher;

/// A text chunk with its position in the source document
#[derive(Debug, Clone)]
pub struct TextChunk {
    /// The actual text content (trimmed)
    pub text: String,

    /// Byte start position in the original document
    pub char_start: usize,

    /// Byte end position in the original document
    pub char_end: usize,

    /// Chunk index (0-based)
    pub index: usize,

    /// Blake3 hash of the chunk text
    pub hash: String,
}

/// Split `text` into overlapping chunks
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    if text.trim().is_empty() || config.size == 0 {
        return Vec::new();
    }

    let break_points = find_break_points(text);

    let mut chunks = Vec::new();
    let mut current_start = 0;

    while current_start < text.len() {
        let target_end = current_start + config.size;

        let mut chunk_end = if target_end >= text.len() {
            text.len()
        } else {
            find_best_break(text, current_start, target_end, &break_points, config)
        };

        if chunk_end <= current_start {
            // A single character wider than the chunk size
            chunk_end = next_char_boundary(text, current_start);
        }

        let chunk_text = text[current_start..chunk_end].trim();

        if !chunk_text.is_empty() {
            chunks.push(TextChunk {
                text: chunk_text.to_string(),
                char_start: current_start,
                char_end: chunk_end,
                index: chunks.len(),
                hash: compute_text_hash(chunk_text),
            });
        }

        if chunk_end >= text.len() {
            break;
        }

        let overlap_start = next_overlap_start(
            text,
            current_start,
            chunk_end,
            config.overlap,
            &break_points,
        );
        current_start = overlap_start;
    }

    chunks
}

/// Pick the end of a chunk starting at `start`: the strongest break point
/// in the second half of the window, the latest one on ties, or a hard cut.
fn find_best_break(
    text: &str,
    start: usize,
    target: usize,
    break_points: &[BreakPoint],
    config: &ChunkConfig,
) -> usize {
    let min_pos = start + (config.size / 2).max(1);

    let best = break_points
        .iter()
        .filter(|p| p.position >= min_pos && p.position <= target)
        .max_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.position.cmp(&b.position))
        });

    match best {
        Some(point) => point.position,
        None => ensure_char_boundary(text, target),
    }
}

/// Where the next chunk starts: `overlap` bytes back from `end`, nudged
/// forward to a word start so the overlap doesn't begin mid-word. Always
/// makes progress.
fn next_overlap_start(
    text: &str,
    start: usize,
    end: usize,
    overlap: usize,
    break_points: &[BreakPoint],
) -> usize {
    if overlap == 0 {
        return end;
    }

    let raw = ensure_char_boundary(text, end.saturating_sub(overlap));

    let snapped = break_points
        .iter()
        .map(|p| p.position)
        .find(|&pos| pos >= raw && pos < end)
        .unwrap_or(raw);

    if snapped <= start {
        end
    } else {
        snapped
    }
}

/// Compute a stable hash for document content
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().to_hex().to_string()
}

/// Compute a stable hash for a string
pub fn compute_text_hash(text: &str) -> String {
    compute_content_hash(text.as_bytes())
}
