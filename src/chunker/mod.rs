#[cfg(test)]
mod tests;

use crate::{RagError, Result};

/// A contiguous slice of a document's text. Offsets are character offsets
/// into the source text, not byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Split `text` into overlapping windows of `chunk_size` characters, each
/// window advancing by `chunk_size - overlap`. The final chunk may be shorter
/// than `chunk_size`; text that fits in a single window is returned whole.
///
/// Pure function of its inputs.
#[inline]
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(RagError::InvalidConfig(
            "chunk_size must be positive".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(RagError::InvalidConfig(format!(
            "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }

    // Byte offset of every char boundary, so windows never split a code point.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    boundaries.push(text.len());
    let char_count = boundaries.len() - 1;

    if char_count <= chunk_size {
        return Ok(vec![Chunk {
            start: 0,
            end: char_count,
            text: text.to_string(),
        }]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(char_count);
        let slice = text
            .get(boundaries[start]..boundaries[end])
            .unwrap_or_default();
        chunks.push(Chunk {
            start,
            end,
            text: slice.to_string(),
        });
        if end == char_count {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}
