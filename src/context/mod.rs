
use std::path::Path;

use crate::index::SearchHit;

/// Separator between context blocks in the assembled prompt.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Assemble retrieved chunks into the context string fed to the model. Each
/// hit becomes a labelled block:
///
/// ```text
/// [notes.txt#chunk2] (score=0.871)
/// <chunk text>
/// ```
///
/// Blocks are kept in hit order. The first block is always included even if
/// it alone exceeds `max_chars`; later blocks are added whole only while the
/// running length stays within the budget. `max_chars` of 0 disables the
/// bound.
#[inline]
pub fn build_context(hits: &[SearchHit], max_chars: usize) -> String {
    let mut blocks: Vec<String> = Vec::with_capacity(hits.len());
    let mut total = 0usize;

    for hit in hits {
        let block = format_block(hit);
        let added = if blocks.is_empty() {
            block.chars().count()
        } else {
            block.chars().count() + CONTEXT_DELIMITER.len()
        };
        if max_chars > 0 && !blocks.is_empty() && total + added > max_chars {
            break;
        }
        total += added;
        blocks.push(block);
    }

    blocks.join(CONTEXT_DELIMITER)
}

fn format_block(hit: &SearchHit) -> String {
    // Label with the file name only; CSV row suffixes survive because '#'
    // is not a path separator.
    let label = Path::new(&hit.record.source)
        .file_name()
        .map_or_else(|| hit.record.source.clone(), |name| name.to_string_lossy().into_owned());
    format!(
        "[{label}#chunk{}] (score={:.3})\n{}",
        hit.record.chunk_index, hit.score, hit.record.text
    )
}
