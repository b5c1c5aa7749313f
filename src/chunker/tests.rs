use super::*;
use crate::RagError;

#[test]
fn zero_chunk_size_rejected() {
    let result = chunk_text("hello", 0, 0);
    assert!(matches!(result, Err(RagError::InvalidConfig(_))));
}

#[test]
fn overlap_equal_to_chunk_size_rejected() {
    let result = chunk_text("hello", 10, 10);
    assert!(matches!(result, Err(RagError::InvalidConfig(_))));

    let result = chunk_text("hello", 10, 11);
    assert!(matches!(result, Err(RagError::InvalidConfig(_))));
}

#[test]
fn short_text_yields_single_chunk() {
    let chunks = chunk_text("hello world", 100, 10).expect("chunking should succeed");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].start, 0);
    assert_eq!(chunks[0].end, 11);
    assert_eq!(chunks[0].text, "hello world");
}

#[test]
fn text_exactly_chunk_size_yields_single_chunk() {
    let text = "a".repeat(100);
    let chunks = chunk_text(&text, 100, 10).expect("chunking should succeed");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text);
}

#[test]
fn window_offsets_for_3000_chars() {
    let text: String = (0..3000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let chunks = chunk_text(&text, 1200, 200).expect("chunking should succeed");

    assert_eq!(chunks.len(), 3);
    assert_eq!((chunks[0].start, chunks[0].end), (0, 1200));
    assert_eq!((chunks[1].start, chunks[1].end), (1000, 2200));
    assert_eq!((chunks[2].start, chunks[2].end), (2000, 3000));
    assert_eq!(chunks[0].text.chars().count(), 1200);
    assert_eq!(chunks[2].text.chars().count(), 1000);
}

#[test]
fn final_chunk_may_be_short() {
    let text = "x".repeat(250);
    let chunks = chunk_text(&text, 100, 20).expect("chunking should succeed");

    // Windows advance by 80: 0-100, 80-180, 160-250.
    assert_eq!(chunks.len(), 3);
    assert_eq!((chunks[2].start, chunks[2].end), (160, 250));
    assert_eq!(chunks[2].text.len(), 90);
}

#[test]
fn dropping_overlap_reconstructs_original() {
    let text: String = "The quick brown fox jumps over the lazy dog. ".repeat(40);
    let chunk_size = 300;
    let overlap = 75;
    let chunks = chunk_text(&text, chunk_size, overlap).expect("chunking should succeed");
    assert!(chunks.len() > 1);

    let mut rebuilt = chunks[0].text.clone();
    for pair in chunks.windows(2) {
        let skip = pair[0].end - pair[1].start;
        rebuilt.extend(pair[1].text.chars().skip(skip));
    }
    assert_eq!(rebuilt, text);
}

#[test]
fn multibyte_text_is_split_on_char_boundaries() {
    let text = "héllo wörld ".repeat(50);
    let chunks = chunk_text(&text, 100, 25).expect("chunking should succeed");

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert_eq!(chunk.text.chars().count(), chunk.end - chunk.start);
    }
    // No chunk text may be empty or torn mid code point (String construction
    // would have panicked on invalid boundaries via the safe slice).
    assert!(chunks.iter().all(|c| !c.text.is_empty()));
}

#[test]
fn empty_text_yields_single_empty_chunk() {
    let chunks = chunk_text("", 100, 10).expect("chunking should succeed");

    assert_eq!(chunks.len(), 1);
    assert_eq!((chunks[0].start, chunks[0].end), (0, 0));
    assert!(chunks[0].text.is_empty());
}

#[test]
fn adjacent_chunks_share_overlap_region() {
    let text: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let chunks = chunk_text(&text, 400, 100).expect("chunking should succeed");

    for pair in chunks.windows(2) {
        let tail: String = pair[0].text.chars().skip(pair[0].text.chars().count() - 100).collect();
        let head: String = pair[1].text.chars().take(100).collect();
        assert_eq!(tail, head);
    }
}
