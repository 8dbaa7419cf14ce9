//! Tests for the chunking strategies.

use ragtune_core::{ChunkConfig, ChunkStrategy, ConfigurationError};

use super::helpers::{count_chars, split_fragments, split_sentences, tail_chars};
use super::{chunk_text, chunker_for, Chunk};

fn cfg(size: usize, overlap: usize, strategy: ChunkStrategy) -> ChunkConfig {
    ChunkConfig {
        chunk_size: size,
        overlap,
        strategy,
    }
}

fn collect(text: &str, config: ChunkConfig) -> Vec<Chunk> {
    chunk_text(text, &config).unwrap().collect()
}

const PROSE: &str = "Refunds are issued within 14 days. Contact support with your order number.\n\n\
Shipping is free above 50 EUR. Express delivery costs extra! Is gift wrapping available? Yes, for 3 EUR.\n\n\
Warranty claims need a receipt. Opened software cannot be returned.";

// ── Fixed windows ───────────────────────────────────────────────────

#[test]
fn fixed_windows_overlap_exactly() {
    let text = "abcdefghijklmnopqrstuvwxyz";
    let chunks = collect(text, cfg(10, 3, ChunkStrategy::Fixed));
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["abcdefghij", "hijklmnopq", "opqrstuvwx", "vwxyz"]);
    for pair in chunks.windows(2) {
        assert_eq!(tail_chars(&pair[0].content, 3), &pair[1].content[..3]);
    }
    assert_eq!(chunks[1].offset, 7);
    assert_eq!(chunks.last().unwrap().index, 3);
}

#[test]
fn fixed_last_window_ending_on_boundary_stops() {
    let chunks = collect("abcdefgh", cfg(4, 0, ChunkStrategy::Fixed));
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["abcd", "efgh"]);
}

#[test]
fn fixed_counts_characters_not_bytes() {
    let text = "ääääää";
    let chunks = collect(text, cfg(4, 2, ChunkStrategy::Fixed));
    assert_eq!(chunks[0].content, "ääää");
    assert_eq!(chunks[1].content, "ääää");
    assert_eq!(chunks.len(), 2);
}

#[test]
fn short_text_yields_single_chunk() {
    let chunks = collect("hello", cfg(100, 10, ChunkStrategy::Fixed));
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "hello");
}

#[test]
fn empty_text_yields_nothing() {
    for strategy in ChunkStrategy::ALL {
        assert!(collect("", cfg(10, 2, strategy)).is_empty(), "{strategy}");
    }
}

// ── Word windows ────────────────────────────────────────────────────

#[test]
fn word_windows_share_overlap_tokens() {
    let text = "one two three four five six seven";
    let chunks = collect(text, cfg(3, 1, ChunkStrategy::Words));
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["one two three", "three four five", "five six seven"]
    );
    assert_eq!(chunks[1].offset, text.find("three").unwrap());
}

#[test]
fn word_windows_normalise_whitespace() {
    let chunks = collect("a\n\nb\tc   d", cfg(10, 0, ChunkStrategy::Words));
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "a b c d");
}

// ── Semantic packing ────────────────────────────────────────────────

#[test]
fn semantic_keeps_sentences_whole() {
    let chunks = collect(PROSE, cfg(80, 0, ChunkStrategy::Semantic));
    assert!(chunks.len() >= 3);
    for chunk in &chunks {
        assert!(count_chars(&chunk.content) <= 80, "{:?}", chunk.content);
        let last = chunk.content.trim_end().chars().last().unwrap();
        assert!(matches!(last, '.' | '!' | '?'), "{:?}", chunk.content);
    }
}

#[test]
fn semantic_prepends_previous_tail() {
    let chunks = collect(PROSE, cfg(90, 20, ChunkStrategy::Semantic));
    assert!(chunks.len() >= 2);
    for pair in chunks.windows(2) {
        let tail = tail_chars(&pair[0].content, 20);
        assert!(pair[1].content.starts_with(tail));
        assert_eq!(pair[1].content[tail.len()..].chars().next(), Some('\n'));
    }
}

#[test]
fn semantic_chunks_never_exceed_chunk_size() {
    let short = "Aaaaaaa.\n\nBbbbbbb.\n\nCccccc.";
    for (text, size, overlap) in [
        (short, 10, 3),
        (short, 4, 3),
        (PROSE, 40, 10),
        (PROSE, 90, 20),
        (PROSE, 64, 63),
    ] {
        let chunks = collect(text, cfg(size, overlap, ChunkStrategy::Semantic));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                count_chars(&chunk.content) <= size,
                "size={size} overlap={overlap} {:?}",
                chunk.content
            );
        }
    }
}

#[test]
fn semantic_single_char_body_has_no_separator() {
    let chunks = collect("abcdef", cfg(4, 3, ChunkStrategy::Semantic));
    for pair in chunks.windows(2) {
        let tail = tail_chars(&pair[0].content, 3);
        assert!(pair[1].content.starts_with(tail));
        assert!(!pair[1].content.contains('\n'));
    }
}

#[test]
fn semantic_splits_long_sentences() {
    let long = "x".repeat(250);
    let chunks = collect(&long, cfg(100, 0, ChunkStrategy::Semantic));
    let lens: Vec<usize> = chunks.iter().map(|c| count_chars(&c.content)).collect();
    assert_eq!(lens, vec![100, 100, 50]);
}

#[test]
fn sentence_splitter_requires_capital_or_newline() {
    let parts = split_sentences("Version 2.5 is out. Upgrade now! ok? fine");
    assert_eq!(parts, vec!["Version 2.5 is out.", "Upgrade now! ok? fine"]);
}

#[test]
fn fragments_are_subslices() {
    let frags = split_fragments(PROSE, 40);
    for frag in frags {
        assert!(PROSE.contains(frag));
        assert!(count_chars(frag) <= 40);
    }
}

// ── Contract shared by all strategies ───────────────────────────────

#[test]
fn rechunking_is_deterministic() {
    for strategy in ChunkStrategy::ALL {
        let config = cfg(64, 16, strategy);
        let first = collect(PROSE, config);
        let second = collect(PROSE, config);
        assert_eq!(first, second, "{strategy}");
        assert!(!first.is_empty());
    }
}

#[test]
fn invalid_config_fails_before_chunking() {
    for strategy in ChunkStrategy::ALL {
        let err = chunk_text(PROSE, &cfg(32, 32, strategy)).err();
        assert_eq!(
            err,
            Some(ConfigurationError::OverlapTooLarge {
                chunk_size: 32,
                overlap: 32
            })
        );
        let err = chunk_text(PROSE, &cfg(0, 0, strategy)).err();
        assert_eq!(err, Some(ConfigurationError::ZeroChunkSize));
    }
}

#[test]
fn indices_are_sequential() {
    for strategy in ChunkStrategy::ALL {
        let chunks = collect(PROSE, cfg(50, 10, strategy));
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }
}

#[test]
fn registry_matches_strategy() {
    for strategy in ChunkStrategy::ALL {
        assert_eq!(chunker_for(strategy).strategy(), strategy);
    }
}
