//! Text splitting utilities used by chunking strategies.
//!
//! All fragments are subslices of the source text so their byte offsets can
//! be recovered with [`offset_in`].

/// Number of Unicode scalar values in `text`.
pub(crate) fn count_chars(text: &str) -> usize {
    text.chars().count()
}

/// Byte position reached by moving `n` characters forward from byte `from`.
/// Clamps to the end of `text`.
pub(crate) fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// The last `n` characters of `text` (all of it when shorter).
pub(crate) fn tail_chars(text: &str, n: usize) -> &str {
    let total = count_chars(text);
    if total <= n {
        return text;
    }
    let start = advance_chars(text, 0, total - n);
    &text[start..]
}

/// Byte offset of `piece` inside `text`. `piece` must be a subslice of `text`.
pub(crate) fn offset_in(text: &str, piece: &str) -> usize {
    (piece.as_ptr() as usize).saturating_sub(text.as_ptr() as usize)
}

/// Split `text` at sentence boundaries (`. `, `! `, `? ` followed by uppercase
/// or newline). Returns non-empty trimmed fragments.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        let is_terminal = bytes[i] == b'.' || bytes[i] == b'!' || bytes[i] == b'?';
        if is_terminal && i + 1 < bytes.len() && (bytes[i + 1] == b' ' || bytes[i + 1] == b'\n') {
            let after = if i + 2 < bytes.len() { bytes[i + 2] } else { b'\n' };
            if bytes[i + 1] == b'\n' || after.is_ascii_uppercase() || after == b'\n' {
                let end = i + 1; // keep the punctuation
                let s = text[start..end].trim();
                if !s.is_empty() {
                    sentences.push(s);
                }
                start = end + 1;
                i = start;
                continue;
            }
        }
        i += 1;
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Split `text` into paragraph, then sentence, fragments each at most
/// `budget` characters. A sentence longer than `budget` is cut into
/// fixed character windows.
pub(crate) fn split_fragments(text: &str, budget: usize) -> Vec<&str> {
    let mut pieces = Vec::new();

    for para in text.split("\n\n") {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        if count_chars(para) <= budget {
            pieces.push(para);
            continue;
        }
        for sentence in split_sentences(para) {
            if count_chars(sentence) <= budget {
                pieces.push(sentence);
            } else {
                let mut start = 0;
                while start < sentence.len() {
                    let end = advance_chars(sentence, start, budget);
                    pieces.push(&sentence[start..end]);
                    start = end;
                }
            }
        }
    }
    pieces
}

/// Greedily pack fragments into bodies of at most `budget` characters,
/// joined by newlines. Each body carries the byte offset of its first
/// fragment in `text`.
pub(crate) fn pack_fragments(text: &str, fragments: &[&str], budget: usize) -> Vec<(usize, String)> {
    let mut bodies = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0;
    let mut buf_offset = 0;

    for frag in fragments {
        let frag_chars = count_chars(frag);
        if buf.is_empty() {
            buf_offset = offset_in(text, frag);
            buf.push_str(frag);
            buf_chars = frag_chars;
        } else if buf_chars + 1 + frag_chars <= budget {
            buf.push('\n');
            buf.push_str(frag);
            buf_chars += 1 + frag_chars;
        } else {
            bodies.push((buf_offset, std::mem::take(&mut buf)));
            buf_offset = offset_in(text, frag);
            buf.push_str(frag);
            buf_chars = frag_chars;
        }
    }
    if !buf.is_empty() {
        bodies.push((buf_offset, buf));
    }
    bodies
}
