//! Paragraph-aware text chunker.
//!
//! Splits a document into ordered chunks of at most `max_len` characters,
//! packing whole paragraphs (then whole words) before falling back to
//! hard-slicing a single over-length word. Splitting at paragraph and word
//! boundaries keeps semantic units intact for embedding; the length cap
//! mirrors the embedding provider's input-size ceiling.

use std::sync::LazyLock;

use regex::Regex;

static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n{3,}").expect("newline-run pattern is valid")
});

/// Normalizes line endings: CRLF becomes LF and runs of three or more
/// newlines collapse to exactly two.
pub fn normalize(text: &str) -> String {
    let unix = text.replace("\r\n", "\n");
    NEWLINE_RUNS.replace_all(&unix, "\n\n").into_owned()
}

/// Splits `text` into ordered, non-empty chunks of at most `max_len`
/// characters each.
///
/// Whole paragraphs are packed greedily (joined by a blank line); a
/// paragraph that alone exceeds `max_len` is re-split by whitespace into
/// words (joined by single spaces); a single word longer than `max_len` is
/// sliced into `max_len`-character pieces.
///
/// Input that is empty after trimming yields an empty sequence; callers are
/// expected to reject empty documents before chunking.
pub fn chunk(text: &str, max_len: usize) -> Vec<String> {
    let normalized = normalize(text);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for paragraph in normalized.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let para_chars = paragraph.chars().count();

        if para_chars > max_len {
            flush(&mut chunks, &mut current, &mut current_chars);
            pack_words(paragraph, max_len, &mut chunks);
            continue;
        }

        let candidate = if current.is_empty() {
            para_chars
        } else {
            current_chars + 2 + para_chars
        };

        if candidate <= max_len {
            if !current.is_empty() {
                current.push_str("\n\n");
                current_chars += 2;
            }
            current.push_str(paragraph);
            current_chars += para_chars;
        } else {
            flush(&mut chunks, &mut current, &mut current_chars);
            current.push_str(paragraph);
            current_chars = para_chars;
        }
    }
    flush(&mut chunks, &mut current, &mut current_chars);

    if chunks.is_empty() {
        let trimmed = normalized.trim();
        if !trimmed.is_empty() {
            chunks.push(truncate_chars(trimmed, max_len));
        }
    }

    chunks
}

/// Packs whitespace-delimited words into chunks, joining with single spaces.
/// A word longer than `max_len` is emitted as fixed-size slices.
fn pack_words(paragraph: &str, max_len: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_chars = 0usize;

    for word in paragraph.split_whitespace() {
        let word_chars = word.chars().count();

        if word_chars > max_len {
            flush(out, &mut current, &mut current_chars);
            out.extend(slice_word(word, max_len));
            continue;
        }

        let candidate = if current.is_empty() {
            word_chars
        } else {
            current_chars + 1 + word_chars
        };

        if candidate <= max_len {
            if !current.is_empty() {
                current.push(' ');
                current_chars += 1;
            }
            current.push_str(word);
            current_chars += word_chars;
        } else {
            flush(out, &mut current, &mut current_chars);
            current.push_str(word);
            current_chars = word_chars;
        }
    }
    flush(out, &mut current, &mut current_chars);
}

fn slice_word(word: &str, max_len: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_len)
        .map(|piece| piece.iter().collect())
        .collect()
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    text.chars().take(max_len).collect()
}

fn flush(chunks: &mut Vec<String>, current: &mut String, current_chars: &mut usize) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
        *current_chars = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripped(text: &str) -> String {
        text.split_whitespace().collect()
    }

    #[test]
    fn packs_short_paragraphs_into_one_chunk() {
        let text = "First paragraph.\n\nSecond paragraph.";
        let chunks = chunk(text, 100);
        assert_eq!(chunks, vec!["First paragraph.\n\nSecond paragraph."]);
    }

    #[test]
    fn flushes_when_next_paragraph_would_overflow() {
        let text = "aaaa aaaa\n\nbbbb bbbb\n\ncccc";
        let chunks = chunk(text, 20);
        assert_eq!(chunks, vec!["aaaa aaaa\n\nbbbb bbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn every_chunk_respects_max_len() {
        let text = "word ".repeat(500);
        for max_len in [1usize, 7, 30, 120] {
            for piece in chunk(&text, max_len) {
                assert!(piece.chars().count() <= max_len, "max_len={max_len} piece={piece:?}");
                assert!(!piece.is_empty());
            }
        }
    }

    #[test]
    fn concatenation_reconstructs_text_modulo_whitespace() {
        let text = "Intro line.\r\n\r\n\r\nBody with several words here.\n\nTail paragraph ends.";
        let chunks = chunk(text, 25);
        assert_eq!(stripped(&chunks.concat()), stripped(text));
    }

    #[test]
    fn over_length_paragraph_is_split_by_words() {
        let text = "alpha beta gamma delta epsilon zeta";
        let chunks = chunk(text, 12);
        assert_eq!(
            chunks,
            vec!["alpha beta", "gamma delta", "epsilon zeta"]
        );
    }

    #[test]
    fn over_length_word_is_sliced_into_fixed_pieces() {
        let word = "abcdefghijklmnopqrstuvwxy";
        let chunks = chunk(word, 10);
        assert_eq!(chunks.len(), 3); // ceil(25 / 10)
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(chunks[1].chars().count(), 10);
        assert_eq!(chunks[2].chars().count(), 5);
        assert_eq!(chunks.concat(), word);
    }

    #[test]
    fn newline_runs_collapse_to_blank_line() {
        let normalized = normalize("a\n\n\n\n\nb\r\nc");
        assert_eq!(normalized, "a\n\nb\nc");
    }

    #[test]
    fn whitespace_only_input_yields_no_chunks() {
        assert!(chunk("   \n\n  \t ", 100).is_empty());
        assert!(chunk("", 100).is_empty());
    }

    #[test]
    fn multibyte_words_are_sliced_on_char_boundaries() {
        let word = "åäöüßéñ";
        let chunks = chunk(word, 3);
        assert_eq!(chunks, vec!["åäö", "üßé", "ñ"]);
        assert_eq!(chunks.concat(), word);
    }
}
