//! Sentence-boundary chunking for synthesis input.
//!
//! The synthesis tool rejects long inputs, so text is split at sentence
//! boundaries and greedily packed into chunks bounded by
//! [`TtsConfig::max_chunk_chars`](crate::config::TtsConfig::max_chunk_chars).
//! Chunk order is playback order.

use regex::Regex;
use std::sync::LazyLock;

/// A sentence: text up to and including its terminating punctuation run.
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("valid sentence pattern"));

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// Sentences are never split; a single sentence longer than `max_chars`
/// becomes its own (oversized) chunk. Text with no sentence terminator is
/// returned as one chunk. A trailing fragment without terminating
/// punctuation is kept as the final piece. Blank input yields no chunks.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut pieces: Vec<&str> = Vec::new();
    let mut last_end = 0;
    for sentence in SENTENCE.find_iter(text) {
        pieces.push(sentence.as_str());
        last_end = sentence.end();
    }
    let remainder = &text[last_end..];
    if !remainder.trim().is_empty() {
        pieces.push(remainder);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for piece in pieces {
        if !current.is_empty()
            && current.chars().count() + piece.chars().count() > max_chars
        {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(piece);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_chunks("Hello there. How are you?", 1500);
        assert_eq!(chunks, vec!["Hello there. How are you?"]);
    }

    #[test]
    fn blank_input_yields_no_chunks() {
        assert!(split_chunks("", 1500).is_empty());
        assert!(split_chunks("   \n ", 1500).is_empty());
    }

    #[test]
    fn text_without_terminator_is_whole_chunk() {
        let chunks = split_chunks("no punctuation here at all", 1500);
        assert_eq!(chunks, vec!["no punctuation here at all"]);
    }

    #[test]
    fn long_prose_splits_under_the_cap() {
        // ~3000 characters of prose must yield at least two chunks, each
        // within the cap.
        let sentence = "This sentence pads the input with ordinary prose text. ";
        let text = sentence.repeat(55);
        assert!(text.len() >= 3000);

        let chunks = split_chunks(&text, 1500);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1500, "chunk over cap: {}", chunk.len());
        }
    }

    #[test]
    fn concatenation_reconstructs_sentence_sequence() {
        let sentence = "Sentence number padding for the chunker test. ";
        let text = sentence.repeat(70);
        let chunks = split_chunks(&text, 1500);

        // Ignoring boundary trimming, the joined chunks contain exactly the
        // original sentence sequence.
        let rejoined: String = chunks.join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&rejoined), normalize(&text));
    }

    #[test]
    fn trailing_fragment_is_kept() {
        let chunks = split_chunks("First sentence. trailing fragment without stop", 1500);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].ends_with("without stop"));
    }

    #[test]
    fn oversized_sentence_becomes_its_own_chunk() {
        let long_sentence = format!("{}.", "word ".repeat(400));
        let text = format!("Short one. {long_sentence} Short two.");
        let chunks = split_chunks(&text, 100);
        // The oversized sentence is not split, it just occupies one chunk.
        assert!(chunks.iter().any(|c| c.chars().count() > 100));
        assert_eq!(chunks.first().map(String::as_str), Some("Short one."));
        assert_eq!(chunks.last().map(String::as_str), Some("Short two."));
    }

    #[test]
    fn order_is_preserved() {
        let text = "Alpha one. Beta two. Gamma three. Delta four.";
        let chunks = split_chunks(text, 22);
        let joined = chunks.join(" ");
        let alpha = joined.find("Alpha").unwrap();
        let beta = joined.find("Beta").unwrap();
        let gamma = joined.find("Gamma").unwrap();
        let delta = joined.find("Delta").unwrap();
        assert!(alpha < beta && beta < gamma && gamma < delta);
    }

    #[test]
    fn exclamation_and_question_are_boundaries() {
        let chunks = split_chunks("Really! Are you sure? Yes.", 10);
        assert_eq!(chunks, vec!["Really!", "Are you sure?", "Yes."]);
    }
}
