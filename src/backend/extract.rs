//! Agent trace extraction.
//!
//! The external agent is not a structured-output API: it prints a
//! human-readable run trace that ends in a Python-literal-style marker,
//! `Workflow Result: ['...']`, optionally colored with terminal escape
//! sequences. This module is the isolated text-format parser over that
//! unversioned contract — brittle by construction, so every step degrades
//! to an explicit typed failure rather than a wrong answer.
//!
//! Grammar (v1):
//!
//! ```text
//! trace     := .* marker .*
//! marker    := "Workflow Result:" ws payload
//! payload   := "['<Document" attrs ">\n" TEXT "\n</Document>']"   (A)
//!            | "[" quote TEXT quote "]"                           (B)
//! quote     := "'" | '"'
//! ```
//!
//! Pattern A (a research tool's document wrapper) is tried before the
//! generic pattern B so a wrapped payload never leaks its XML shell. The
//! first marker occurrence in the cleaned trace wins. `TEXT` carries
//! literal `\n`, `\'` and `\"` escapes, which are undone before returning.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{MercuryError, Result};

/// CSI color/control sequences: `ESC [ params letter`.
static ANSI_CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-9;]*[a-zA-Z]").expect("valid CSI pattern"));

/// OSC title-set prefix: `ESC ] 0 ;`.
static ANSI_OSC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\]0;").expect("valid OSC pattern"));

/// Pattern A: document-wrapped payload.
static DOCUMENT_RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Workflow Result:\s*\['<Document[^>]*>\\n(.*?)\\n</Document>'\]")
        .expect("valid document-result pattern")
});

/// Pattern B: bare quoted payload, single or double quotes.
static PLAIN_RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)Workflow Result:\s*\[['"](.*?)['"]\]"#).expect("valid plain-result pattern")
});

/// Remove terminal escape sequences and carriage returns from a trace.
pub fn strip_ansi(raw: &str) -> String {
    let no_csi = ANSI_CSI.replace_all(raw, "");
    let no_osc = ANSI_OSC.replace_all(&no_csi, "");
    no_osc.replace('\r', "").trim().to_owned()
}

/// Undo the trace's string-literal escapes.
fn unescape(payload: &str) -> String {
    payload
        .replace("\\n", "\n")
        .replace("\\'", "'")
        .replace("\\\"", "\"")
        .trim()
        .to_owned()
}

/// Extract the agent's final answer from its raw combined output.
///
/// # Errors
///
/// [`MercuryError::UnrecognizedFormat`] when no parseable result marker
/// is present — never an empty success.
pub fn extract(raw_trace: &str) -> Result<String> {
    let clean = strip_ansi(raw_trace);

    if let Some(captures) = DOCUMENT_RESULT.captures(&clean) {
        return Ok(unescape(&captures[1]));
    }

    if let Some(captures) = PLAIN_RESULT.captures(&clean) {
        return Ok(unescape(&captures[1]));
    }

    Err(MercuryError::UnrecognizedFormat(
        "agent output contained no parseable workflow result".to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_single_quoted_payload() {
        let trace = "2024-01-01 INFO agent done\nWorkflow Result: ['line one\\nline two']\n";
        assert_eq!(extract(trace).unwrap(), "line one\nline two");
    }

    #[test]
    fn plain_double_quoted_payload() {
        let trace = r#"Workflow Result: ["hello there"]"#;
        assert_eq!(extract(trace).unwrap(), "hello there");
    }

    #[test]
    fn document_wrapped_payload_is_unwrapped() {
        let trace = "Workflow Result: ['<Document id=1>\\nhello world\\n</Document>']";
        assert_eq!(extract(trace).unwrap(), "hello world");
    }

    #[test]
    fn document_wrapper_wins_over_plain_match() {
        // The generic pattern would also match this payload and return the
        // XML shell; the document rule must take priority.
        let trace = "Workflow Result: ['<Document source=wiki>\\nNikola Tesla was an inventor.\\n</Document>']";
        assert_eq!(extract(trace).unwrap(), "Nikola Tesla was an inventor.");
    }

    #[test]
    fn ansi_sequences_are_stripped_before_matching() {
        let trace = "\x1b[32mINFO\x1b[0m running\r\n\x1b]0;Workflow Result: \x1b[1m['ok']\x1b[0m";
        assert_eq!(extract(trace).unwrap(), "ok");
    }

    #[test]
    fn escaped_quotes_are_unescaped() {
        let trace = r#"Workflow Result: ['it\'s \" quoted']"#;
        assert_eq!(extract(trace).unwrap(), "it's \" quoted");
    }

    #[test]
    fn first_marker_occurrence_wins() {
        let trace = "Workflow Result: ['first']\nlater noise\nWorkflow Result: ['second']";
        assert_eq!(extract(trace).unwrap(), "first");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let trace = "Workflow Result: ['  padded answer  ']";
        assert_eq!(extract(trace).unwrap(), "padded answer");
    }

    #[test]
    fn marker_embedded_in_long_trace() {
        let trace = format!(
            "{}\nWorkflow Result: ['answer']\n{}",
            "tool call line\n".repeat(50),
            "shutdown line\n".repeat(5)
        );
        assert_eq!(extract(&trace).unwrap(), "answer");
    }

    #[test]
    fn no_marker_is_unrecognized_format() {
        let err = extract("the agent crashed before printing anything").unwrap_err();
        assert_eq!(err.code(), "UNRECOGNIZED_FORMAT");
    }

    #[test]
    fn empty_trace_is_unrecognized_format() {
        let err = extract("").unwrap_err();
        assert_eq!(err.code(), "UNRECOGNIZED_FORMAT");
    }

    #[test]
    fn marker_without_bracketed_payload_is_unrecognized() {
        let err = extract("Workflow Result: something unquoted").unwrap_err();
        assert_eq!(err.code(), "UNRECOGNIZED_FORMAT");
    }

    #[test]
    fn strip_ansi_removes_csi_and_osc() {
        let cleaned = strip_ansi("\x1b[1;32mbold\x1b[0m \x1b]0;title\rtext");
        assert_eq!(cleaned, "bold titletext");
    }

    #[test]
    fn multiline_payload_with_windows_line_endings() {
        let trace = "Workflow Result:\r\n['step one\\nstep two']";
        assert_eq!(extract(trace).unwrap(), "step one\nstep two");
    }
}
