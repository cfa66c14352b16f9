//! Output types: per-page recognition results, parsed questions, and the
//! response payloads handed to transport layers.
//!
//! Everything here is `serde`-serialisable so a hosting HTTP layer can return
//! results directly, and so runs can be logged and diffed.

use crate::error::{ExtractError, PageError};
use serde::{Deserialize, Serialize};

/// The recognition result for a single page.
///
/// Pages are transient inside the pipeline; this is the durable record of
/// what happened to each one. `error.is_some()` means the page contributed
/// no text but the rest of the document was still processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Recognised text (may contain inline LaTeX markers). Empty on failure.
    pub text: String,
    /// Wall-clock time spent on this page's recognition call(s).
    pub duration_ms: u64,
    /// Number of retries consumed before success or giving up.
    pub retries: u8,
    /// Why the page produced no text, if it didn't.
    pub error: Option<PageError>,
}

impl RecognizedPage {
    /// Whether this page contributed text to the assembled document.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Document metadata extracted from the PDF without rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Aggregate statistics for one extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages whose recognition call produced text.
    pub recognized_pages: usize,
    /// Pages that failed recognition or returned empty text.
    pub failed_pages: usize,
    /// Selected pages that were never recognised (render skipped them).
    pub skipped_pages: usize,
    /// Candidate text blocks the parser dropped as unparsable.
    pub skipped_blocks: usize,
    /// Questions emitted by the parser.
    pub question_count: usize,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
    /// Time spent rasterising pages.
    pub render_duration_ms: u64,
    /// Time spent in recognition calls (including retries).
    pub ocr_duration_ms: u64,
}

/// One parsed multiple-choice question.
///
/// `number` is carried through as it appeared in the source — gaps and
/// duplicates are not validated. `text` and every option are already wrapped
/// in inline math delimiters by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question number as printed in the document.
    pub number: String,
    /// Normalised question text.
    pub text: String,
    /// Normalised option texts, in extraction order. The option letters are
    /// consumed during splitting and not retained.
    pub options: Vec<String>,
}

impl Question {
    /// Render the question as an HTML fragment: one `<p>` for the question
    /// text followed by one `<p>` per option.
    ///
    /// Fragments are emitted raw — the delimited LaTeX inside is meant for a
    /// client-side math renderer, so entity-escaping would corrupt it.
    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(
            self.text.len() + self.options.iter().map(|o| o.len() + 7).sum::<usize>() + 7,
        );
        html.push_str("<p>");
        html.push_str(&self.text);
        html.push_str("</p>");
        for option in &self.options {
            html.push_str("<p>");
            html.push_str(option);
            html.push_str("</p>");
        }
        html
    }
}

/// The complete result of a successful extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// Assembled recognised text in display form (with page markers).
    pub text: String,
    /// Parsed questions, in document order.
    pub questions: Vec<Question>,
    /// Per-page recognition records, sorted by page number.
    pub pages: Vec<RecognizedPage>,
    /// Document metadata.
    pub metadata: DocumentMetadata,
    /// Run statistics.
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// HTML fragments for all questions, in extraction order.
    pub fn questions_html(&self) -> Vec<String> {
        self.questions.iter().map(Question::to_html).collect()
    }

    /// The success payload consumed by transport layers:
    /// `{ "success": true, "text": …, "questions": [html…] }`.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "text": self.text,
            "questions": self.questions_html(),
        })
    }
}

/// The error payload counterpart of [`ExtractionOutput::to_payload`]:
/// `{ "success": false, "error": message, "client_error": bool }`.
pub fn error_payload(err: &ExtractError) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "error": err.to_string(),
        "client_error": err.is_client_error(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question() -> Question {
        Question {
            number: "1".into(),
            text: "\\(What is 2+2?\\)".into(),
            options: vec!["\\(3\\)".into(), "\\(4\\)".into(), "\\(5\\)".into()],
        }
    }

    #[test]
    fn question_html_is_one_paragraph_per_fragment() {
        let html = sample_question().to_html();
        assert_eq!(html.matches("<p>").count(), 4);
        assert!(html.starts_with("<p>\\(What is 2+2?\\)</p>"));
        assert!(html.ends_with("<p>\\(5\\)</p>"));
    }

    #[test]
    fn question_html_preserves_latex_unescaped() {
        let q = Question {
            number: "2".into(),
            text: "\\(x < y\\)".into(),
            options: vec!["\\(a & b\\)".into()],
        };
        let html = q.to_html();
        assert!(html.contains("x < y"), "delimiters must not be escaped");
        assert!(html.contains("a & b"));
    }

    #[test]
    fn success_payload_shape() {
        let output = ExtractionOutput {
            text: "--- Page 1 ---\n1. Q (A) x".into(),
            questions: vec![sample_question()],
            pages: vec![],
            metadata: DocumentMetadata::default(),
            stats: ExtractionStats::default(),
        };
        let payload = output.to_payload();
        assert_eq!(payload["success"], true);
        assert!(payload["text"].as_str().unwrap().contains("--- Page 1 ---"));
        assert_eq!(payload["questions"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn error_payload_shape() {
        let err = ExtractError::NoTextExtracted {
            total: 3,
            first_error: "blank".into(),
        };
        let payload = error_payload(&err);
        assert_eq!(payload["success"], false);
        assert_eq!(payload["client_error"], true);
        assert!(payload["error"].as_str().unwrap().contains("3 pages"));
    }
}
