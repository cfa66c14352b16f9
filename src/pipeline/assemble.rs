//! Document assembly: stitch per-page recognition results into one document.
//!
//! The assembled document has two views over the same text:
//!
//! * **display** — page texts prefixed with a page marker (`--- Page N ---`),
//!   the form shown to humans and returned in the raw-text payload. Markers
//!   exist for diagnostics only.
//! * **pure** — the marker-free concatenation the question parser operates
//!   on. Structural matching must never see marker lines, or a marker could
//!   be mistaken for question text.
//!
//! Pages that failed recognition are skipped in both views. Input order does
//! not matter: pages are re-ordered by page index here, so concurrent
//! recognition can never leak completion order into the output.

use crate::config::PageMarker;
use crate::output::RecognizedPage;

/// The assembled document in both its views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    display: String,
    pure: String,
}

impl AssembledDocument {
    /// Display form: page texts with markers, for humans and raw output.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Pure form: marker-free text for the parser.
    pub fn pure(&self) -> &str {
        &self.pure
    }

    /// True when no page contributed any text.
    pub fn is_empty(&self) -> bool {
        self.pure.is_empty()
    }
}

/// Concatenate the successful pages' texts in page-index order.
pub fn assemble(pages: &[RecognizedPage], marker: &PageMarker) -> AssembledDocument {
    let mut ordered: Vec<&RecognizedPage> = pages
        .iter()
        .filter(|p| p.is_success() && !p.text.trim().is_empty())
        .collect();
    ordered.sort_by_key(|p| p.page_num);

    let mut display_parts = Vec::with_capacity(ordered.len());
    let mut pure_parts = Vec::with_capacity(ordered.len());

    for page in ordered {
        let text = page.text.trim();
        match marker.render(page.page_num) {
            Some(line) => display_parts.push(format!("{}\n{}", line, text)),
            None => display_parts.push(text.to_string()),
        }
        pure_parts.push(text.to_string());
    }

    AssembledDocument {
        display: display_parts.join("\n\n"),
        pure: pure_parts.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;

    fn ok_page(page_num: usize, text: &str) -> RecognizedPage {
        RecognizedPage {
            page_num,
            text: text.to_string(),
            duration_ms: 0,
            retries: 0,
            error: None,
        }
    }

    fn failed_page(page_num: usize) -> RecognizedPage {
        RecognizedPage {
            page_num,
            text: String::new(),
            duration_ms: 0,
            retries: 2,
            error: Some(PageError::OcrFailed {
                page: page_num,
                retries: 2,
                detail: "HTTP 500".into(),
            }),
        }
    }

    #[test]
    fn display_carries_markers_pure_does_not() {
        let pages = vec![ok_page(1, "1. Q one (A) x"), ok_page(2, "2. Q two (A) y")];
        let doc = assemble(&pages, &PageMarker::Numbered);

        assert!(doc.display().contains("--- Page 1 ---"));
        assert!(doc.display().contains("--- Page 2 ---"));
        assert!(!doc.pure().contains("--- Page"));
        assert!(doc.pure().contains("1. Q one (A) x"));
        assert!(doc.pure().contains("2. Q two (A) y"));
    }

    #[test]
    fn failed_pages_are_skipped() {
        let pages = vec![ok_page(1, "first"), failed_page(2), ok_page(3, "third")];
        let doc = assemble(&pages, &PageMarker::Numbered);

        assert!(doc.display().contains("--- Page 1 ---"));
        assert!(!doc.display().contains("--- Page 2 ---"));
        assert!(doc.display().contains("--- Page 3 ---"));
        assert_eq!(doc.pure(), "first\nthird");
    }

    #[test]
    fn all_failed_yields_empty() {
        let pages = vec![failed_page(1), failed_page(2)];
        let doc = assemble(&pages, &PageMarker::Numbered);
        assert!(doc.is_empty());
        assert_eq!(doc.display(), "");
    }

    #[test]
    fn completion_order_never_leaks_into_output() {
        // Pages arrive in completion order (3, 1, 2); output must be 1, 2, 3.
        let shuffled = vec![ok_page(3, "three"), ok_page(1, "one"), ok_page(2, "two")];
        let sequential = vec![ok_page(1, "one"), ok_page(2, "two"), ok_page(3, "three")];

        assert_eq!(
            assemble(&shuffled, &PageMarker::Numbered),
            assemble(&sequential, &PageMarker::Numbered)
        );
        assert_eq!(assemble(&shuffled, &PageMarker::None).pure(), "one\ntwo\nthree");
    }

    #[test]
    fn page_text_is_trimmed() {
        let pages = vec![ok_page(1, "  padded text \n")];
        let doc = assemble(&pages, &PageMarker::None);
        assert_eq!(doc.pure(), "padded text");
        assert_eq!(doc.display(), "padded text");
    }
}
