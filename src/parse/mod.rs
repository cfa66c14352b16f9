//! Question parsing: turn recognised text into question/option records.
//!
//! Parsing is a two-stage tokenizer/scanner rather than one grand regex:
//!
//! 1. **Block segmentation** — the document is split into candidate blocks
//!    at every question marker (`<digits>.`). The split is a lookahead: the
//!    marker stays with the block it introduces.
//! 2. **Block scan** — each block is matched for its leading `N.` prefix,
//!    then scanned for option markers `(A)`–`(E)` with an explicit two-state
//!    scan (before-first-option / inside-option). Question text is the span
//!    between the prefix and the first option marker; each option's text
//!    runs to the next marker or the end of the block.
//!
//! Keeping the two stages explicit makes the failure modes visible: a block
//! without a numeric prefix, or without any surviving option, is dropped —
//! silently as far as the caller's result is concerned, but counted in
//! [`ParseOutcome::skipped_blocks`] and logged for diagnostics. Question
//! numbers are carried through as printed; gaps and duplicates are not
//! validated.
//!
//! Every emitted fragment is passed through [`normalize::normalize_math`]
//! so the output is uniformly delimited for math rendering.

pub mod normalize;

use crate::output::Question;
use normalize::normalize_math;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// A question marker: digits followed by a period, anywhere in the text.
static RE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.").unwrap());

/// The numeric prefix a block must open with to be a question.
static RE_QUESTION_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\.").unwrap());

/// An option marker: a parenthesised uppercase letter A–E.
static RE_OPTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([A-E])\)").unwrap());

/// Result of parsing one assembled document.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// Questions in document order.
    pub questions: Vec<Question>,
    /// Non-blank candidate blocks that did not yield a question.
    pub skipped_blocks: usize,
}

/// Parse the pure (marker-free) assembled text into question records.
pub fn parse_questions(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for block in split_blocks(text) {
        if block.trim().is_empty() {
            continue;
        }
        match parse_block(block) {
            Some(question) => outcome.questions.push(question),
            None => {
                outcome.skipped_blocks += 1;
                debug!(
                    "Dropped unparsable block: {:?}",
                    block.chars().take(60).collect::<String>()
                );
            }
        }
    }

    outcome
}

/// Split the text into candidate blocks, one per question marker.
///
/// A boundary is inserted immediately before each `<digits>.` occurrence;
/// the marker itself stays with the block that follows. Text before the
/// first marker becomes its own block (which then fails the prefix match
/// and is counted as skipped).
fn split_blocks(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = RE_MARKER.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return vec![text];
    }

    let mut blocks = Vec::with_capacity(starts.len() + 1);
    if starts[0] > 0 {
        blocks.push(&text[..starts[0]]);
    }
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        blocks.push(&text[start..end]);
    }
    blocks
}

/// Option-scan state: the span before the first marker belongs to the
/// question; each span after a marker belongs to that marker's option.
enum Scan {
    BeforeFirstOption,
    InsideOption { text_start: usize },
}

/// Parse one block into a question, or `None` if it doesn't fit the shape.
fn parse_block(block: &str) -> Option<Question> {
    let head = RE_QUESTION_HEAD.captures(block)?;
    let number = head[1].to_string();
    let body = &block[head.get(0)?.end()..];

    let mut question_end = body.len();
    let mut options = Vec::new();
    let mut state = Scan::BeforeFirstOption;

    for marker in RE_OPTION.find_iter(body) {
        match state {
            Scan::BeforeFirstOption => question_end = marker.start(),
            Scan::InsideOption { text_start } => {
                push_option(&mut options, &body[text_start..marker.start()]);
            }
        }
        // The letter is consumed here; only the option text survives.
        state = Scan::InsideOption {
            text_start: marker.end(),
        };
    }
    if let Scan::InsideOption { text_start } = state {
        push_option(&mut options, &body[text_start..]);
    }

    let question_text = body[..question_end].trim();
    if question_text.is_empty() || options.is_empty() {
        return None;
    }

    Some(Question {
        number,
        text: normalize_math(question_text),
        options,
    })
}

/// Trim, drop empties, normalise.
fn push_option(options: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        options.push(normalize_math(trimmed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_question() {
        let outcome = parse_questions("1. What is 2+2? (A) 3 (B) 4 (C) 5");
        assert_eq!(outcome.skipped_blocks, 0);
        assert_eq!(outcome.questions.len(), 1);

        let q = &outcome.questions[0];
        assert_eq!(q.number, "1");
        assert_eq!(q.text, "\\(What is 2+2?\\)");
        assert_eq!(q.options, vec!["\\(3\\)", "\\(4\\)", "\\(5\\)"]);
    }

    #[test]
    fn block_without_options_is_dropped() {
        let outcome = parse_questions("2. Orphan question with no options");
        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.skipped_blocks, 1);
    }

    #[test]
    fn splits_multiple_questions() {
        let text = "1. First? (A) a (B) b\n2. Second? (A) c (B) d";
        let outcome = parse_questions(text);
        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.questions[0].number, "1");
        assert_eq!(outcome.questions[1].number, "2");
        assert_eq!(outcome.questions[1].options, vec!["\\(c\\)", "\\(d\\)"]);
    }

    #[test]
    fn multi_digit_number_is_one_marker() {
        let outcome = parse_questions("12. Dozen? (A) yes (B) no");
        assert_eq!(outcome.questions.len(), 1);
        assert_eq!(outcome.questions[0].number, "12");
    }

    #[test]
    fn number_gaps_and_duplicates_pass_through() {
        let text = "3. Three? (A) x\n7. Seven? (A) y\n7. Again? (A) z";
        let numbers: Vec<String> = parse_questions(text)
            .questions
            .into_iter()
            .map(|q| q.number)
            .collect();
        assert_eq!(numbers, vec!["3", "7", "7"]);
    }

    #[test]
    fn letters_need_not_be_contiguous_or_start_at_a() {
        let outcome = parse_questions("1. Pick one (B) beta (D) delta");
        assert_eq!(outcome.questions.len(), 1);
        assert_eq!(
            outcome.questions[0].options,
            vec!["\\(beta\\)", "\\(delta\\)"]
        );
    }

    #[test]
    fn empty_options_are_dropped() {
        // (A)'s span before (B) is blank; only (B) survives.
        let outcome = parse_questions("1. Choose (A) (B) real");
        assert_eq!(outcome.questions.len(), 1);
        assert_eq!(outcome.questions[0].options, vec!["\\(real\\)"]);
    }

    #[test]
    fn all_options_empty_drops_question() {
        let outcome = parse_questions("1. Choose (A) (B) (C)");
        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.skipped_blocks, 1);
    }

    #[test]
    fn leading_prose_before_first_marker_is_skipped() {
        let text = "Answer all questions.\n1. Real? (A) yes (B) no";
        let outcome = parse_questions(text);
        assert_eq!(outcome.questions.len(), 1);
        assert_eq!(outcome.skipped_blocks, 1);
    }

    #[test]
    fn options_spanning_lines_are_captured() {
        let text = "1. Evaluate the sum\nof the series (A) it\ndiverges (B) 0";
        let outcome = parse_questions(text);
        let q = &outcome.questions[0];
        assert_eq!(q.text, "\\(Evaluate the sum of the series\\)");
        assert_eq!(q.options, vec!["\\(it diverges\\)", "\\(0\\)"]);
    }

    #[test]
    fn lowercase_letters_are_not_markers() {
        let outcome = parse_questions("1. Pick (a) one (b) two");
        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.skipped_blocks, 1);
    }

    #[test]
    fn delimited_fragments_pass_through_unwrapped() {
        let outcome = parse_questions("1. Solve (A) \\(x=2\\) (B) $x=3$");
        assert_eq!(
            outcome.questions[0].options,
            vec!["\\(x=2\\)", "$x=3$"]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        let outcome = parse_questions("");
        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.skipped_blocks, 0);
    }

    #[test]
    fn split_blocks_keeps_marker_with_following_block() {
        let blocks = split_blocks("intro 1. one 2. two");
        assert_eq!(blocks, vec!["intro ", "1. one ", "2. two"]);
    }
}
