//! Math-delimiter normalisation: wrap each text fragment in exactly one
//! inline-math delimiter pair.
//!
//! Recognition output arrives in three shapes: already delimited
//! (`\(x+y\)`, `$x+y$`), double-wrapped (`\(\(x\)\)` — a known upstream
//! artefact when the service wraps text that was already wrapped), or bare
//! (`x+y`). Downstream renderers need exactly one pair, so this module
//! collapses, passes through, or wraps accordingly.
//!
//! [`normalize_math`] is a pure, total function and is idempotent:
//! `normalize_math(normalize_math(s)) == normalize_math(s)` for every input.
//! Idempotence is what makes it safe to call at any pipeline stage without
//! tracking whether a fragment was already normalised.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Doubled pair → single pair, in both delimiter families.
const DOUBLED: [(&str, &str); 4] = [
    (r"\(\(", r"\("),
    (r"\)\)", r"\)"),
    (r"\[\[", r"\["),
    (r"\]\]", r"\]"),
];

/// Return the fragment wrapped in exactly one inline-math delimiter pair.
///
/// Rules, in order:
/// 1. Collapse doubled delimiters (`\(\(` → `\(`, …) to a fixed point.
/// 2. If the result already starts and ends with a matching pair
///    (`\( \)`, `\[ \]`, or `$ $`), return it unchanged.
/// 3. Otherwise collapse internal whitespace runs to single spaces, trim,
///    and wrap in `\( … \)`.
///
/// The empty string is returned unchanged, unwrapped.
pub fn normalize_math(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let collapsed = collapse_doubled(text);
    if is_delimited(&collapsed) {
        return collapsed;
    }

    let squeezed = RE_WHITESPACE.replace_all(&collapsed, " ");
    let wrapped = format!("\\({}\\)", squeezed.trim());
    // Input that opens with `\(` but never closes would leave a doubled
    // opener after wrapping; collapsing again restores the invariant.
    collapse_doubled(&wrapped)
}

/// Collapse doubled delimiter pairs until nothing changes.
///
/// A single pass is not enough: triple-wrapped input (`\(\(\(x\)\)\)`)
/// still contains a doubled pair after one collapse.
fn collapse_doubled(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut next = current.clone();
        for (doubled, single) in DOUBLED {
            next = next.replace(doubled, single);
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Whether the fragment already starts and ends with a matching pair.
fn is_delimited(text: &str) -> bool {
    (text.starts_with("\\(") && text.ends_with("\\)"))
        || (text.starts_with("\\[") && text.ends_with("\\]"))
        || (text.len() >= 2 && text.starts_with('$') && text.ends_with('$'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_bare_text() {
        assert_eq!(normalize_math("x+y"), "\\(x+y\\)");
    }

    #[test]
    fn empty_string_stays_empty() {
        assert_eq!(normalize_math(""), "");
    }

    #[test]
    fn collapses_double_wrapping() {
        assert_eq!(normalize_math("\\(\\(x\\)\\)"), "\\(x\\)");
        assert_eq!(normalize_math("\\[\\[x\\]\\]"), "\\[x\\]");
    }

    #[test]
    fn collapses_triple_wrapping_to_one_pair() {
        assert_eq!(normalize_math("\\(\\(\\(x\\)\\)\\)"), "\\(x\\)");
    }

    #[test]
    fn already_delimited_passes_through() {
        assert_eq!(normalize_math("$x+y$"), "$x+y$");
        assert_eq!(normalize_math("\\(x+y\\)"), "\\(x+y\\)");
        assert_eq!(normalize_math("\\[x+y\\]"), "\\[x+y\\]");
    }

    #[test]
    fn pass_through_preserves_internal_whitespace() {
        // Whitespace squeezing only applies on the wrap path.
        assert_eq!(normalize_math("\\(x  +  y\\)"), "\\(x  +  y\\)");
    }

    #[test]
    fn squeezes_whitespace_when_wrapping() {
        assert_eq!(normalize_math("  x   +\n\ty  "), "\\(x + y\\)");
    }

    #[test]
    fn lone_dollar_is_not_a_pair() {
        assert_eq!(normalize_math("$"), "\\($\\)");
    }

    #[test]
    fn mismatched_delimiters_are_wrapped() {
        // The opener doubles during wrapping, then collapses back to one.
        assert_eq!(normalize_math("\\(x\\]"), "\\(x\\]\\)");
    }

    #[test]
    fn unbalanced_opener_stays_stable() {
        let once = normalize_math("\\(x");
        assert_eq!(once, "\\(x\\)");
        assert_eq!(normalize_math(&once), once);
    }

    #[test]
    fn idempotent_over_representative_inputs() {
        let samples = [
            "",
            " ",
            "x+y",
            "$x$",
            "$",
            "\\(x\\)",
            "\\(\\(x\\)\\)",
            "\\(\\(\\(x\\)\\)\\)",
            "\\[x\\]",
            "\\(x",
            "x\\)",
            "\\(x\\]",
            "What is 2+2?",
            "a  b\t c",
            "\\(already \\(nested\\) pair\\)",
        ];
        for s in samples {
            let once = normalize_math(s);
            let twice = normalize_math(&once);
            assert_eq!(twice, once, "not idempotent for {:?}", s);
        }
    }
}
