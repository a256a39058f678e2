//! Transformation Pipeline - pure string-rewrite strategies
//!
//! Strategies never re-validate their input; callers validate first.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;

use crate::errors::ErrorKind;

/// One indentation level.
pub const INDENT_UNIT: &str = "  ";

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n[ \t]*").unwrap());

// Held spans are replaced by `U+E000 <index> U+E001`; no step rewrites
// private-use characters or digits.
const HOLD_OPEN: char = '\u{E000}';
const HOLD_CLOSE: char = '\u{E001}';
static HOLD_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").unwrap());

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Minification produced no output from {input_bytes} bytes of input")]
    MinificationFailed { input_bytes: usize },

    #[error("Formatting failed: {0}")]
    FormattingFailed(String),

    #[error("Invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Output write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::MinificationFailed { .. } => ErrorKind::MinificationFailed,
            TransformError::FormattingFailed(_) => ErrorKind::FormattingFailed,
            TransformError::Pattern(_)
            | TransformError::Malformed(_)
            | TransformError::Io(_) => ErrorKind::ProcessingFailed,
        }
    }
}

/// Whether [`Lexicon::hold`] drops comments or holds them like literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comments {
    Drop,
    Keep,
}

/// Comment and literal syntax of one language.
///
/// Both are matched in a single left-to-right scan, so a comment marker
/// inside a string literal is not a comment and a quote inside a comment
/// does not open a literal.
#[derive(Debug, Clone)]
pub struct Lexicon {
    tokens: Regex,
}

impl Lexicon {
    /// `comments` and `literals` are regex alternations.
    pub fn new(comments: &str, literals: &str) -> Result<Self, TransformError> {
        let tokens = Regex::new(&format!(
            "(?P<comment>{})|(?P<literal>{})",
            comments, literals
        ))?;
        Ok(Self { tokens })
    }

    /// Replace every comment with a single space; literals are untouched.
    pub fn strip_comments(&self, text: &str) -> String {
        self.tokens
            .replace_all(text, |caps: &Captures| {
                if caps.name("comment").is_some() {
                    " ".to_string()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Swap literals (and kept comments) for markers, recording the spans in
    /// `held` for [`HeldSpans::restore`].
    ///
    /// Text that already contains a marker character is not held.
    pub fn hold(&self, text: &str, comments: Comments, held: &mut HeldSpans) -> String {
        if text.contains(HOLD_OPEN) {
            return match comments {
                Comments::Drop => self.strip_comments(text),
                Comments::Keep => text.to_string(),
            };
        }
        self.tokens
            .replace_all(text, |caps: &Captures| {
                if comments == Comments::Drop && caps.name("comment").is_some() {
                    " ".to_string()
                } else {
                    held.push(&caps[0])
                }
            })
            .into_owned()
    }
}

/// Source spans set aside by [`Lexicon::hold`].
#[derive(Debug, Default)]
pub struct HeldSpans(Vec<String>);

impl HeldSpans {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, span: &str) -> String {
        self.0.push(span.to_string());
        format!("{}{}{}", HOLD_OPEN, self.0.len() - 1, HOLD_CLOSE)
    }

    /// Put every held span back in place of its marker.
    pub fn restore(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        HOLD_MARKER
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.0.get(i))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A minification step. [`minify`] always runs steps in stage order:
/// comments, whitespace, line breaks, then rewrites.
#[derive(Debug, Clone)]
pub enum MinifyStep {
    StripComments(Regex),
    /// Drop comments and keep literals out of reach of every later step.
    Lexical(Lexicon),
    CollapseWhitespace,
    RemoveLineBreaks,
    Rewrite { pattern: Regex, replacement: String },
}

impl MinifyStep {
    pub fn strip_comments(pattern: &str) -> Result<Self, TransformError> {
        Ok(MinifyStep::StripComments(Regex::new(pattern)?))
    }

    pub fn rewrite(pattern: &str, replacement: &str) -> Result<Self, TransformError> {
        Ok(MinifyStep::Rewrite {
            pattern: Regex::new(pattern)?,
            replacement: replacement.to_string(),
        })
    }

    fn stage(&self) -> u8 {
        match self {
            MinifyStep::StripComments(_) | MinifyStep::Lexical(_) => 0,
            MinifyStep::CollapseWhitespace => 1,
            MinifyStep::RemoveLineBreaks => 2,
            MinifyStep::Rewrite { .. } => 3,
        }
    }

    pub fn apply(&self, text: &str) -> String {
        match self {
            MinifyStep::StripComments(pattern) => strip_comments(text, pattern),
            MinifyStep::Lexical(lexicon) => lexicon.strip_comments(text),
            MinifyStep::CollapseWhitespace => collapse_whitespace(text),
            MinifyStep::RemoveLineBreaks => remove_line_breaks(text),
            MinifyStep::Rewrite {
                pattern,
                replacement,
            } => pattern.replace_all(text, replacement.as_str()).into_owned(),
        }
    }
}

pub fn strip_comments(text: &str, pattern: &Regex) -> String {
    pattern.replace_all(text, "").into_owned()
}

/// Every whitespace run becomes a single space.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").into_owned()
}

/// Drop line breaks together with the indentation that follows them.
pub fn remove_line_breaks(text: &str) -> String {
    LINE_BREAK.replace_all(text, "").into_owned()
}

/// Run `steps` in stage order and trim the result.
///
/// Literals held by a [`MinifyStep::Lexical`] step come back unchanged.
/// Empty output from non-blank input is a `MinificationFailed` error.
pub fn minify(text: &str, steps: &[MinifyStep]) -> Result<String, TransformError> {
    let mut ordered: Vec<&MinifyStep> = steps.iter().collect();
    ordered.sort_by_key(|step| step.stage());

    let mut held = HeldSpans::new();
    let mut out = text.to_string();
    for step in ordered {
        out = match step {
            MinifyStep::Lexical(lexicon) => lexicon.hold(&out, Comments::Drop, &mut held),
            step => step.apply(&out),
        };
    }
    let out = held.restore(out.trim());

    if out.is_empty() && !text.trim().is_empty() {
        return Err(TransformError::MinificationFailed {
            input_bytes: text.len(),
        });
    }
    Ok(out)
}

pub fn insert_line_breaks(text: &str, pattern: &Regex, replacement: &str) -> String {
    pattern.replace_all(text, replacement).into_owned()
}

/// Re-indent non-blank lines by `indent_level(line, index, lines)` units.
/// Negative levels clamp to zero; blank lines come back empty.
pub fn format<F>(lines: &[String], indent_level: F) -> Vec<String>
where
    F: Fn(&str, usize, &[String]) -> i64,
{
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let content = line.trim();
            if content.is_empty() {
                return String::new();
            }
            let level = indent_level(line, index, lines).max(0) as usize;
            format!("{}{}", INDENT_UNIT.repeat(level), content)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_stripped_before_whitespace() {
        // Collapsing first would join the lines and the line comment would
        // swallow `FROM t`.
        let steps = vec![
            MinifyStep::RemoveLineBreaks,
            MinifyStep::CollapseWhitespace,
            MinifyStep::strip_comments(r"(?m)--.*$").unwrap(),
        ];
        let out = minify("SELECT a -- pick a\nFROM t", &steps).unwrap();
        assert_eq!(out, "SELECT a FROM t");
    }

    #[test]
    fn test_empty_result_is_failure() {
        let steps = vec![MinifyStep::strip_comments(r"(?s)/\*.*?\*/").unwrap()];
        let err = minify("/* only a comment */", &steps).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MinificationFailed);
    }

    #[test]
    fn test_remove_line_breaks() {
        assert_eq!(remove_line_breaks("a {\n    b;\r\n}"), "a {b;}");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \n\t b   c"), "a b c");
    }

    #[test]
    fn test_rewrite_runs_last() {
        let steps = vec![
            MinifyStep::rewrite(r"\s*([{};:])\s*", "$1").unwrap(),
            MinifyStep::CollapseWhitespace,
        ];
        assert_eq!(minify("p  {\n color : red ; }", &steps).unwrap(), "p{color:red;}");
    }

    #[test]
    fn test_bad_pattern_is_error() {
        assert!(matches!(
            MinifyStep::strip_comments("(unclosed"),
            Err(TransformError::Pattern(_))
        ));
    }

    #[test]
    fn test_format_indents_and_clamps() {
        let lines: Vec<String> = ["a", "b", "", "c"].iter().map(|s| s.to_string()).collect();
        let out = format(&lines, |_, index, _| index as i64 - 1);
        assert_eq!(out, vec!["a", "b", "", "    c"]);
    }

    #[test]
    fn test_insert_line_breaks() {
        let re = Regex::new(r";\s*").unwrap();
        assert_eq!(insert_line_breaks("a;b; c", &re, ";\n"), "a;\nb;\nc");
    }

    fn c_like() -> Lexicon {
        Lexicon::new(r"//[^\n]*|/\*(?s:.*?)\*/", r#""(?:\\(?s:.)|[^"\\])*""#).unwrap()
    }

    #[test]
    fn test_lexicon_ignores_markers_inside_literals() {
        let lexicon = c_like();
        assert_eq!(
            lexicon.strip_comments("a(\"http://x\"); // c\nb /* \" */ d"),
            "a(\"http://x\");  \nb   d"
        );
    }

    #[test]
    fn test_literals_survive_every_step() {
        let steps = vec![
            MinifyStep::Lexical(c_like()),
            MinifyStep::CollapseWhitespace,
            MinifyStep::rewrite(r"\s*([;,])\s*", "$1").unwrap(),
        ];
        let out = minify("x = \"a ;  b\" ; // tail\ny = 1", &steps).unwrap();
        assert_eq!(out, "x = \"a ;  b\";y = 1");
    }

    #[test]
    fn test_hold_and_restore_keeping_comments() {
        let mut held = HeldSpans::new();
        let masked = c_like().hold("f(\"s\") // note", Comments::Keep, &mut held);
        assert_eq!(held.len(), 2);
        assert!(!masked.contains('"') && !masked.contains("//"));
        assert_eq!(held.restore(&masked), "f(\"s\") // note");
    }

    #[test]
    fn test_marker_characters_in_source_are_not_held() {
        let mut held = HeldSpans::new();
        let text = "\u{E000}0\u{E001} \"lit\" /* c */";
        let out = c_like().hold(text, Comments::Drop, &mut held);
        assert!(held.is_empty());
        assert_eq!(held.restore(&out), "\u{E000}0\u{E001} \"lit\"  ");
    }
}
