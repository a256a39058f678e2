//! Per-format minify and format recipes built from the transform strategies.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::json_layout;
use crate::transform::{self, Comments, HeldSpans, Lexicon, MinifyStep, TransformError};
use crate::validation::{Format, VOID_ELEMENTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Minify,
    Format,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Minify => "minify",
            Mode::Format => "format",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

fn rewrite(pattern: &str, replacement: &str) -> MinifyStep {
    MinifyStep::Rewrite {
        pattern: re(pattern),
        replacement: replacement.to_string(),
    }
}

fn lexicon(comments: &str, literals: &str) -> Lexicon {
    Lexicon::new(comments, literals).unwrap()
}

static CSS_SYNTAX: LazyLock<Lexicon> = LazyLock::new(|| {
    lexicon(
        r"/\*(?s:.*?)\*/",
        r#""(?:\\(?s:.)|[^"\\])*"|'(?:\\(?s:.)|[^'\\])*'"#,
    )
});

static JS_SYNTAX: LazyLock<Lexicon> = LazyLock::new(|| {
    lexicon(
        r"//[^\n]*|/\*(?s:.*?)\*/",
        r#""(?:\\(?s:.)|[^"\\\n])*"|'(?:\\(?s:.)|[^'\\\n])*'|`(?:\\(?s:.)|[^`\\])*`"#,
    )
});

// Whitespace inside these elements is content.
static HTML_SYNTAX: LazyLock<Lexicon> = LazyLock::new(|| {
    lexicon(
        r"<!--(?s:.*?)-->",
        r"(?is:<(?:pre|textarea|script|style)\b.*?</(?:pre|textarea|script|style)\s*>)",
    )
});

static XML_SYNTAX: LazyLock<Lexicon> = LazyLock::new(|| {
    lexicon(r"<!--(?s:.*?)-->", r"<!\[CDATA\[(?s:.*?)\]\]>|<\?(?s:.*?)\?>")
});

static SQL_SYNTAX: LazyLock<Lexicon> = LazyLock::new(|| {
    lexicon(
        r"--[^\n]*|/\*(?s:.*?)\*/",
        r#"'(?:''|[^'])*'|"(?:""|[^"])*"|`[^`]*`"#,
    )
});

static CSS_MINIFY: LazyLock<Vec<MinifyStep>> = LazyLock::new(|| {
    vec![
        MinifyStep::Lexical(CSS_SYNTAX.clone()),
        MinifyStep::CollapseWhitespace,
        MinifyStep::RemoveLineBreaks,
        rewrite(r"\s*([{};,>])\s*", "${1}"),
        rewrite(r"\s*:\s+", ":"),
        rewrite(r";\}", "}"),
    ]
});

// Line breaks are kept where they may end a statement.
static JS_MINIFY: LazyLock<Vec<MinifyStep>> = LazyLock::new(|| {
    vec![
        MinifyStep::Lexical(JS_SYNTAX.clone()),
        rewrite(r"[^\S\n]+", " "),
        rewrite(r"\s*\n\s*", "\n"),
        rewrite(r"\s*([{};,])\s*", "${1}"),
    ]
});

fn markup_minify(syntax: &Lexicon) -> Vec<MinifyStep> {
    vec![
        MinifyStep::Lexical(syntax.clone()),
        MinifyStep::CollapseWhitespace,
        MinifyStep::RemoveLineBreaks,
        rewrite(r">\s+<", "><"),
    ]
}

static HTML_MINIFY: LazyLock<Vec<MinifyStep>> = LazyLock::new(|| markup_minify(&HTML_SYNTAX));
static XML_MINIFY: LazyLock<Vec<MinifyStep>> = LazyLock::new(|| markup_minify(&XML_SYNTAX));

static SQL_MINIFY: LazyLock<Vec<MinifyStep>> = LazyLock::new(|| {
    vec![
        MinifyStep::Lexical(SQL_SYNTAX.clone()),
        MinifyStep::CollapseWhitespace,
        MinifyStep::RemoveLineBreaks,
    ]
});

static HORIZONTAL_SPACE: LazyLock<Regex> = LazyLock::new(|| re(r"[^\S\n]+"));
static LINE_EDGE: LazyLock<Regex> = LazyLock::new(|| re(r"\s*\n\s*"));
static BLOCK_OPEN: LazyLock<Regex> = LazyLock::new(|| re(r"[^\S\n]*\{\s*"));
static STATEMENT_END: LazyLock<Regex> = LazyLock::new(|| re(r";\s*"));
static BLOCK_CLOSE: LazyLock<Regex> = LazyLock::new(|| re(r"\s*\}\s*"));
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| re(r">\s*<"));
static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| re(r"<(/)?([A-Za-z][A-Za-z0-9:._-]*)[^>]*?(/)?>"));
static SQL_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\s+\b(FROM|WHERE|AND|OR|ORDER BY|GROUP BY|HAVING|LIMIT|INNER JOIN|LEFT JOIN|RIGHT JOIN|JOIN|UNION|VALUES|SET)\b")
});
static SQL_CONDITION: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)^(AND|OR)\b"));

/// Apply the recipe for `format` in `mode`.
pub fn apply(format: Format, mode: Mode, text: &str) -> Result<String, TransformError> {
    match mode {
        Mode::Minify => minify(format, text),
        Mode::Format => pretty(format, text),
    }
}

pub fn minify(format: Format, text: &str) -> Result<String, TransformError> {
    match format {
        Format::Json => json_layout::compact(text),
        Format::Css => transform::minify(text, &CSS_MINIFY),
        Format::Js => transform::minify(text, &JS_MINIFY),
        Format::Html => transform::minify(text, &HTML_MINIFY),
        Format::Xml => transform::minify(text, &XML_MINIFY),
        Format::Sql => transform::minify(text, &SQL_MINIFY),
    }
}

/// Comments and literals are carried through formatting unchanged.
pub fn pretty(format: Format, text: &str) -> Result<String, TransformError> {
    let out = match format {
        Format::Json => json_layout::pretty(text)?,
        Format::Css => with_held(&CSS_SYNTAX, text, format_blocks),
        Format::Js => with_held(&JS_SYNTAX, text, format_blocks),
        Format::Html => with_held(&HTML_SYNTAX, text, |t| format_markup(t, true)),
        Format::Xml => with_held(&XML_SYNTAX, text, |t| format_markup(t, false)),
        Format::Sql => with_held(&SQL_SYNTAX, text, format_sql),
    };

    if out.trim().is_empty() && !text.trim().is_empty() {
        return Err(TransformError::FormattingFailed(format!(
            "{} formatter produced no output",
            format
        )));
    }
    Ok(out)
}

fn with_held<F>(syntax: &Lexicon, text: &str, layout: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut held = HeldSpans::new();
    let masked = syntax.hold(text, Comments::Keep, &mut held);
    held.restore(&layout(&masked))
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

fn join(lines: Vec<String>) -> String {
    lines.join("\n").trim().to_string()
}

/// Single spaces within lines, single line breaks between them.
fn tidy_whitespace(text: &str) -> String {
    let flat = HORIZONTAL_SPACE.replace_all(text, " ");
    LINE_EDGE.replace_all(&flat, "\n").into_owned()
}

fn format_blocks(text: &str) -> String {
    let flat = tidy_whitespace(text);
    let broken = transform::insert_line_breaks(&flat, &BLOCK_OPEN, " {\n");
    let broken = transform::insert_line_breaks(&broken, &STATEMENT_END, ";\n");
    let broken = transform::insert_line_breaks(&broken, &BLOCK_CLOSE, "\n}\n");

    let lines = split_lines(&broken);
    let depths = prefix_depths(&lines, |line| {
        line.matches('{').count() as i64 - line.matches('}').count() as i64
    });
    join(transform::format(&lines, |line, i, _| {
        depths[i] - i64::from(line.trim_start().starts_with('}'))
    }))
}

fn format_markup(text: &str, html: bool) -> String {
    let broken = transform::insert_line_breaks(text.trim(), &BETWEEN_TAGS, ">\n<");
    let lines = split_lines(&broken);
    let depths = prefix_depths(&lines, |line| tag_balance(line, html));
    join(transform::format(&lines, |line, i, _| {
        depths[i] - i64::from(line.trim_start().starts_with("</"))
    }))
}

fn format_sql(text: &str) -> String {
    let flat = tidy_whitespace(text);
    let broken = transform::insert_line_breaks(&flat, &SQL_CLAUSE, "\n${1}");
    let broken = transform::insert_line_breaks(&broken, &STATEMENT_END, ";\n");
    let lines = split_lines(&broken);
    join(transform::format(&lines, |line, _, _| {
        i64::from(SQL_CONDITION.is_match(line.trim_start()))
    }))
}

/// Depth before each line, given each line's net nesting change.
fn prefix_depths<F>(lines: &[String], delta: F) -> Vec<i64>
where
    F: Fn(&str) -> i64,
{
    let mut depth = 0i64;
    lines
        .iter()
        .map(|line| {
            let before = depth;
            depth = (depth + delta(line)).max(0);
            before
        })
        .collect()
}

fn tag_balance(line: &str, html: bool) -> i64 {
    MARKUP_TAG
        .captures_iter(line)
        .map(|caps| {
            let closing = caps.get(1).is_some();
            let self_closing = caps.get(3).is_some();
            let void = html && VOID_ELEMENTS.contains(&caps[2].to_ascii_lowercase().as_str());
            match (closing, self_closing || void) {
                (true, _) => -1,
                (false, true) => 0,
                (false, false) => 1,
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_preserves_key_order() {
        let out = minify(Format::Json, "{\n  \"z\": 1,\n  \"a\": [1, 2]\n}").unwrap();
        assert_eq!(out, r#"{"z":1,"a":[1,2]}"#);

        let pretty_out = pretty(Format::Json, &out).unwrap();
        assert_eq!(pretty_out, "{\n  \"z\": 1,\n  \"a\": [\n    1,\n    2\n  ]\n}");
    }

    #[test]
    fn test_css_minify() {
        let css = "/* header */\nbody {\n  margin : 0;\n  color: red;\n}\n\na, b > p { padding: 1px; }";
        assert_eq!(
            minify(Format::Css, css).unwrap(),
            "body{margin:0;color:red}a,b>p{padding:1px}"
        );
    }

    #[test]
    fn test_css_format() {
        let out = pretty(Format::Css, "a{color:red;margin:0}").unwrap();
        assert_eq!(out, "a {\n  color:red;\n  margin:0\n}");
    }

    #[test]
    fn test_js_minify_keeps_urls_in_code() {
        let js = "// setup\nconst url = \"http://x\";\n/* block */\nfunction f() {\n  return 1;\n}";
        assert_eq!(
            minify(Format::Js, js).unwrap(),
            "const url = \"http://x\";function f(){return 1;}"
        );
    }

    #[test]
    fn test_html_round() {
        let html = "<div>\n  <!-- note -->\n  <p>Hi</p>\n  <br>\n</div>";
        let min = minify(Format::Html, html).unwrap();
        assert_eq!(min, "<div><p>Hi</p><br></div>");

        let out = pretty(Format::Html, &min).unwrap();
        assert_eq!(out, "<div>\n  <p>Hi</p>\n  <br>\n</div>");
    }

    #[test]
    fn test_xml_format_self_closing() {
        let out = pretty(Format::Xml, "<root><item/><group><a>1</a></group></root>").unwrap();
        assert_eq!(
            out,
            "<root>\n  <item/>\n  <group>\n    <a>1</a>\n  </group>\n</root>"
        );
    }

    #[test]
    fn test_sql_minify_and_format() {
        let sql = "SELECT a, b -- columns\nFROM t\n/* filter */ WHERE a = 1 AND b = 2";
        assert_eq!(
            minify(Format::Sql, sql).unwrap(),
            "SELECT a, b FROM t WHERE a = 1 AND b = 2"
        );

        let out = pretty(Format::Sql, "select a from t where x = 1 and y = 2").unwrap();
        assert_eq!(out, "select a\nfrom t\nwhere x = 1\n  and y = 2");
    }

    #[test]
    fn test_comment_only_css_fails_minify() {
        let err = minify(Format::Css, "/* nothing */").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::MinificationFailed);
    }

    #[test]
    fn test_js_trailing_line_comment_does_not_swallow_code() {
        let js = "let a = 1; // note\nlet b = 2;\nf(a, b);";
        assert_eq!(minify(Format::Js, js).unwrap(), "let a = 1;let b = 2;f(a,b);");
    }

    #[test]
    fn test_js_keeps_statement_line_breaks() {
        let js = "let a = 1   // no semicolons\nlet s = 'x ;  y'\ncall(a)";
        assert_eq!(
            minify(Format::Js, js).unwrap(),
            "let a = 1\nlet s = 'x ;  y'\ncall(a)"
        );
    }

    #[test]
    fn test_js_format_keeps_comments_and_strings() {
        let out = pretty(Format::Js, "f(\"a;b\"); // done\ng();").unwrap();
        assert_eq!(out, "f(\"a;b\");\n// done\ng();");
    }

    #[test]
    fn test_sql_comment_markers_inside_literals() {
        assert_eq!(
            minify(Format::Sql, "SELECT '--not a comment' AS x FROM t").unwrap(),
            "SELECT '--not a comment' AS x FROM t"
        );
        assert_eq!(
            minify(Format::Sql, "SELECT 'it''s  -- here' -- real\nFROM t").unwrap(),
            "SELECT 'it''s  -- here' FROM t"
        );
    }

    #[test]
    fn test_css_strings_untouched() {
        let css = "a::after { content: \"x ; y\"; }";
        assert_eq!(minify(Format::Css, css).unwrap(), "a::after{content:\"x ; y\"}");
    }

    #[test]
    fn test_json_beyond_serde_value() {
        assert_eq!(minify(Format::Json, "[ 1e400 ]").unwrap(), "[1e400]");
        assert_eq!(
            pretty(Format::Json, r#"{"s": "\ud800"}"#).unwrap(),
            "{\n  \"s\": \"\\ud800\"\n}"
        );

        let deep = format!("{}{}", "[".repeat(300), "]".repeat(300));
        assert_eq!(minify(Format::Json, &deep).unwrap(), deep);
        assert!(pretty(Format::Json, &deep).is_ok());
    }
}
