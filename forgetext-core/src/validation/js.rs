use super::{Format, FormatValidator, ValidationResult};
use crate::errors::ErrorKind;

const BRACKET_PAIRS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('{', '}')];

/// Lexical approximation of JavaScript well-formedness.
///
/// String literals and comments are stripped in one pass; a literal left
/// open at end of input is an unterminated string. Bracket pairs are then
/// counted outside literals and comments.
pub struct JsValidator;

impl FormatValidator for JsValidator {
    fn format(&self) -> Format {
        Format::Js
    }

    fn check(&self, text: &str) -> ValidationResult {
        let code = match strip_literals(text) {
            Ok(code) => code,
            Err(Unterminated { quote, position }) => {
                return ValidationResult::failure_with(
                    ErrorKind::InvalidJs,
                    format!("Unterminated string literal starting at byte {}", position),
                )
                .with_detail("quote", quote.to_string())
                .with_detail("position", position);
            }
        };

        for (open, close) in BRACKET_PAIRS {
            let opened = code.matches(open).count();
            let closed = code.matches(close).count();
            if opened != closed {
                return ValidationResult::failure_with(
                    ErrorKind::InvalidJs,
                    format!(
                        "Mismatched '{}{}': {} opening, {} closing",
                        open, close, opened, closed
                    ),
                )
                .with_detail("pair", format!("{open}{close}"))
                .with_detail("open", opened)
                .with_detail("close", closed);
            }
        }

        ValidationResult::success()
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Unterminated {
    quote: char,
    position: usize,
}

#[derive(Clone, Copy)]
enum State {
    Code,
    Literal { quote: char, start: usize },
    LineComment,
    BlockComment,
}

/// Remove string literals (`'`, `"`, `` ` ``) and comments, keeping the code
/// between them. A backslash always escapes the next character inside a
/// literal, so a quote after an odd run of backslashes stays inside it.
fn strip_literals(text: &str) -> Result<String, Unterminated> {
    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match state {
            State::Code => match c {
                '"' | '\'' | '`' => state = State::Literal { quote: c, start: i },
                '/' if chars.peek().map(|&(_, n)| n) == Some('/') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek().map(|&(_, n)| n) == Some('*') => {
                    chars.next();
                    state = State::BlockComment;
                }
                _ => out.push(c),
            },
            State::Literal { quote, .. } => {
                if c == '\\' {
                    chars.next();
                } else if c == quote {
                    state = State::Code;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    out.push(c);
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek().map(|&(_, n)| n) == Some('/') {
                    chars.next();
                    state = State::Code;
                }
            }
        }
    }

    match state {
        State::Literal { quote, start } => Err(Unterminated {
            quote,
            position: start,
        }),
        _ => Ok(out),
    }
}
