//! Token-level JSON re-layout.
//!
//! Scalars are copied from the source untouched, so numbers of any magnitude
//! and `\u` escapes of any kind survive byte for byte. Nesting is tracked on
//! an explicit stack rather than by recursion.

use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};

use crate::transform::TransformError;

/// Drop all insignificant whitespace.
pub fn compact(text: &str) -> Result<String, TransformError> {
    relayout(text, CompactFormatter)
}

/// Two-space indented layout, matching `serde_json::to_string_pretty`.
pub fn pretty(text: &str) -> Result<String, TransformError> {
    relayout(text, PrettyFormatter::new())
}

enum Token<'a> {
    Open(u8),
    Close(u8),
    Comma,
    Colon,
    Scalar(&'a str),
}

struct Tokens<'a> {
    text: &'a str,
    pos: usize,
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_delimiter(b: u8) -> bool {
    is_space(b) || matches!(b, b'{' | b'}' | b'[' | b']' | b',' | b':' | b'"')
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, TransformError>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && is_space(bytes[self.pos]) {
            self.pos += 1;
        }
        let start = self.pos;
        let first = *bytes.get(start)?;
        self.pos += 1;

        let token = match first {
            b'{' | b'[' => Token::Open(first),
            b'}' | b']' => Token::Close(first),
            b',' => Token::Comma,
            b':' => Token::Colon,
            b'"' => {
                let mut escaped = false;
                loop {
                    let Some(&b) = bytes.get(self.pos) else {
                        return Some(Err(malformed("unterminated string", start)));
                    };
                    self.pos += 1;
                    match b {
                        b'\\' if !escaped => escaped = true,
                        b'"' if !escaped => break,
                        _ => escaped = false,
                    }
                }
                Token::Scalar(&self.text[start..self.pos])
            }
            _ => {
                while self.pos < bytes.len() && !is_delimiter(bytes[self.pos]) {
                    self.pos += 1;
                }
                Token::Scalar(&self.text[start..self.pos])
            }
        };
        Some(Ok(token))
    }
}

enum Frame {
    Array { first: bool },
    Object { first: bool, at_key: bool },
}

fn malformed(what: &str, position: usize) -> TransformError {
    TransformError::Malformed(format!("{} at byte {}", what, position))
}

fn relayout<F: Formatter>(text: &str, mut fmt: F) -> Result<String, TransformError> {
    let mut out = Vec::with_capacity(text.len());
    let mut stack: Vec<Frame> = Vec::new();
    let mut tokens = Tokens { text, pos: 0 };

    while let Some(token) = tokens.next() {
        let position = tokens.pos;
        match token? {
            Token::Comma => {}
            Token::Colon => match stack.last_mut() {
                Some(Frame::Object { at_key, .. }) if *at_key => {
                    fmt.end_object_key(&mut out)?;
                    fmt.begin_object_value(&mut out)?;
                    *at_key = false;
                }
                _ => return Err(malformed("unexpected ':'", position)),
            },
            Token::Open(bracket) => {
                if let Some(Frame::Object { at_key: true, .. }) = stack.last() {
                    return Err(malformed("object key must be a string", position));
                }
                begin_value(&mut fmt, &mut out, &mut stack)?;
                if bracket == b'{' {
                    fmt.begin_object(&mut out)?;
                    stack.push(Frame::Object {
                        first: true,
                        at_key: true,
                    });
                } else {
                    fmt.begin_array(&mut out)?;
                    stack.push(Frame::Array { first: true });
                }
            }
            Token::Close(bracket) => {
                match (stack.pop(), bracket) {
                    (Some(Frame::Object { .. }), b'}') => fmt.end_object(&mut out)?,
                    (Some(Frame::Array { .. }), b']') => fmt.end_array(&mut out)?,
                    _ => return Err(malformed("unbalanced bracket", position)),
                }
                end_value(&mut fmt, &mut out, &mut stack)?;
            }
            Token::Scalar(raw) => {
                let is_key = matches!(stack.last(), Some(Frame::Object { at_key: true, .. }));
                begin_value(&mut fmt, &mut out, &mut stack)?;
                fmt.write_raw_fragment(&mut out, raw)?;
                if !is_key {
                    end_value(&mut fmt, &mut out, &mut stack)?;
                }
            }
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unclosed container", text.len()));
    }
    String::from_utf8(out).map_err(|e| TransformError::Malformed(e.to_string()))
}

fn begin_value<F: Formatter>(
    fmt: &mut F,
    out: &mut Vec<u8>,
    stack: &mut [Frame],
) -> std::io::Result<()> {
    match stack.last_mut() {
        Some(Frame::Array { first }) => {
            fmt.begin_array_value(out, *first)?;
            *first = false;
        }
        Some(Frame::Object {
            first,
            at_key: true,
        }) => {
            fmt.begin_object_key(out, *first)?;
            *first = false;
        }
        // Object values were opened by the preceding ':'.
        Some(Frame::Object { .. }) | None => {}
    }
    Ok(())
}

fn end_value<F: Formatter>(
    fmt: &mut F,
    out: &mut Vec<u8>,
    stack: &mut [Frame],
) -> std::io::Result<()> {
    match stack.last_mut() {
        Some(Frame::Array { .. }) => fmt.end_array_value(out),
        Some(Frame::Object { at_key, .. }) => {
            *at_key = true;
            fmt.end_object_value(out)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_keeps_source_order_and_text() {
        let text = "{ \"z\" : 1.50 ,\n \"a\" : [ 1e400 , \"x \\\" y\" ] }";
        assert_eq!(compact(text).unwrap(), r#"{"z":1.50,"a":[1e400,"x \" y"]}"#);
    }

    #[test]
    fn test_pretty_matches_serde_layout() {
        let text = r#"{"a":[1,{"b":null}],"c":{},"d":[]}"#;
        let value: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(
            pretty(text).unwrap(),
            serde_json::to_string_pretty(&value).unwrap()
        );
    }

    #[test]
    fn test_lone_surrogate_copied_verbatim() {
        assert_eq!(compact(r#"[ "\ud800" ]"#).unwrap(), r#"["\ud800"]"#);
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(compact("[1, 2"), Err(TransformError::Malformed(_))));
        assert!(matches!(compact("[1}"), Err(TransformError::Malformed(_))));
        assert!(matches!(compact("{[1]: 2}"), Err(TransformError::Malformed(_))));
        assert!(matches!(compact("\"open"), Err(TransformError::Malformed(_))));
    }
}
