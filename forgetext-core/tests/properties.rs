//! Property-based tests for validators and transformations
//!
//! These tests check that the guarantees hold across a wide range of
//! generated inputs, not just the hand-picked cases.

use proptest::prelude::*;
use serde_json::Value;

use forgetext_core::{
    presets, transform, validate, validate_not_empty, DetailValue, ErrorKind, Format, SizeReport,
};

/// Random JSON documents with controlled depth.
fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 \"\\\\]{0,30}".prop_map(Value::String),
    ];

    leaf.prop_recursive(3, 16, 5, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z_]{1,10}", inner, 0..5)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Raw JSON text straight from the grammar, including numbers no float can
/// hold, unpaired surrogate escapes and irregular whitespace.
fn json_text_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("null".to_string()),
        Just("true".to_string()),
        Just("false".to_string()),
        "-?(0|[1-9][0-9]{0,3})(\\.[0-9]{1,3})?([eE][+-]?[0-9]{1,4})?",
        r#""([a-z ]|\\u[dD][89abAB][0-9a-f]{2}|\\[nt"\\/]){0,8}""#,
    ];

    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4)
                .prop_map(|items| format!("[ {} ]", items.join(" ,\n"))),
            proptest::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                let members: Vec<String> = entries
                    .into_iter()
                    .map(|(key, value)| format!("\"{}\" :\t{}", key, value))
                    .collect();
                format!("{{{}}}", members.join(","))
            }),
        ]
    })
}

proptest! {
    #[test]
    fn prop_collapse_whitespace_idempotent(text in "[ \t\r\na-z{};]{0,80}") {
        let once = transform::collapse_whitespace(&text);
        prop_assert_eq!(transform::collapse_whitespace(&once), once.clone());
        prop_assert!(!once.contains("  "));
    }

    #[test]
    fn prop_saved_percentage_bounds(original in ".{0,200}", output in ".{0,200}") {
        let report = SizeReport::compute(&original, &output);
        prop_assert!(report.saved_percentage >= 0.0);
        prop_assert!(report.saved_percentage <= 100.0);
        if output.len() < original.len() {
            prop_assert!(report.saved_percentage > 0.0);
        }
    }

    #[test]
    fn prop_blank_input_is_empty_error(text in "[ \t\r\n\u{feff}]{0,40}") {
        let result = validate_not_empty(&text);
        prop_assert_eq!(result.error_kind(), Some(ErrorKind::EmptyInput));

        for format in Format::ALL {
            prop_assert_eq!(validate(format, &text).error_kind(), Some(ErrorKind::EmptyInput));
        }
    }

    #[test]
    fn prop_non_blank_input_passes_empty_check(text in "[ \n]{0,5}[!-~][ -~]{0,40}") {
        prop_assert!(validate_not_empty(&text).is_valid());
    }

    #[test]
    fn prop_json_grammar_texts_are_valid(text in json_text_strategy()) {
        prop_assert!(validate(Format::Json, &text).is_valid(), "rejected {}", text);

        let pretty = presets::pretty(Format::Json, &text).unwrap();
        prop_assert!(validate(Format::Json, &pretty).is_valid());
        prop_assert_eq!(
            presets::minify(Format::Json, &pretty).unwrap(),
            presets::minify(Format::Json, &text).unwrap()
        );
    }

    #[test]
    fn prop_json_accepts_whatever_serde_accepts(text in "[\\[\\]{}\":,0-9a-z ]{1,40}") {
        let result = validate(Format::Json, &text);
        if serde_json::from_str::<Value>(&text).is_ok() {
            prop_assert!(result.is_valid());
        }
        if !result.is_valid() {
            let expected = if text.trim().is_empty() {
                ErrorKind::EmptyInput
            } else {
                ErrorKind::InvalidJson
            };
            prop_assert_eq!(result.error_kind(), Some(expected));
        }
    }

    #[test]
    fn prop_json_nesting_depth_is_unbounded(depth in 0usize..300) {
        let text = format!("{}0{}", "[".repeat(depth), "]".repeat(depth));
        prop_assert!(validate(Format::Json, &text).is_valid());

        if depth > 0 {
            let unclosed = &text[..text.len() - 1];
            prop_assert_eq!(
                validate(Format::Json, unclosed).error_kind(),
                Some(ErrorKind::InvalidJson)
            );
        }
    }

    #[test]
    fn prop_json_transforms_preserve_value(value in json_value_strategy()) {
        let text = serde_json::to_string(&value).unwrap();
        prop_assert!(validate(Format::Json, &text).is_valid());

        let pretty = presets::pretty(Format::Json, &text).unwrap();
        let minified = presets::minify(Format::Json, &pretty).unwrap();
        prop_assert_eq!(serde_json::from_str::<Value>(&minified).unwrap(), value);
        prop_assert_eq!(minified, text);
    }

    #[test]
    fn prop_css_brace_mismatch_reports_counts(
        open in 0usize..6,
        close in 0usize..6,
        body in "[a-z: ;]{0,20}",
    ) {
        prop_assume!(open != close);
        let text = format!("a {}{}{}", "{".repeat(open), body, "}".repeat(close));

        let result = validate(Format::Css, &text);
        prop_assert_eq!(result.error_kind(), Some(ErrorKind::InvalidCss));
        prop_assert_eq!(result.detail("openBraces"), Some(&DetailValue::Count(open as u64)));
        prop_assert_eq!(result.detail("closeBraces"), Some(&DetailValue::Count(close as u64)));
    }

    #[test]
    fn prop_double_angle_is_invalid_xml(prefix in "[a-z<>/ ]{0,20}", suffix in "[a-z<>/ ]{0,20}") {
        let text = format!("{}<<{}", prefix, suffix);
        prop_assert_eq!(validate(Format::Xml, &text).error_kind(), Some(ErrorKind::InvalidXml));
    }

    #[test]
    fn prop_css_minify_never_grows(text in "[a-z .#:;{},>\n\t]{1,80}") {
        if let Ok(out) = presets::minify(Format::Css, &text) {
            prop_assert!(out.len() <= text.len());
            prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
        }
    }
}
