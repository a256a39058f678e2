//! Size/Diagnostics Reporter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte sizes before and after a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeReport {
    pub original_bytes: usize,
    pub output_bytes: usize,
    /// Never negative. Growth reports 0.
    pub saved_percentage: f64,
}

impl SizeReport {
    /// Sizes are UTF-8 byte lengths, not character counts.
    pub fn compute(original: &str, output: &str) -> Self {
        let original_bytes = original.len();
        let output_bytes = output.len();
        let saved_percentage = if original_bytes == 0 {
            0.0
        } else {
            let saved = original_bytes as f64 - output_bytes as f64;
            (saved / original_bytes as f64 * 100.0).max(0.0)
        };
        Self {
            original_bytes,
            output_bytes,
            saved_percentage,
        }
    }

    pub fn saved_bytes(&self) -> usize {
        self.original_bytes.saturating_sub(self.output_bytes)
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({:.1}% saved)",
            format_bytes(self.original_bytes as u64),
            format_bytes(self.output_bytes as u64),
            self.saved_percentage
        )
    }
}

/// Human-readable size: `512 B`, `1.5 KB`, `2.0 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_utf8_bytes() {
        let report = SizeReport::compute("héllo wörld", "héllo");
        assert_eq!(report.original_bytes, 13);
        assert_eq!(report.output_bytes, 6);
        assert!(report.saved_percentage > 50.0);
    }

    #[test]
    fn test_growth_clamped_to_zero() {
        let report = SizeReport::compute("{\"a\":1}", "{\n  \"a\": 1\n}");
        assert_eq!(report.saved_percentage, 0.0);
        assert_eq!(report.saved_bytes(), 0);
    }

    #[test]
    fn test_half_saved() {
        let report = SizeReport::compute("abcd", "ab");
        assert_eq!(report.saved_percentage, 50.0);
        assert_eq!(report.to_string(), "4 B -> 2 B (50.0% saved)");
    }

    #[test]
    fn test_empty_original() {
        assert_eq!(SizeReport::compute("", "").saved_percentage, 0.0);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MB");
    }
}
