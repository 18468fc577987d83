//! Byte-exact equality

use similar::TextDiff;

use super::{indent, lossy, AssertionResult, RULE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualsResult {
    pub passed: bool,
    pub expected: Vec<u8>,
    pub actual: Vec<u8>,
    /// Unified diff hunks (no file headers), empty when equal
    pub diff: String,
}

pub fn equals(expected: &[u8], actual: &[u8]) -> EqualsResult {
    let passed = expected == actual;
    let diff = if passed {
        String::new()
    } else {
        unified_diff(expected, actual)
    };
    EqualsResult {
        passed,
        expected: expected.to_vec(),
        actual: actual.to_vec(),
        diff,
    }
}

/// Line diff over raw bytes; invalid UTF-8 is rendered lossily
fn unified_diff(expected: &[u8], actual: &[u8]) -> String {
    TextDiff::from_lines(expected, actual)
        .unified_diff()
        .context_radius(3)
        .missing_newline_hint(false)
        .to_string()
}

impl AssertionResult for EqualsResult {
    fn passed(&self) -> bool {
        self.passed
    }

    fn report(&self) -> String {
        if self.passed {
            return "PASS: values are equal\n".to_string();
        }
        let mut out = String::from("FAIL: values differ\n");
        out.push_str(RULE);
        out.push_str("Expected:\n");
        out.push_str(&indent(&lossy(&self.expected)));
        out.push_str("\nActual:\n");
        out.push_str(&indent(&lossy(&self.actual)));
        out.push_str("\nDiff:\n");
        out.push_str(&self.diff);
        if !self.diff.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_pass() {
        assert!(equals(b"hello", b"hello").passed);
        assert!(equals(b"", b"").passed);
        assert!(equals(b"a\nb\n", b"a\nb\n").passed);
        assert_eq!(equals(b"x", b"x").report(), "PASS: values are equal\n");
    }

    #[test]
    fn test_different_strings_fail() {
        let result = equals(b"hello", b"world");
        assert!(!result.passed);
        assert_eq!(result.expected, b"hello");
        assert_eq!(result.actual, b"world");
    }

    #[test]
    fn test_trailing_newline_matters() {
        assert!(!equals(b"0", b"0\n").passed);
    }

    #[test]
    fn test_diff_marks_changed_lines() {
        let result = equals(b"line1\nline2\nline3", b"line1\nchanged\nline3");
        assert!(result.diff.contains("-line2"));
        assert!(result.diff.contains("+changed"));
        assert!(!result.diff.contains("-line1"));
    }

    #[test]
    fn test_diff_has_no_file_headers() {
        let result = equals(b"hello", b"world");
        assert!(!result.diff.contains("---"));
        assert!(!result.diff.contains("+++"));
        assert!(result.diff.contains("@@ "));
        assert!(result.diff.contains("-hello"));
        assert!(result.diff.contains("+world"));
    }

    #[test]
    fn test_failure_report_sections() {
        let report = equals(b"hello", b"world").report();
        assert!(report.starts_with("FAIL"));
        assert!(report.contains("Expected:\n  hello\n"));
        assert!(report.contains("Actual:\n  world\n"));
        assert!(report.contains("Diff:\n"));
        assert!(report.ends_with('\n'));
    }

    #[test]
    fn test_invalid_utf8_compares_bytes() {
        assert!(equals(b"\xff", b"\xff").passed);

        let result = equals(b"\xff", b"\xfe");
        assert!(!result.passed);
        assert!(result.report().starts_with("FAIL: values differ"));
        assert!(result.diff.contains("@@ "));
    }
}
