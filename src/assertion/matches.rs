//! Regular expression match

use regex::bytes::Regex;

use super::{indent, lossy, AssertionResult, RULE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchesResult {
    pub passed: bool,
    pub pattern: String,
    pub target: Vec<u8>,
    /// Set when the pattern does not compile
    pub error: Option<String>,
}

/// Test whether `pattern` matches anywhere in `target`
///
/// The target may hold arbitrary bytes; the pattern must be UTF-8.
pub fn matches(pattern: &[u8], target: &[u8]) -> MatchesResult {
    let compiled = std::str::from_utf8(pattern)
        .map_err(|e| e.to_string())
        .and_then(|text| Regex::new(text).map_err(|e| e.to_string()));
    let (passed, error) = match compiled {
        Ok(regex) => (regex.is_match(target), None),
        Err(e) => (false, Some(e)),
    };
    MatchesResult {
        passed,
        pattern: lossy(pattern).into_owned(),
        target: target.to_vec(),
        error,
    }
}

impl AssertionResult for MatchesResult {
    fn passed(&self) -> bool {
        self.passed
    }

    fn report(&self) -> String {
        if let Some(error) = &self.error {
            return format!("ERROR: invalid pattern '{}':\n{}\n", self.pattern, indent(error));
        }
        if self.passed {
            return "PASS: pattern matched\n".to_string();
        }
        let mut out = String::from("FAIL: pattern did not match\n");
        out.push_str(RULE);
        out.push_str("Pattern:\n");
        out.push_str(&indent(&self.pattern));
        out.push_str("\nTarget:\n");
        out.push_str(&indent(&lossy(&self.target)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matches() {
        assert!(matches(br"^HTTP/\d\.\d 200", b"HTTP/1.1 200 OK").passed);
        assert!(matches(b"(?m)^ready$", b"booting\nready\n").passed);
    }

    #[test]
    fn test_pattern_does_not_match() {
        let result = matches(br"^\d+$", b"12a");
        assert!(!result.passed);
        assert!(result.error.is_none());
        let report = result.report();
        assert!(report.starts_with("FAIL"));
        assert!(report.contains("Pattern:\n  ^\\d+$\n"));
        assert!(report.contains("Target:\n  12a\n"));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let result = matches(b"(unclosed", b"anything");
        assert!(!result.passed);
        assert!(result.error.is_some());
        assert!(result.report().starts_with("ERROR: invalid pattern"));
    }

    #[test]
    fn test_binary_target() {
        assert!(matches(b"ok$", b"\xff\xfeok").passed);
        assert!(matches(br"(?-u)\xff", b"a\xffb").passed);
        assert!(!matches(br"(?-u)\xfe", b"a\xffb").passed);
    }

    #[test]
    fn test_non_utf8_pattern_is_error() {
        let result = matches(b"\xff", b"\xff");
        assert!(!result.passed);
        assert!(result.report().starts_with("ERROR: invalid pattern"));
    }
}
