//! Substring containment

use super::{indent, lossy, AssertionResult, RULE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainsResult {
    pub passed: bool,
    pub needle: Vec<u8>,
    pub haystack: Vec<u8>,
}

pub fn contains(needle: &[u8], haystack: &[u8]) -> ContainsResult {
    ContainsResult {
        passed: find(haystack, needle),
        needle: needle.to_vec(),
        haystack: haystack.to_vec(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

impl AssertionResult for ContainsResult {
    fn passed(&self) -> bool {
        self.passed
    }

    fn report(&self) -> String {
        if self.passed {
            return "PASS: needle found in haystack\n".to_string();
        }
        let mut out = String::from("FAIL: needle not found in haystack\n");
        out.push_str(RULE);
        out.push_str("Looking for:\n");
        out.push_str(&indent(&lossy(&self.needle)));
        out.push_str("\nIn:\n");
        out.push_str(&indent(&lossy(&self.haystack)));
        out
    }
}
