//! Numeric ordering comparisons

use super::AssertionResult;

/// Relation asserted between the left and right operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
        }
    }

    fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Self::GreaterThan => left > right,
            Self::GreaterOrEqual => left >= right,
            Self::LessThan => left < right,
            Self::LessOrEqual => left <= right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericResult {
    pub passed: bool,
    pub comparison: Comparison,
    pub left: String,
    pub right: String,
    pub left_val: f64,
    pub right_val: f64,
    /// Set when an operand is not a number
    pub error: Option<String>,
}

fn parse_number(text: &str) -> Result<f64, String> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| format!("cannot parse '{}' as a number: {}", text, e))
}

pub fn compare(comparison: Comparison, left: &str, right: &str) -> NumericResult {
    let parsed = parse_number(left).and_then(|l| parse_number(right).map(|r| (l, r)));
    let (passed, left_val, right_val, error) = match parsed {
        Ok((l, r)) => (comparison.holds(l, r), l, r, None),
        Err(e) => (false, 0.0, 0.0, Some(e)),
    };
    NumericResult {
        passed,
        comparison,
        left: left.to_string(),
        right: right.to_string(),
        left_val,
        right_val,
        error,
    }
}

pub fn greater_than(left: &str, right: &str) -> NumericResult {
    compare(Comparison::GreaterThan, left, right)
}

pub fn greater_or_equal(left: &str, right: &str) -> NumericResult {
    compare(Comparison::GreaterOrEqual, left, right)
}

pub fn less_than(left: &str, right: &str) -> NumericResult {
    compare(Comparison::LessThan, left, right)
}

pub fn less_or_equal(left: &str, right: &str) -> NumericResult {
    compare(Comparison::LessOrEqual, left, right)
}

impl AssertionResult for NumericResult {
    fn passed(&self) -> bool {
        self.passed
    }

    fn report(&self) -> String {
        if let Some(error) = &self.error {
            return format!("ERROR: {}\n", error);
        }
        let relation = format!(
            "{} {} {}",
            self.left_val,
            self.comparison.symbol(),
            self.right_val
        );
        if self.passed {
            format!("PASS: {}\n", relation)
        } else {
            format!("FAIL: {} is false\n", relation)
        }
    }
}
