//! Numeric greater-than check
//!
//! Usage: `assert_gt <op1> <op2>` or `assert_gt < protocol-input`

fn main() {
    basanos::assertion::cli::main(&basanos::assertion::GREATER_THAN)
}
