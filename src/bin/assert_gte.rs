//! Numeric greater-or-equal check
//!
//! Usage: `assert_gte <op1> <op2>` or `assert_gte < protocol-input`

fn main() {
    basanos::assertion::cli::main(&basanos::assertion::GREATER_OR_EQUAL)
}
