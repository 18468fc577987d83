//! Numeric less-or-equal check
//!
//! Usage: `assert_lte <op1> <op2>` or `assert_lte < protocol-input`

fn main() {
    basanos::assertion::cli::main(&basanos::assertion::LESS_OR_EQUAL)
}
