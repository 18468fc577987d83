//! Numeric less-than check
//!
//! Usage: `assert_lt <op1> <op2>` or `assert_lt < protocol-input`

fn main() {
    basanos::assertion::cli::main(&basanos::assertion::LESS_THAN)
}
