//! Substring containment check
//!
//! Usage: `assert_contains <op1> <op2>` or `assert_contains < protocol-input`

fn main() {
    basanos::assertion::cli::main(&basanos::assertion::CONTAINS)
}
