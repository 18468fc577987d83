//! Regular expression match
//!
//! Usage: `assert_matches <op1> <op2>` or `assert_matches < protocol-input`

fn main() {
    basanos::assertion::cli::main(&basanos::assertion::MATCHES)
}
