//! Byte-exact equality of two operands
//!
//! Usage: `assert_equals <op1> <op2>` or `assert_equals < protocol-input`

fn main() {
    basanos::assertion::cli::main(&basanos::assertion::EQUALS)
}
