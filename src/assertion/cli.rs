//! Shared driver for the `assert_*` executables

use std::io::{BufRead, Write};

use super::{protocol, Primitive};

pub const EXIT_PASS: i32 = 0;
pub const EXIT_FAIL: i32 = 1;

/// Run one primitive against `args` (program name excluded)
///
/// With no arguments the operands are decoded from `input`. The report is
/// written to `output`; the return value is the process exit code.
pub fn run<R: BufRead, W: Write>(
    primitive: &Primitive,
    args: &[String],
    input: &mut R,
    output: &mut W,
) -> i32 {
    let operands = match args.len() {
        0 => protocol::decode(input),
        2 => primitive.resolution.resolve(args),
        _ => {
            let _ = writeln!(
                output,
                "usage: {} {}\n       {} < protocol-input",
                primitive.name, primitive.usage, primitive.name
            );
            return EXIT_FAIL;
        }
    };

    let (first, second) = match operands {
        Ok(pair) => pair,
        Err(e) => {
            let _ = writeln!(output, "ERROR: {}", e);
            return EXIT_FAIL;
        }
    };

    let result = (primitive.evaluate)(&first, &second);
    let _ = output.write_all(result.report().as_bytes());
    let _ = output.flush();
    if result.passed() {
        EXIT_PASS
    } else {
        EXIT_FAIL
    }
}

/// Entry point used by each binary's `main`
pub fn main(primitive: &Primitive) -> ! {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let code = run(primitive, &args, &mut stdin.lock(), &mut stdout.lock());
    std::process::exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{CONTAINS, EQUALS, GREATER_THAN, MATCHES};

    fn invoke(primitive: &Primitive, args: &[&str], stdin: &[u8]) -> (i32, String) {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut input = stdin;
        let mut output = Vec::new();
        let code = run(primitive, &args, &mut input, &mut output);
        (code, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_literal_arguments() {
        let (code, out) = invoke(&EQUALS, &["same", "same"], b"");
        assert_eq!(code, EXIT_PASS);
        assert_eq!(out, "PASS: values are equal\n");

        let (code, out) = invoke(&EQUALS, &["0", "1"], b"");
        assert_eq!(code, EXIT_FAIL);
        assert!(out.starts_with("FAIL: values differ"));
    }

    #[test]
    fn test_protocol_on_stdin() {
        let payload = protocol::encode(b"line one\nline two", b"line one\nline two");
        let (code, _) = invoke(&EQUALS, &[], &payload);
        assert_eq!(code, EXIT_PASS);

        let payload = protocol::encode(b"needle", b"hay\nneedle\nstack");
        let (code, _) = invoke(&CONTAINS, &[], &payload);
        assert_eq!(code, EXIT_PASS);
    }

    #[test]
    fn test_protocol_keeps_binary_operands() {
        let payload = protocol::encode(b"\xff", b"\xfe");
        let (code, out) = invoke(&EQUALS, &[], &payload);
        assert_eq!(code, EXIT_FAIL);
        assert!(out.starts_with("FAIL: values differ"));

        let payload = protocol::encode(b"\x00\xff", b"\x00\xff");
        let (code, _) = invoke(&EQUALS, &[], &payload);
        assert_eq!(code, EXIT_PASS);
    }

    #[test]
    fn test_malformed_protocol_fails() {
        let (code, out) = invoke(&EQUALS, &[], b"basanos:2\n1\na1\nb");
        assert_eq!(code, EXIT_FAIL);
        assert!(out.starts_with("ERROR:"));
    }

    #[test]
    fn test_wrong_argument_count_prints_usage() {
        let (code, out) = invoke(&MATCHES, &["only-one"], b"");
        assert_eq!(code, EXIT_FAIL);
        assert!(out.starts_with("usage: assert_matches <pattern> <target>"));
    }

    #[test]
    fn test_parse_error_exits_one() {
        let (code, out) = invoke(&GREATER_THAN, &["ten", "5"], b"");
        assert_eq!(code, EXIT_FAIL);
        assert!(out.starts_with("ERROR: cannot parse 'ten'"));
    }

    #[test]
    fn test_fixture_file_operand() {
        let temp = tempfile::tempdir().unwrap();
        let fixture = temp.path().join("expected.txt");
        std::fs::write(&fixture, "fixture body").unwrap();

        let (code, _) = invoke(&EQUALS, &[fixture.to_str().unwrap(), "fixture body"], b"");
        assert_eq!(code, EXIT_PASS);
    }
}
