//! Assertion operand wire protocol
//!
//! Operands are delivered on stdin as two length-prefixed byte strings:
//! ```text
//! basanos:1\n
//! <byte-length>\n
//! <first operand bytes>
//! <byte-length>\n
//! <second operand bytes>
//! ```
//! Operand bytes are not delimited, so they may contain newlines or any
//! other byte value.

use std::io::{self, BufRead, Read};

use crate::common::{Error, Result};

/// Exact content of the first line
pub const VERSION_LINE: &str = "basanos:1";

/// Refuse operands above 512MB
const MAX_OPERAND_LEN: usize = 512 * 1024 * 1024;

/// Encode two operands
pub fn encode(first: &[u8], second: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(VERSION_LINE.len() + first.len() + second.len() + 24);
    out.extend_from_slice(VERSION_LINE.as_bytes());
    out.push(b'\n');
    for operand in [first, second] {
        out.extend_from_slice(operand.len().to_string().as_bytes());
        out.push(b'\n');
        out.extend_from_slice(operand);
    }
    out
}

/// Decode two operands
pub fn decode<R: BufRead>(reader: &mut R) -> Result<(Vec<u8>, Vec<u8>)> {
    let version = read_line(reader)?;
    if version != VERSION_LINE.as_bytes() {
        return Err(Error::Protocol(format!(
            "invalid version header '{}'",
            String::from_utf8_lossy(&version)
        )));
    }

    let first = read_operand(reader)?;
    let second = read_operand(reader)?;
    Ok((first, second))
}

/// Read one `\n`-terminated line, without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    if line.pop() != Some(b'\n') {
        return Err(Error::Protocol("unexpected end of input".to_string()));
    }
    Ok(line)
}

fn read_operand<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let line = read_line(reader)?;
    if line.is_empty() || !line.iter().all(u8::is_ascii_digit) {
        return Err(Error::Protocol(format!(
            "invalid length '{}'",
            String::from_utf8_lossy(&line)
        )));
    }
    let len: usize = std::str::from_utf8(&line)
        .ok()
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| Error::Protocol("length out of range".to_string()))?;

    if len > MAX_OPERAND_LEN {
        return Err(Error::Protocol(format!("operand too large: {} bytes", len)));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::Protocol(format!("truncated operand: expected {} bytes", len))
        } else {
            Error::Io(e)
        }
    })?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode_str(input: &str) -> Result<(String, String)> {
        let (first, second) = decode(&mut Cursor::new(input.as_bytes()))?;
        Ok((
            String::from_utf8(first).unwrap(),
            String::from_utf8(second).unwrap(),
        ))
    }

    #[test]
    fn test_encode_basic() {
        assert_eq!(encode(b"hello", b"world"), b"basanos:1\n5\nhello5\nworld");
        assert_eq!(encode(b"", b"world"), b"basanos:1\n0\n5\nworld");
        assert_eq!(
            encode(b"hello\nworld", b"foo\nbar"),
            b"basanos:1\n11\nhello\nworld7\nfoo\nbar"
        );
    }

    #[test]
    fn test_decode_basic() {
        let (first, second) = decode_str("basanos:1\n5\nhello5\nworld").unwrap();
        assert_eq!(first, "hello");
        assert_eq!(second, "world");
    }

    #[test]
    fn test_decode_empty_operands() {
        assert_eq!(
            decode_str("basanos:1\n0\n5\nworld").unwrap(),
            ("".to_string(), "world".to_string())
        );
        assert_eq!(
            decode_str("basanos:1\n5\nhello0\n").unwrap(),
            ("hello".to_string(), "".to_string())
        );
    }

    #[test]
    fn test_decode_operands_with_newlines() {
        let (first, second) = decode_str("basanos:1\n11\nhello\nworld7\nfoo\nbar").unwrap();
        assert_eq!(first, "hello\nworld");
        assert_eq!(second, "foo\nbar");
    }

    #[test]
    fn test_decode_rejects_bad_version() {
        let err = decode_str("invalid:2\n5\nhello5\nworld").unwrap_err();
        assert!(err.to_string().contains("version"));
        assert!(decode_str("basanos:10\n0\n0\n").is_err());
        assert!(decode_str("basanos:1").is_err());
    }

    #[test]
    fn test_decode_rejects_truncation() {
        assert!(decode_str("basanos:1\n10\nhello").is_err());
        assert!(decode_str("basanos:1\n5\nhello").is_err());
        assert!(decode_str("basanos:1\n5\nhello5").is_err());
        assert!(decode_str("").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        assert!(decode_str("basanos:1\nfive\nhello5\nworld").is_err());
        assert!(decode_str("basanos:1\n-1\n5\nworld").is_err());
        assert!(decode_str("basanos:1\n\nhello").is_err());
    }

    #[test]
    fn test_round_trip_binary() {
        let first: Vec<u8> = (0u8..=255).collect();
        let second = b"\n\n5\nbasanos:1\n".to_vec();
        let encoded = encode(&first, &second);
        let decoded = decode(&mut Cursor::new(encoded)).unwrap();
        assert_eq!(decoded, (first, second));
    }
}
