//! Operand resolution for literal-argument mode
//!
//! An operand naming an existing file stands for that file's raw bytes;
//! anything else is taken verbatim.

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// Resolve an operand against the current directory
pub fn resolve_value(arg: &str) -> Result<Vec<u8>> {
    resolve_value_in(arg, None)
}

/// Resolve an operand, interpreting relative paths against `base`
pub fn resolve_value_in(arg: &str, base: Option<&Path>) -> Result<Vec<u8>> {
    if arg.is_empty() {
        return Ok(Vec::new());
    }
    let path = match base {
        Some(base) => base.join(arg),
        None => PathBuf::from(arg),
    };
    if !path.is_file() {
        return Ok(arg.as_bytes().to_vec());
    }
    std::fs::read(&path).map_err(|e| Error::resolution(arg, e))
}

/// Which operands of a primitive may name fixture files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Both operands are file-or-literal
    BothValues,
    /// First operand is literal, second is file-or-literal
    LiteralAndValue,
    /// Both operands are literal
    Literals,
}

impl Resolution {
    /// Resolve exactly two command-line operands
    pub fn resolve(self, args: &[String]) -> Result<(Vec<u8>, Vec<u8>)> {
        let [first, second] = args else {
            return Err(Error::resolution(
                &args.join(" "),
                format!("expected 2 arguments, got {}", args.len()),
            ));
        };
        match self {
            Self::BothValues => Ok((resolve_value(first)?, resolve_value(second)?)),
            Self::LiteralAndValue => Ok((first.as_bytes().to_vec(), resolve_value(second)?)),
            Self::Literals => Ok((first.as_bytes().to_vec(), second.as_bytes().to_vec())),
        }
    }
}
