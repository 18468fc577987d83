//! Variable expansion and quote-aware tokenizing of assertion commands

use std::collections::BTreeMap;

/// Replace `$NAME` and `${NAME}` with values from `env`
///
/// Unknown names expand to the empty string. A `$` not followed by a name
/// is kept, and an unterminated `${` is copied through unchanged.
pub fn expand(command: &str, env: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(command.len());
    let mut rest = command;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) if end > 0 => {
                    let name = &braced[..end];
                    out.push_str(env.get(name).map(String::as_str).unwrap_or(""));
                    rest = &braced[end + 1..];
                }
                _ => {
                    out.push('$');
                    rest = after;
                }
            }
            continue;
        }

        let len = after
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        if len == 0 {
            out.push('$');
        } else {
            out.push_str(env.get(&after[..len]).map(String::as_str).unwrap_or(""));
        }
        rest = &after[len..];
    }

    out.push_str(rest);
    out
}

/// Split a command into its executable and arguments
///
/// Double and single quotes toggle quoting; spaces inside quotes are
/// literal. A backslash escapes the next character only inside double
/// quotes. An empty quoted token (`""`) still counts as an argument.
pub fn tokenize(command: &str) -> Option<(String, Vec<String>)> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;
    let mut quoted = false;

    for c in command.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_double => escaped = true,
            '"' if !in_single => {
                in_double = !in_double;
                quoted = true;
            }
            '\'' if !in_double => {
                in_single = !in_single;
                quoted = true;
            }
            ' ' if !in_double && !in_single => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                    quoted = false;
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }

    let mut tokens = tokens.into_iter();
    let program = tokens.next()?;
    Some((program, tokens.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn args(command: &str) -> (String, Vec<String>) {
        tokenize(command).unwrap()
    }

    #[test]
    fn test_expand_both_forms() {
        let env = env(&[("RUN_OUTPUT", "/tmp/run"), ("NAME", "x")]);
        assert_eq!(
            expand("assert_equals 0 ${RUN_OUTPUT}/exit_code", &env),
            "assert_equals 0 /tmp/run/exit_code"
        );
        assert_eq!(expand("$NAME-$NAME", &env), "x-x");
        assert_eq!(expand("a${NAME}b", &env), "axb");
    }

    #[test]
    fn test_expand_unknown_is_empty() {
        assert_eq!(expand("[$MISSING]", &BTreeMap::new()), "[]");
        assert_eq!(expand("[${MISSING}]", &BTreeMap::new()), "[]");
    }

    #[test]
    fn test_expand_keeps_stray_dollar() {
        let empty = BTreeMap::new();
        assert_eq!(expand("cost $ 5", &empty), "cost $ 5");
        assert_eq!(expand("end$", &empty), "end$");
        assert_eq!(expand("${unclosed", &empty), "${unclosed");
    }

    #[test]
    fn test_tokenize_plain() {
        let (program, rest) = args("assert_equals  a b");
        assert_eq!(program, "assert_equals");
        assert_eq!(rest, vec!["a", "b"]);
    }

    #[test]
    fn test_tokenize_escaped_quotes() {
        let (program, rest) = args(r#"cmd "hello \"world\"" arg"#);
        assert_eq!(program, "cmd");
        assert_eq!(rest, vec![r#"hello "world""#, "arg"]);
    }

    #[test]
    fn test_tokenize_single_quotes_are_literal() {
        let (_, rest) = args(r#"cmd 'a "b" \n' c"#);
        assert_eq!(rest, vec![r#"a "b" \n"#, "c"]);
    }

    #[test]
    fn test_tokenize_empty_quotes_count() {
        let (_, rest) = args(r#"assert_equals "" ''"#);
        assert_eq!(rest, vec!["", ""]);
    }

    #[test]
    fn test_tokenize_backslash_outside_quotes_is_literal() {
        let (_, rest) = args(r"cmd a\b");
        assert_eq!(rest, vec![r"a\b"]);
    }

    #[test]
    fn test_tokenize_empty_command() {
        assert!(tokenize("").is_none());
        assert!(tokenize("   ").is_none());
    }
}
