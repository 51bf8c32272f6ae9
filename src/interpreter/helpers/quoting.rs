//! Quoting values for re-input
//!
//! Used wherever the shell prints something meant to be read back:
//! `typeset -p`, `set`, `alias`, `export -p` and xtrace lines.

/// Characters that never need quoting
fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '.' | ':' | '-' | '@' | '%' | '+' | ',' | '=')
}

/// `$'...'` form for values containing control characters
fn ansi_c_quote(value: &str) -> String {
    let mut out = String::from("$'");
    for c in value.chars() {
        match c {
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '\x1b' => out.push_str("\\e"),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 || c == '\x7f' => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Quote `value` so the shell reads it back unchanged. Plain words are
/// left alone, the empty string becomes `''`.
pub fn quote_value(value: &str) -> String {
    if value.chars().any(|c| (c as u32) < 0x20 || c == '\x7f') {
        return ansi_c_quote(value);
    }
    if !value.is_empty() && value.chars().all(is_plain) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Always single-quoted, as `typeset -p` prints scalar values
pub fn single_quote(value: &str) -> String {
    if value.chars().any(|c| (c as u32) < 0x20 || c == '\x7f') {
        return ansi_c_quote(value);
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_value() {
        assert_eq!(quote_value("abc"), "abc");
        assert_eq!(quote_value(""), "''");
        assert_eq!(quote_value("a b"), "'a b'");
        assert_eq!(quote_value("it's"), "'it'\\''s'");
        assert_eq!(quote_value("a\nb"), "$'a\\nb'");
    }

    #[test]
    fn test_single_quote() {
        assert_eq!(single_quote("x"), "'x'");
        assert_eq!(single_quote("tab\t"), "$'tab\\t'");
    }
}
