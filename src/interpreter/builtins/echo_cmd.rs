//! echo - Write arguments to standard output
//!
//! echo [-neE] [arg ...]
//!
//! Escape sequences are only interpreted with `-e` (BSD_ECHO behaviour).
//! `\c` suppresses the rest of the output, including the newline.

use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};

/// Result of interpreting backslash escapes
pub struct Unescaped {
    pub text: String,
    /// `\c` was seen: print nothing further
    pub stop: bool,
}

/// Interpret backslash escapes. `octal_prefix` selects the `\0nnn` form
/// used by `echo` and `%b` over the `\nnn` form of printf formats.
pub fn unescape(text: &str, octal_prefix: bool) -> Unescaped {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;
        let c = chars[i];
        i += 1;
        match c {
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'e' | 'E' => out.push('\x1b'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '\\' => out.push('\\'),
            'c' => return Unescaped { text: out, stop: true },
            'x' => {
                let digits: String = chars[i..].iter().take(2).take_while(|c| c.is_ascii_hexdigit()).collect();
                if digits.is_empty() {
                    out.push_str("\\x");
                } else {
                    i += digits.len();
                    push_code(&mut out, u32::from_str_radix(&digits, 16).unwrap_or(0));
                }
            }
            '0'..='7' if !octal_prefix || c == '0' => {
                let (start, max) = if octal_prefix { (i, 3) } else { (i - 1, 3) };
                let digits: String = chars[start..].iter().take(max).take_while(|c| c.is_digit(8)).collect();
                i = start + digits.len();
                push_code(&mut out, u32::from_str_radix(&digits, 8).unwrap_or(0));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Unescaped { text: out, stop: false }
}

fn push_code(out: &mut String, code: u32) {
    if let Some(ch) = char::from_u32(code & 0xff) {
        out.push(ch);
    }
}

pub fn handle_echo(_ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let mut newline = true;
    let mut escapes = false;
    let mut rest = args;
    while let Some(arg) = rest.first() {
        let Some(flags) = arg.strip_prefix('-') else { break };
        if flags.is_empty() || !flags.chars().all(|c| matches!(c, 'n' | 'e' | 'E')) {
            break;
        }
        for c in flags.chars() {
            match c {
                'n' => newline = false,
                'e' => escapes = true,
                _ => escapes = false,
            }
        }
        rest = &rest[1..];
    }

    let joined = rest.join(" ");
    let mut out = if escapes {
        let unescaped = unescape(&joined, true);
        if unescaped.stop {
            return Ok(ExecResult::new(unescaped.text, String::new(), 0));
        }
        unescaped.text
    } else {
        joined
    };
    if newline {
        out.push('\n');
    }
    Ok(ExecResult::new(out, String::new(), 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(args: &[&str]) -> String {
        let mut ctx = ShellContext::default();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        handle_echo(&mut ctx, &args).unwrap().stdout
    }

    #[test]
    fn test_echo_flags() {
        assert_eq!(echo(&["a", "b"]), "a b\n");
        assert_eq!(echo(&["-n", "x"]), "x");
        assert_eq!(echo(&["a\\tb"]), "a\\tb\n");
        assert_eq!(echo(&["-e", "a\\tb"]), "a\tb\n");
        assert_eq!(echo(&["-e", "one\\ctwo"]), "one");
        assert_eq!(echo(&["-x"]), "-x\n");
        assert_eq!(echo(&["-en", "\\x41\\0101"]), "AA");
    }

    #[test]
    fn test_unescape_printf_octal() {
        assert_eq!(unescape("\\101\\n", false).text, "A\n");
        assert_eq!(unescape("\\q", false).text, "\\q");
    }
}
