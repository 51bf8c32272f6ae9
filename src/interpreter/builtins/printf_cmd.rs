//! printf - Formatted output
//!
//! printf [-v var] format [arg ...]
//!
//! Conversions: %s %b %c %d %i %u %o %x %X %f %e %E %g %G %q %%, with
//! flags `-+ #0`, width and precision (`*` takes them from the
//! arguments). The format is reused until the arguments run out.

use super::builtin_error;
use super::echo_cmd::unescape;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::quoting::quote_value;
use crate::interpreter::types::{ExecResult, ShellContext};

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    alternate: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Output plus any conversion diagnostics
#[derive(Debug, Default)]
pub struct Formatted {
    pub text: String,
    pub errors: Vec<String>,
}

struct Args<'a> {
    values: &'a [String],
    next: usize,
}

impl<'a> Args<'a> {
    fn take(&mut self) -> Option<&'a str> {
        let value = self.values.get(self.next)?;
        self.next += 1;
        Some(value.as_str())
    }
}

fn parse_int(text: &str, errors: &mut Vec<String>) -> i64 {
    let t = text.trim();
    if let Some(ch) = t.strip_prefix('\'').or_else(|| t.strip_prefix('"')) {
        return ch.chars().next().map_or(0, |c| c as i64);
    }
    let (negative, digits) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<i64>()
    };
    match parsed {
        Ok(n) => if negative { -n } else { n },
        Err(_) if t.is_empty() => 0,
        Err(_) => {
            errors.push(format!("{}: invalid number", text));
            0
        }
    }
}

fn parse_float(text: &str, errors: &mut Vec<String>) -> f64 {
    let t = text.trim();
    if let Some(ch) = t.strip_prefix('\'') {
        return ch.chars().next().map_or(0.0, |c| c as u32 as f64);
    }
    if t.is_empty() {
        return 0.0;
    }
    t.parse::<f64>().unwrap_or_else(|_| {
        errors.push(format!("{}: invalid number", text));
        0.0
    })
}

fn pad(body: String, spec: &Spec, numeric: bool) -> String {
    let width = spec.width.unwrap_or(0);
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill = width - len;
    if spec.left {
        return body + &" ".repeat(fill);
    }
    if spec.zero && numeric {
        let sign_len = body.chars().take_while(|c| matches!(c, '-' | '+' | ' ')).count();
        let prefix_len = if body[sign_len..].starts_with("0x") || body[sign_len..].starts_with("0X") {
            sign_len + 2
        } else {
            sign_len
        };
        let (head, tail) = body.split_at(prefix_len);
        return format!("{}{}{}", head, "0".repeat(fill), tail);
    }
    " ".repeat(fill) + &body
}

fn signed(n: i64, spec: &Spec) -> String {
    let mut digits = n.unsigned_abs().to_string();
    if let Some(p) = spec.precision {
        if digits.len() < p {
            digits = "0".repeat(p - digits.len()) + &digits;
        }
    }
    let sign = if n < 0 {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    };
    format!("{}{}", sign, digits)
}

fn unsigned(n: i64, conv: char, spec: &Spec) -> String {
    let u = n as u64;
    let mut digits = match conv {
        'o' => format!("{:o}", u),
        'x' => format!("{:x}", u),
        'X' => format!("{:X}", u),
        _ => u.to_string(),
    };
    if let Some(p) = spec.precision {
        if digits.len() < p {
            digits = "0".repeat(p - digits.len()) + &digits;
        }
    }
    if spec.alternate && u != 0 {
        match conv {
            'o' if !digits.starts_with('0') => digits.insert(0, '0'),
            'x' => digits.insert_str(0, "0x"),
            'X' => digits.insert_str(0, "0X"),
            _ => {}
        }
    }
    digits
}

/// `1.5e3` -> `1.500000e+03`
fn exponent_form(v: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, v);
    let (mantissa, exp) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let s = format!("{}e{}{:02}", mantissa, sign, exp.abs());
    if upper { s.to_uppercase() } else { s }
}

fn strip_fraction_zeros(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    let (num, exp) = match s.find(['e', 'E']) {
        Some(i) => (s[..i].to_string(), s[i..].to_string()),
        None => (s.clone(), String::new()),
    };
    let trimmed = num.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, exp)
}

fn float(v: f64, conv: char, spec: &Spec) -> String {
    let precision = spec.precision.unwrap_or(6);
    let body = if !v.is_finite() {
        let s = if v.is_nan() { "nan" } else if v > 0.0 { "inf" } else { "-inf" };
        if conv.is_ascii_uppercase() { s.to_uppercase() } else { s.to_string() }
    } else {
        match conv {
            'f' | 'F' => format!("{:.*}", precision, v),
            'e' | 'E' => exponent_form(v, precision, conv == 'E'),
            _ => {
                let p = precision.max(1);
                let exp = if v == 0.0 { 0 } else { v.abs().log10().floor() as i32 };
                let s = if exp < -4 || exp >= p as i32 {
                    exponent_form(v, p - 1, conv == 'G')
                } else {
                    format!("{:.*}", (p as i32 - 1 - exp).max(0) as usize, v)
                };
                if spec.alternate { s } else { strip_fraction_zeros(s) }
            }
        }
    };
    if v >= 0.0 && spec.plus {
        format!("+{}", body)
    } else if v >= 0.0 && spec.space {
        format!(" {}", body)
    } else {
        body
    }
}

/// Length of the escape sequence at the start of `rest`
fn escape_len(rest: &[char]) -> usize {
    match rest.get(1) {
        None => 1,
        Some('0'..='7') => 1 + rest[1..].iter().take(3).take_while(|c| c.is_digit(8)).count(),
        Some('x') => 2 + rest[2..].iter().take(2).take_while(|c| c.is_ascii_hexdigit()).count(),
        Some(_) => 2,
    }
}

/// Expand one pass of `format`. Returns true when `\c` or `%b` with `\c`
/// ended all output.
fn format_once(format: &[char], args: &mut Args, out: &mut Formatted) -> bool {
    let mut i = 0;
    while i < format.len() {
        let c = format[i];
        if c == '\\' {
            let len = escape_len(&format[i..]);
            let piece: String = format[i..i + len].iter().collect();
            let unescaped = unescape(&piece, false);
            out.text.push_str(&unescaped.text);
            if unescaped.stop {
                return true;
            }
            i += len;
            continue;
        }
        if c != '%' {
            out.text.push(c);
            i += 1;
            continue;
        }
        i += 1;
        if format.get(i) == Some(&'%') {
            out.text.push('%');
            i += 1;
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = format.get(i) {
            match flag {
                '-' => spec.left = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '#' => spec.alternate = true,
                '0' => spec.zero = true,
                _ => break,
            }
            i += 1;
        }
        if format.get(i) == Some(&'*') {
            let w = parse_int(args.take().unwrap_or(""), &mut out.errors);
            if w < 0 {
                spec.left = true;
            }
            spec.width = Some(w.unsigned_abs() as usize);
            i += 1;
        } else {
            let digits: String = format[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
            i += digits.len();
            spec.width = digits.parse().ok();
        }
        if format.get(i) == Some(&'.') {
            i += 1;
            if format.get(i) == Some(&'*') {
                let p = parse_int(args.take().unwrap_or(""), &mut out.errors);
                spec.precision = Some(p.max(0) as usize);
                i += 1;
            } else {
                let digits: String = format[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
                i += digits.len();
                spec.precision = Some(digits.parse().unwrap_or(0));
            }
        }
        // Length modifiers are accepted and ignored
        while matches!(format.get(i), Some('l' | 'h' | 'L' | 'j' | 'z' | 't')) {
            i += 1;
        }
        let Some(&conv) = format.get(i) else {
            out.text.push('%');
            break;
        };
        i += 1;

        let arg = args.take();
        let piece = match conv {
            's' => {
                let mut s = arg.unwrap_or("").to_string();
                if let Some(p) = spec.precision {
                    s = s.chars().take(p).collect();
                }
                pad(s, &spec, false)
            }
            'b' => {
                let unescaped = unescape(arg.unwrap_or(""), true);
                let mut s = unescaped.text;
                if let Some(p) = spec.precision {
                    s = s.chars().take(p).collect();
                }
                out.text.push_str(&pad(s, &spec, false));
                if unescaped.stop {
                    return true;
                }
                continue;
            }
            'q' => pad(quote_value(arg.unwrap_or("")), &spec, false),
            'c' => pad(arg.and_then(|a| a.chars().next()).map(String::from).unwrap_or_default(), &spec, false),
            'd' | 'i' => {
                let n = parse_int(arg.unwrap_or("0"), &mut out.errors);
                pad(signed(n, &spec), &spec, spec.precision.is_none())
            }
            'u' | 'o' | 'x' | 'X' => {
                let n = parse_int(arg.unwrap_or("0"), &mut out.errors);
                pad(unsigned(n, conv, &spec), &spec, spec.precision.is_none())
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
                let v = parse_float(arg.unwrap_or("0"), &mut out.errors);
                pad(float(v, conv, &spec), &spec, true)
            }
            other => {
                out.errors.push(format!("%{}: invalid directive", other));
                String::new()
            }
        };
        out.text.push_str(&piece);
    }
    false
}

/// Apply `format` to `values`, repeating it while arguments remain
pub fn format_printf(format: &str, values: &[String]) -> Formatted {
    let chars: Vec<char> = format.chars().collect();
    let mut args = Args { values, next: 0 };
    let mut out = Formatted::default();
    loop {
        let before = args.next;
        if format_once(&chars, &mut args, &mut out) {
            break;
        }
        if args.next == before || args.next >= values.len() {
            break;
        }
    }
    out
}

pub fn handle_printf(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let mut rest = args;
    let mut target: Option<String> = None;
    if rest.first().map(String::as_str) == Some("-v") {
        let Some(name) = rest.get(1) else {
            return Ok(builtin_error("printf", "-v: argument expected"));
        };
        target = Some(name.clone());
        rest = &rest[2..];
    }
    if rest.first().map(String::as_str) == Some("--") {
        rest = &rest[1..];
    }
    let Some(format) = rest.first() else {
        return Ok(builtin_error("printf", "not enough arguments"));
    };

    let formatted = format_printf(format, &rest[1..]);
    let stderr: String = formatted.errors.iter().map(|e| format!("zshell: printf: {}\n", e)).collect();
    let status = if formatted.errors.is_empty() { 0 } else { 1 };
    match target {
        Some(name) => {
            ctx.assign(&name, formatted.text)?;
            Ok(ExecResult::new(String::new(), stderr, status))
        }
        None => Ok(ExecResult::new(formatted.text, stderr, status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(format: &str, args: &[&str]) -> String {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        format_printf(format, &args).text
    }

    #[test]
    fn test_basic_conversions() {
        assert_eq!(fmt("%s-%s\\n", &["a", "b"]), "a-b\n");
        assert_eq!(fmt("%d %i %%", &["42", "-7"]), "42 -7 %");
        assert_eq!(fmt("%x %X %o", &["255", "255", "8"]), "ff FF 10");
        assert_eq!(fmt("%c", &["hello"]), "h");
        assert_eq!(fmt("%b", &["a\\tb"]), "a\tb");
        assert_eq!(fmt("%d", &["'A"]), "65");
    }

    #[test]
    fn test_width_and_precision() {
        assert_eq!(fmt("[%5s]", &["ab"]), "[   ab]");
        assert_eq!(fmt("[%-5s]", &["ab"]), "[ab   ]");
        assert_eq!(fmt("[%05d]", &["-42"]), "[-0042]");
        assert_eq!(fmt("[%.2f]", &["3.14159"]), "[3.14]");
        assert_eq!(fmt("[%8.3f]", &["2.5"]), "[   2.500]");
        assert_eq!(fmt("[%.3s]", &["abcdef"]), "[abc]");
        assert_eq!(fmt("[%*d]", &["4", "7"]), "[   7]");
        assert_eq!(fmt("%e", &["1500"]), "1.500000e+03");
        assert_eq!(fmt("%g %g", &["0.0001", "100000"]), "0.0001 100000");
    }

    #[test]
    fn test_format_reuse() {
        assert_eq!(fmt("%s=%s\\n", &["a", "1", "b", "2"]), "a=1\nb=2\n");
        assert_eq!(fmt("%s\\n", &[]), "\n");
        assert_eq!(fmt("x\\n", &["ignored"]), "x\n");
    }

    #[test]
    fn test_invalid_number() {
        let args = vec!["abc".to_string()];
        let out = format_printf("%d", &args);
        assert_eq!(out.text, "0");
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn test_printf_to_variable() {
        let mut ctx = ShellContext::default();
        let args: Vec<String> = ["-v", "out", "%03d", "7"].iter().map(|s| s.to_string()).collect();
        let r = handle_printf(&mut ctx, &args).unwrap();
        assert_eq!(r.stdout, "");
        assert_eq!(ctx.get_var("out").as_deref(), Some("007"));
    }
}
