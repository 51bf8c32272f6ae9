//! Pattern Matching
//!
//! The one glob-to-regex converter behind case arms, `[[ == ]]`,
//! `${var#pattern}`-style operations and filename globbing.
//!
//! Pattern text uses backslash escapes for characters that came from quoted
//! sources, so `"*"` arrives here as `\*` and matches only a star.
//!
//! Always available: `*`, `?`, `[...]` (with `!`/`^` negation and POSIX
//! classes), `(a|b)` alternation and `<n-m>` numeric ranges.
//! With `EXTENDED_GLOB`: leading `^pat` negation, `pat~excl` exclusion,
//! `x#` (zero or more) and `x##` (one or more).

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex_lite::Regex;

lazy_static! {
    /// POSIX character class bodies, ASCII only
    static ref POSIX_CLASSES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("alnum", "a-zA-Z0-9");
        m.insert("alpha", "a-zA-Z");
        m.insert("ascii", "\\x00-\\x7F");
        m.insert("blank", " \\t");
        m.insert("cntrl", "\\x00-\\x1F\\x7F");
        m.insert("digit", "0-9");
        m.insert("graph", "!-~");
        m.insert("lower", "a-z");
        m.insert("print", " -~");
        m.insert("punct", "!-/:-@\\[-`{-~");
        m.insert("space", " \\t\\n\\r\\x0C\\x0B");
        m.insert("upper", "A-Z");
        m.insert("word", "a-zA-Z0-9_");
        m.insert("xdigit", "0-9A-Fa-f");
        m
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// `EXTENDED_GLOB` operators
    pub extended: bool,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    /// Fallback for text that is not a valid pattern
    Exact(String),
}

/// A pattern ready for repeated matching
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    matcher: Matcher,
    /// Bounds for each `<n-m>` capture group, in order
    ranges: Vec<(Option<u64>, Option<u64>)>,
    negated: bool,
    exclude: Option<Box<CompiledPattern>>,
}

impl CompiledPattern {
    pub fn compile(pattern: &str, opts: PatternOptions) -> Result<Self, regex_lite::Error> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut body: &[char] = &chars;
        let mut negated = false;
        let mut exclude = None;

        if opts.extended {
            if let Some(pos) = find_top_level(body, '~') {
                if pos > 0 {
                    let excl: String = body[pos + 1..].iter().collect();
                    exclude = Some(Box::new(CompiledPattern::compile(&excl, opts)?));
                    body = &chars[..pos];
                }
            }
            if body.first() == Some(&'^') && body.len() > 1 {
                negated = true;
                body = &body[1..];
            }
        }

        let mut ranges = Vec::new();
        let mut i = 0;
        let translated = translate(body, &mut i, false, opts, &mut ranges);
        let flags = if opts.case_insensitive { "(?si)" } else { "(?s)" };
        let regex = Regex::new(&format!("{}^(?:{})$", flags, translated))?;
        Ok(Self {
            matcher: Matcher::Regex(regex),
            ranges,
            negated,
            exclude,
        })
    }

    /// Pattern matching only the literal (unescaped) text of `pattern`
    pub fn literal(pattern: &str) -> Self {
        Self {
            matcher: Matcher::Exact(unescape_pattern(pattern)),
            ranges: Vec::new(),
            negated: false,
            exclude: None,
        }
    }

    /// Compile, falling back to a literal match for invalid patterns
    pub fn compile_or_literal(pattern: &str, opts: PatternOptions) -> Self {
        Self::compile(pattern, opts).unwrap_or_else(|_| Self::literal(pattern))
    }

    pub fn matches(&self, text: &str) -> bool {
        let regex = match &self.matcher {
            Matcher::Regex(regex) => regex,
            Matcher::Exact(literal) => return literal == text,
        };
        let matched = match regex.captures(text) {
            Some(caps) => self.ranges.iter().enumerate().all(|(idx, (lo, hi))| {
                let Some(m) = caps.get(idx + 1) else {
                    return true;
                };
                match m.as_str().parse::<u64>() {
                    Ok(n) => lo.map_or(true, |lo| n >= lo) && hi.map_or(true, |hi| n <= hi),
                    Err(_) => false,
                }
            }),
            None => false,
        };
        let matched = matched != self.negated;
        matched && !self.exclude.as_ref().map_or(false, |e| e.matches(text))
    }
}

/// Match `text` against a pattern. An uncompilable pattern matches only
/// its own literal text.
pub fn pattern_matches(pattern: &str, text: &str, opts: PatternOptions) -> bool {
    CompiledPattern::compile_or_literal(pattern, opts).matches(text)
}

/// Index of the first unescaped `target` outside brackets and groups
pub(crate) fn find_top_level(chars: &[char], target: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => {
                if let Some(end) = bracket_end(chars, i) {
                    i = end;
                }
            }
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the `]` closing a bracket expression opened at `start`
fn bracket_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if matches!(chars.get(i), Some('!') | Some('^')) {
        i += 1;
    }
    // A leading `]` is a member, not the terminator
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' if chars.get(i + 1) == Some(&':') => {
                let rest: String = chars[i + 2..].iter().collect();
                if let Some(end) = rest.find(":]") {
                    i += 2 + rest[..end].chars().count() + 1;
                }
            }
            ']' => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// `<n-m>` at `start`: returns (end index, low, high)
fn numeric_range(chars: &[char], start: usize) -> Option<(usize, Option<u64>, Option<u64>)> {
    let mut i = start + 1;
    let lo_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let lo: String = chars[lo_start..i].iter().collect();
    if chars.get(i) != Some(&'-') {
        return None;
    }
    i += 1;
    let hi_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let hi: String = chars[hi_start..i].iter().collect();
    if chars.get(i) != Some(&'>') {
        return None;
    }
    Some((i, lo.parse().ok(), hi.parse().ok()))
}

fn has_closing_paren(chars: &[char], open: usize) -> bool {
    let mut depth = 0;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

fn escape_char(c: char) -> String {
    regex_lite::escape(&c.to_string())
}

/// Translate a bracket expression `[...]` spanning `start..=end`
fn translate_bracket(chars: &[char], start: usize, end: usize) -> String {
    let mut out = String::from("[");
    let mut i = start + 1;
    if matches!(chars.get(i), Some('!') | Some('^')) {
        out.push('^');
        i += 1;
    }
    let first = i;
    while i < end {
        let c = chars[i];
        if c == '[' && chars.get(i + 1) == Some(&':') {
            let rest: String = chars[i + 2..end].iter().collect();
            if let Some(close) = rest.find(":]") {
                let name = &rest[..close];
                if let Some(body) = POSIX_CLASSES.get(name) {
                    out.push_str(body);
                }
                i += 2 + name.chars().count() + 2;
                continue;
            }
        }
        match c {
            '\\' if i + 1 < end => {
                out.push_str(&escape_char(chars[i + 1]));
                i += 2;
                continue;
            }
            '-' if i != first && i + 1 != end => out.push('-'),
            ']' | '[' | '\\' | '^' | '&' | '~' | '-' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out.push(']');
    out
}

/// Translate a pattern sequence. Stops after the `)` closing a group when
/// `in_group` is set.
fn translate(
    chars: &[char],
    i: &mut usize,
    in_group: bool,
    opts: PatternOptions,
    ranges: &mut Vec<(Option<u64>, Option<u64>)>,
) -> String {
    let mut atoms: Vec<String> = Vec::new();
    // Whether the last atom can take a `#` quantifier
    let mut quantifiable = false;

    while *i < chars.len() {
        let c = chars[*i];
        match c {
            '\\' => {
                match chars.get(*i + 1) {
                    Some(&n) => {
                        atoms.push(escape_char(n));
                        *i += 1;
                    }
                    None => atoms.push(escape_char('\\')),
                }
                quantifiable = true;
            }
            '*' => {
                atoms.push(".*".to_string());
                quantifiable = false;
            }
            '?' => {
                atoms.push(".".to_string());
                quantifiable = true;
            }
            '[' => match bracket_end(chars, *i) {
                Some(end) => {
                    atoms.push(translate_bracket(chars, *i, end));
                    *i = end;
                    quantifiable = true;
                }
                None => {
                    atoms.push(escape_char('['));
                    quantifiable = true;
                }
            },
            '<' => match numeric_range(chars, *i) {
                Some((end, lo, hi)) => {
                    atoms.push("([0-9]+)".to_string());
                    ranges.push((lo, hi));
                    *i = end;
                    quantifiable = false;
                }
                None => {
                    atoms.push(escape_char('<'));
                    quantifiable = true;
                }
            },
            '(' if has_closing_paren(chars, *i) => {
                *i += 1;
                let inner = translate(chars, i, true, opts, ranges);
                atoms.push(format!("(?:{})", inner));
                quantifiable = true;
            }
            ')' if in_group => {
                return atoms.concat();
            }
            '|' if in_group => {
                atoms.push("|".to_string());
                quantifiable = false;
            }
            '#' if opts.extended && quantifiable => {
                let atom = atoms.pop().unwrap_or_default();
                if chars.get(*i + 1) == Some(&'#') {
                    atoms.push(format!("(?:{})+", atom));
                    *i += 1;
                } else {
                    atoms.push(format!("(?:{})*", atom));
                }
                quantifiable = false;
            }
            _ => {
                atoms.push(escape_char(c));
                quantifiable = true;
            }
        }
        *i += 1;
    }
    atoms.concat()
}

// ============================================================================
// Escaping
// ============================================================================

fn is_glob_meta(c: char, extended: bool) -> bool {
    matches!(c, '*' | '?' | '[' | ']' | '(' | ')' | '|' | '<' | '>' | '\\')
        || (extended && matches!(c, '^' | '~' | '#'))
}

/// Backslash-escape pattern characters so `text` matches literally
pub fn escape_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_glob_meta(c, true) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Drop backslash escapes, leaving the literal text
pub fn unescape_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(n) = chars.next() {
                out.push(n);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Whether a pattern contains an unescaped glob operator
pub fn has_glob_chars(pattern: &str, extended: bool) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '*' | '?' => return true,
            '[' if bracket_end(&chars, i).is_some() => return true,
            '<' if numeric_range(&chars, i).is_some() => return true,
            '(' if has_closing_paren(&chars, i) => return true,
            '^' if extended && i == 0 => return true,
            '~' if extended && i > 0 => return true,
            '#' if extended && i > 0 => return true,
            _ => {}
        }
        i += 1;
    }
    false
}
