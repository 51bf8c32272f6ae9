//! Word Parsing
//!
//! Turns the raw text of a word token (quotes still in place) into a
//! `WordNode` of typed parts: literals, quoted strings, parameter
//! expansions, command/arithmetic/process substitutions, brace expansions
//! and tilde prefixes.
//!
//! Three contexts are supported:
//! - unquoted words (brace, tilde and process substitution are recognised)
//! - double-quoted content
//! - here-document bodies (like double quotes, but `"` is literal)

use crate::ast::types::{
    BraceItem, CommandSubstitutionPart, ParameterExpansion, ParameterOp, PatternSide,
    ProcessDirection, ProcessSubstitutionPart, ReplaceAnchor, WordNode, WordPart,
};
use crate::parser::lexer::is_valid_name;
use crate::parser::parser::parse;
use crate::parser::types::ParseException;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordMode {
    Unquoted,
    DoubleQuoted,
    Heredoc,
}

/// Parse an unquoted word token
pub fn parse_word(text: &str) -> Result<WordNode, ParseException> {
    let chars: Vec<char> = text.chars().collect();
    let parts = WordParser::new(&chars, false).parse_parts(0, chars.len(), WordMode::Unquoted)?;
    Ok(WordNode { parts })
}

/// Parse the value side of an assignment; tilde is also expanded after `:`
pub fn parse_assignment_value(text: &str) -> Result<WordNode, ParseException> {
    let chars: Vec<char> = text.chars().collect();
    let parts = WordParser::new(&chars, true).parse_parts(0, chars.len(), WordMode::Unquoted)?;
    Ok(WordNode { parts })
}

/// Parse an unquoted here-document body
pub fn parse_heredoc_content(text: &str) -> Result<WordNode, ParseException> {
    let chars: Vec<char> = text.chars().collect();
    let parts = WordParser::new(&chars, false).parse_parts(0, chars.len(), WordMode::Heredoc)?;
    Ok(WordNode {
        parts: vec![WordPart::DoubleQuoted(parts)],
    })
}

// =============================================================================
// SCANNING HELPERS
// =============================================================================

/// Find the index of the delimiter closing the one just before `start`.
/// Quoted sections and escapes are skipped.
pub fn find_matching_bracket(chars: &[char], start: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                i += 2;
                continue;
            }
            '\'' if open == '(' => {
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    i += 1;
                }
            }
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ if c == open => depth += 1,
            _ if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split brace content on top-level commas; nested braces stay intact
fn split_brace_items(inner: &[char]) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut i = 0;
    while i < inner.len() {
        let c = inner[i];
        match c {
            '\\' if i + 1 < inner.len() => {
                current.push(c);
                current.push(inner[i + 1]);
                i += 2;
                continue;
            }
            '\'' | '"' => {
                current.push(c);
                i += 1;
                while i < inner.len() && inner[i] != c {
                    current.push(inner[i]);
                    i += 1;
                }
                if i < inner.len() {
                    current.push(c);
                }
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
        i += 1;
    }
    items.push(current);
    items
}

/// Try to parse a numeric range like {1..10} or {01..10..2}
fn try_parse_numeric_range(inner: &str) -> Option<BraceItem> {
    let parts: Vec<&str> = inner.split("..").collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    let start: i64 = parts[0].parse().ok()?;
    let end: i64 = parts[1].parse().ok()?;
    let step = match parts.get(2) {
        Some(s) => Some(s.parse().ok()?),
        None => None,
    };
    let padded = |s: &str| {
        let digits = s.trim_start_matches('-');
        if digits.len() > 1 && digits.starts_with('0') {
            digits.len()
        } else {
            0
        }
    };
    Some(BraceItem::NumberRange {
        start,
        end,
        step,
        width: padded(parts[0]).max(padded(parts[1])),
    })
}

/// Try to parse a character range like {a..z} or {a..z..2}
fn try_parse_char_range(inner: &str) -> Option<BraceItem> {
    let parts: Vec<&str> = inner.split("..").collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    let mut first = parts[0].chars();
    let mut second = parts[1].chars();
    let start = first.next()?;
    let end = second.next()?;
    if first.next().is_some() || second.next().is_some() {
        return None;
    }
    if !start.is_ascii_alphabetic() || !end.is_ascii_alphabetic() {
        return None;
    }
    let step = match parts.get(2) {
        Some(s) => Some(s.parse().ok()?),
        None => None,
    };
    Some(BraceItem::CharRange { start, end, step })
}

// =============================================================================
// WORD PARSER
// =============================================================================

struct WordParser<'a> {
    chars: &'a [char],
    assignment: bool,
}

impl<'a> WordParser<'a> {
    fn new(chars: &'a [char], assignment: bool) -> Self {
        Self { chars, assignment }
    }

    fn error(&self, message: impl Into<String>) -> ParseException {
        ParseException::new(message, 0, 0)
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn parse_parts(&self, start: usize, end: usize, mode: WordMode) -> Result<Vec<WordPart>, ParseException> {
        let chars = self.chars;
        let mut parts: Vec<WordPart> = Vec::new();
        let mut literal = String::new();
        let mut i = start;

        macro_rules! flush {
            () => {
                if !literal.is_empty() {
                    parts.push(WordPart::Literal(std::mem::take(&mut literal)));
                }
            };
        }

        while i < end {
            let c = chars[i];

            // Tilde prefix: start of word, or after ':' / '=' in assignments
            if c == '~' && mode == WordMode::Unquoted {
                let at_start = i == start
                    || (self.assignment && matches!(chars[i - 1], ':' | '='))
                        && literal.ends_with(chars[i - 1]);
                if at_start {
                    let mut j = i + 1;
                    while j < end && (chars[j].is_ascii_alphanumeric() || matches!(chars[j], '_' | '-' | '+' | '.')) {
                        j += 1;
                    }
                    if j == end || chars[j] == '/' || (self.assignment && chars[j] == ':') {
                        flush!();
                        let user = self.text(i + 1, j);
                        parts.push(WordPart::Tilde(if user.is_empty() { None } else { Some(user) }));
                        i = j;
                        continue;
                    }
                }
            }

            match c {
                '\\' => {
                    if i + 1 >= end {
                        literal.push('\\');
                        i += 1;
                        continue;
                    }
                    let next = chars[i + 1];
                    let escapes = match mode {
                        WordMode::Unquoted => true,
                        WordMode::DoubleQuoted => matches!(next, '$' | '`' | '"' | '\\' | '\n'),
                        WordMode::Heredoc => matches!(next, '$' | '`' | '\\' | '\n'),
                    };
                    if escapes {
                        flush!();
                        if next != '\n' {
                            parts.push(WordPart::Escaped(next.to_string()));
                        }
                    } else {
                        literal.push('\\');
                        literal.push(next);
                    }
                    i += 2;
                }
                '\'' if mode == WordMode::Unquoted => {
                    flush!();
                    let mut j = i + 1;
                    while j < end && chars[j] != '\'' {
                        j += 1;
                    }
                    if j >= end {
                        return Err(self.error("unexpected EOF while looking for matching `''"));
                    }
                    parts.push(WordPart::SingleQuoted(self.text(i + 1, j)));
                    i = j + 1;
                }
                '"' if mode == WordMode::Unquoted => {
                    flush!();
                    let mut j = i + 1;
                    while j < end && chars[j] != '"' {
                        match chars[j] {
                            '\\' => j += 1,
                            '$' if j + 1 < end && matches!(chars[j + 1], '(' | '{') => {
                                let (open, close) = if chars[j + 1] == '(' { ('(', ')') } else { ('{', '}') };
                                j = find_matching_bracket(chars, j + 2, open, close)
                                    .ok_or_else(|| self.error(format!("unexpected EOF while looking for matching `{}'", close)))?;
                            }
                            '`' => {
                                j += 1;
                                while j < end && chars[j] != '`' {
                                    if chars[j] == '\\' {
                                        j += 1;
                                    }
                                    j += 1;
                                }
                            }
                            _ => {}
                        }
                        j += 1;
                    }
                    if j >= end {
                        return Err(self.error("unexpected EOF while looking for matching `\"'"));
                    }
                    let inner = self.parse_parts(i + 1, j, WordMode::DoubleQuoted)?;
                    parts.push(WordPart::DoubleQuoted(inner));
                    i = j + 1;
                }
                '`' => {
                    flush!();
                    let mut j = i + 1;
                    let mut body = String::new();
                    while j < end && chars[j] != '`' {
                        if chars[j] == '\\' && j + 1 < end && matches!(chars[j + 1], '`' | '\\' | '$') {
                            j += 1;
                        }
                        body.push(chars[j]);
                        j += 1;
                    }
                    if j >= end {
                        return Err(self.error("unexpected EOF while looking for matching ``'"));
                    }
                    parts.push(WordPart::CommandSubstitution(CommandSubstitutionPart {
                        body: parse(&body)?,
                        backtick: true,
                    }));
                    i = j + 1;
                }
                '$' => {
                    match self.parse_dollar(i, end)? {
                        Some((part, next)) => {
                            flush!();
                            parts.push(part);
                            i = next;
                        }
                        None => {
                            literal.push('$');
                            i += 1;
                        }
                    }
                }
                '<' | '>' if mode == WordMode::Unquoted && i + 1 < end && chars[i + 1] == '(' => {
                    let close = find_matching_bracket(chars, i + 2, '(', ')')
                        .ok_or_else(|| self.error("unexpected EOF while looking for matching `)'"))?;
                    flush!();
                    parts.push(WordPart::ProcessSubstitution(ProcessSubstitutionPart {
                        body: parse(&self.text(i + 2, close))?,
                        direction: if c == '<' { ProcessDirection::Input } else { ProcessDirection::Output },
                    }));
                    i = close + 1;
                }
                '{' if mode == WordMode::Unquoted => match self.try_parse_brace(i, end)? {
                    Some((part, next)) => {
                        flush!();
                        parts.push(part);
                        i = next;
                    }
                    None => {
                        literal.push('{');
                        i += 1;
                    }
                },
                _ => {
                    literal.push(c);
                    i += 1;
                }
            }
        }
        flush!();
        Ok(parts)
    }

    fn try_parse_brace(&self, start: usize, end: usize) -> Result<Option<(WordPart, usize)>, ParseException> {
        let close = match find_matching_bracket(self.chars, start + 1, '{', '}') {
            Some(c) if c < end => c,
            _ => return Ok(None),
        };
        let inner = &self.chars[start + 1..close];
        let inner_text: String = inner.iter().collect();

        if let Some(range) = try_parse_numeric_range(&inner_text).or_else(|| try_parse_char_range(&inner_text)) {
            return Ok(Some((WordPart::Brace(vec![range]), close + 1)));
        }

        let raw_items = split_brace_items(inner);
        if raw_items.len() < 2 {
            return Ok(None);
        }
        let mut items = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            items.push(BraceItem::Word(parse_word(&raw)?));
        }
        Ok(Some((WordPart::Brace(items), close + 1)))
    }

    /// Parse a `$` expansion at `i`; None when the `$` is literal
    fn parse_dollar(&self, i: usize, end: usize) -> Result<Option<(WordPart, usize)>, ParseException> {
        let chars = self.chars;
        let next = match chars.get(i + 1) {
            Some(&n) if i + 1 < end => n,
            _ => return Ok(None),
        };
        match next {
            '(' => {
                let close = find_matching_bracket(chars, i + 2, '(', ')')
                    .ok_or_else(|| self.error("unexpected EOF while looking for matching `)'"))?;
                // $(( expr )) when the inner parens close right before the outer
                if chars.get(i + 2) == Some(&'(') {
                    if let Some(inner_close) = find_matching_bracket(chars, i + 3, '(', ')') {
                        if inner_close + 1 == close {
                            return Ok(Some((WordPart::Arithmetic(self.text(i + 3, inner_close)), close + 1)));
                        }
                    }
                }
                let body = parse(&self.text(i + 2, close))?;
                Ok(Some((
                    WordPart::CommandSubstitution(CommandSubstitutionPart { body, backtick: false }),
                    close + 1,
                )))
            }
            '[' => {
                let close = find_matching_bracket(chars, i + 2, '[', ']')
                    .ok_or_else(|| self.error("unexpected EOF while looking for matching `]'"))?;
                Ok(Some((WordPart::Arithmetic(self.text(i + 2, close)), close + 1)))
            }
            '{' => {
                let close = find_matching_bracket(chars, i + 2, '{', '}')
                    .ok_or_else(|| self.error("bad substitution"))?;
                let param = self.parse_braced_parameter(i + 2, close)?;
                Ok(Some((WordPart::Parameter(param), close + 1)))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut j = i + 1;
                while j < end && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                Ok(Some((WordPart::Parameter(ParameterExpansion::simple(self.text(i + 1, j))), j)))
            }
            c if c.is_ascii_digit() || matches!(c, '?' | '!' | '#' | '$' | '@' | '*' | '-') => {
                Ok(Some((WordPart::Parameter(ParameterExpansion::simple(c.to_string())), i + 2)))
            }
            _ => Ok(None),
        }
    }

    /// Parse the body of `${...}` between `start` and `end` (exclusive)
    fn parse_braced_parameter(&self, start: usize, end: usize) -> Result<ParameterExpansion, ParseException> {
        let chars = self.chars;
        let body = self.text(start, end);
        let bad = || self.error(format!("${{{}}}: bad substitution", body));
        let mut i = start;

        // ${#name} length, but ${#} alone is the positional count
        let mut length = false;
        if chars.get(i) == Some(&'#') && i + 1 < end && !matches!(chars[i + 1], '-' | '=' | '?' | '+' | ':' | '%' | '/') {
            length = true;
            i += 1;
        }
        let mut indirect = false;
        if chars.get(i) == Some(&'!') && i + 1 < end {
            indirect = true;
            i += 1;
        }

        let name_start = i;
        if i < end && (chars[i].is_ascii_alphabetic() || chars[i] == '_') {
            while i < end && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
        } else if i < end && chars[i].is_ascii_digit() {
            while i < end && chars[i].is_ascii_digit() {
                i += 1;
            }
        } else if i < end && matches!(chars[i], '?' | '!' | '#' | '$' | '@' | '*' | '-') {
            i += 1;
        } else {
            return Err(bad());
        }
        let name = self.text(name_start, i);

        let mut subscript = None;
        if i < end && chars[i] == '[' {
            let close = find_matching_bracket(chars, i + 1, '[', ']').filter(|&c| c < end).ok_or_else(bad)?;
            subscript = Some(self.text(i + 1, close));
            i = close + 1;
        }

        let mut param = ParameterExpansion {
            name,
            subscript,
            indirect,
            op: None,
        };

        if length {
            if i != end {
                return Err(bad());
            }
            param.op = Some(ParameterOp::Length);
            return Ok(param);
        }
        if indirect && i == end && matches!(param.subscript.as_deref(), Some("@") | Some("*")) {
            param.indirect = false;
            param.op = Some(ParameterOp::Keys);
            return Ok(param);
        }
        if i == end {
            return Ok(param);
        }

        let rest = self.text(i, end);
        let word = |text: &str| parse_word(text);
        let op = if let Some(r) = rest.strip_prefix(":-") {
            ParameterOp::DefaultValue { word: word(r)?, check_empty: true }
        } else if let Some(r) = rest.strip_prefix(":=") {
            ParameterOp::AssignDefault { word: word(r)?, check_empty: true }
        } else if let Some(r) = rest.strip_prefix(":?") {
            ParameterOp::ErrorIfUnset {
                word: if r.is_empty() { None } else { Some(word(r)?) },
                check_empty: true,
            }
        } else if let Some(r) = rest.strip_prefix(":+") {
            ParameterOp::UseAlternative { word: word(r)?, check_empty: true }
        } else if let Some(r) = rest.strip_prefix(':') {
            let (offset, length) = match r.find(':') {
                Some(idx) => (r[..idx].to_string(), Some(r[idx + 1..].to_string())),
                None => (r.to_string(), None),
            };
            ParameterOp::Substring { offset, length }
        } else if let Some(r) = rest.strip_prefix('-') {
            ParameterOp::DefaultValue { word: word(r)?, check_empty: false }
        } else if let Some(r) = rest.strip_prefix('=') {
            ParameterOp::AssignDefault { word: word(r)?, check_empty: false }
        } else if let Some(r) = rest.strip_prefix('?') {
            ParameterOp::ErrorIfUnset {
                word: if r.is_empty() { None } else { Some(word(r)?) },
                check_empty: false,
            }
        } else if let Some(r) = rest.strip_prefix('+') {
            ParameterOp::UseAlternative { word: word(r)?, check_empty: false }
        } else if let Some(r) = rest.strip_prefix("##") {
            ParameterOp::RemovePattern { pattern: word(r)?, side: PatternSide::Prefix, greedy: true }
        } else if let Some(r) = rest.strip_prefix('#') {
            ParameterOp::RemovePattern { pattern: word(r)?, side: PatternSide::Prefix, greedy: false }
        } else if let Some(r) = rest.strip_prefix("%%") {
            ParameterOp::RemovePattern { pattern: word(r)?, side: PatternSide::Suffix, greedy: true }
        } else if let Some(r) = rest.strip_prefix('%') {
            ParameterOp::RemovePattern { pattern: word(r)?, side: PatternSide::Suffix, greedy: false }
        } else if let Some(r) = rest.strip_prefix('/') {
            let (all, anchor, r) = if let Some(r2) = r.strip_prefix('/') {
                (true, None, r2)
            } else if let Some(r2) = r.strip_prefix('#') {
                (false, Some(ReplaceAnchor::Start), r2)
            } else if let Some(r2) = r.strip_prefix('%') {
                (false, Some(ReplaceAnchor::End), r2)
            } else {
                (false, None, r)
            };
            let (pattern, replacement) = split_replacement(r);
            ParameterOp::Replace {
                pattern: word(&pattern)?,
                replacement: match replacement {
                    Some(rep) => Some(word(&rep)?),
                    None => None,
                },
                all,
                anchor,
            }
        } else if rest == "^^" || rest == "^" || rest == ",," || rest == "," {
            ParameterOp::CaseModify {
                upper: rest.starts_with('^'),
                all: rest.len() == 2,
            }
        } else {
            return Err(bad());
        };
        param.op = Some(op);
        Ok(param)
    }
}

/// Split `pat/rep` on the first unescaped, unquoted `/`
fn split_replacement(text: &str) -> (String, Option<String>) {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\'' | '"' => {
                let q = chars[i];
                i += 1;
                while i < chars.len() && chars[i] != q {
                    i += 1;
                }
            }
            '/' => {
                return (
                    chars[..i].iter().collect(),
                    Some(chars[i + 1..].iter().collect()),
                )
            }
            _ => {}
        }
        i += 1;
    }
    (text.to_string(), None)
}

/// Literal text of a word with quotes removed, when it has no expansions
pub fn static_word_text(word: &WordNode) -> Option<String> {
    let mut out = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal(s) | WordPart::SingleQuoted(s) | WordPart::Escaped(s) => out.push_str(s),
            WordPart::DoubleQuoted(inner) => out.push_str(&static_word_text(&WordNode { parts: inner.clone() })?),
            _ => return None,
        }
    }
    Some(out)
}

/// Whether `name` could be a function or variable name
pub fn is_identifier(name: &str) -> bool {
    is_valid_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_quotes() {
        let w = parse_word("a'b c'\"$x\"").unwrap();
        assert_eq!(w.parts.len(), 3);
        assert_eq!(w.parts[0], WordPart::Literal("a".into()));
        assert_eq!(w.parts[1], WordPart::SingleQuoted("b c".into()));
        match &w.parts[2] {
            WordPart::DoubleQuoted(inner) => {
                assert_eq!(inner[0], WordPart::Parameter(ParameterExpansion::simple("x")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parameter_operations() {
        let w = parse_word("${X:-default}").unwrap();
        match &w.parts[0] {
            WordPart::Parameter(p) => {
                assert_eq!(p.name, "X");
                assert!(matches!(p.op, Some(ParameterOp::DefaultValue { check_empty: true, .. })));
            }
            other => panic!("unexpected {:?}", other),
        }
        let w = parse_word("${path##*/}").unwrap();
        assert!(matches!(
            &w.parts[0],
            WordPart::Parameter(ParameterExpansion { op: Some(ParameterOp::RemovePattern { greedy: true, side: PatternSide::Prefix, .. }), .. })
        ));
        let w = parse_word("${#name}").unwrap();
        assert!(matches!(&w.parts[0], WordPart::Parameter(ParameterExpansion { op: Some(ParameterOp::Length), .. })));
        let w = parse_word("${s//a/b}").unwrap();
        assert!(matches!(&w.parts[0], WordPart::Parameter(ParameterExpansion { op: Some(ParameterOp::Replace { all: true, .. }), .. })));
        let w = parse_word("${v^^}").unwrap();
        assert!(matches!(&w.parts[0], WordPart::Parameter(ParameterExpansion { op: Some(ParameterOp::CaseModify { upper: true, all: true }), .. })));
    }

    #[test]
    fn test_positional_count_is_not_length() {
        let w = parse_word("${#}").unwrap();
        match &w.parts[0] {
            WordPart::Parameter(p) => {
                assert_eq!(p.name, "#");
                assert!(p.op.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_and_command_substitution() {
        let w = parse_word("$((2+3))").unwrap();
        assert_eq!(w.parts[0], WordPart::Arithmetic("2+3".into()));
        let w = parse_word("$(echo hi)").unwrap();
        assert!(matches!(&w.parts[0], WordPart::CommandSubstitution(c) if !c.backtick));
        let w = parse_word("`echo hi`").unwrap();
        assert!(matches!(&w.parts[0], WordPart::CommandSubstitution(c) if c.backtick));
    }

    #[test]
    fn test_brace_expansion() {
        let w = parse_word("{a,b}").unwrap();
        assert!(matches!(&w.parts[0], WordPart::Brace(items) if items.len() == 2));
        let w = parse_word("{1..3}").unwrap();
        assert!(matches!(&w.parts[0], WordPart::Brace(items) if matches!(items[0], BraceItem::NumberRange { start: 1, end: 3, .. })));
        let w = parse_word("{abc}").unwrap();
        assert_eq!(w.parts, vec![WordPart::Literal("{abc}".into())]);
    }

    #[test]
    fn test_tilde() {
        let w = parse_word("~/src").unwrap();
        assert_eq!(w.parts[0], WordPart::Tilde(None));
        let w = parse_assignment_value("~/a:~/b").unwrap();
        assert_eq!(w.parts.iter().filter(|p| matches!(p, WordPart::Tilde(_))).count(), 2);
        let w = parse_word("a~b").unwrap();
        assert_eq!(w.parts, vec![WordPart::Literal("a~b".into())]);
    }

    #[test]
    fn test_heredoc_keeps_double_quotes() {
        let w = parse_heredoc_content("say \"$x\"\n").unwrap();
        match &w.parts[0] {
            WordPart::DoubleQuoted(inner) => {
                assert_eq!(inner[0], WordPart::Literal("say \"".into()));
                assert_eq!(inner[1], WordPart::Parameter(ParameterExpansion::simple("x")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_substitution() {
        assert!(parse_word("${}").is_err());
        assert!(parse_word("${x").is_err());
    }
}
