//! Brace Expansion
//!
//! Expands `Brace` word parts into one word per alternative: `{a,b}`,
//! numeric `{1..10}` / `{1..10..2}` / `{01..10}` and character `{a..e}`
//! ranges, nested braces included. Runs before every other expansion.

use crate::ast::types::{BraceItem, WordNode, WordPart};

/// Maximum words one brace expression may produce
const MAX_BRACE_RESULTS: usize = 100_000;

/// Values of a numeric range. A zero step counts as 1; the sign of the step
/// is ignored and the natural direction is used.
pub fn expand_numeric_range(start: i64, end: i64, step: Option<i64>, width: usize) -> Vec<String> {
    let step = step.unwrap_or(1).unsigned_abs().max(1);
    let count = (start.abs_diff(end) / step) as usize + 1;
    let mut out = Vec::with_capacity(count.min(MAX_BRACE_RESULTS));
    let mut value = start as i128;
    for _ in 0..count.min(MAX_BRACE_RESULTS) {
        out.push(pad_number(value as i64, width));
        if start <= end {
            value += step as i128;
        } else {
            value -= step as i128;
        }
    }
    out
}

fn pad_number(n: i64, width: usize) -> String {
    if width == 0 {
        return n.to_string();
    }
    if n < 0 {
        format!("-{:0>w$}", n.unsigned_abs(), w = width.saturating_sub(1))
    } else {
        format!("{:0>w$}", n, w = width)
    }
}

/// Characters of a range like `{a..e}` or `{z..a..2}`
pub fn expand_char_range(start: char, end: char, step: Option<i64>) -> Vec<String> {
    let step = step.unwrap_or(1).unsigned_abs().max(1) as u32;
    let (s, e) = (start as u32, end as u32);
    let mut out = Vec::new();
    let mut v = s;
    loop {
        if let Some(c) = char::from_u32(v) {
            out.push(c.to_string());
        }
        if s <= e {
            match v.checked_add(step) {
                Some(n) if n <= e => v = n,
                _ => break,
            }
        } else {
            match v.checked_sub(step) {
                Some(n) if n >= e => v = n,
                _ => break,
            }
        }
    }
    out
}

fn item_words(item: &BraceItem) -> Vec<WordNode> {
    match item {
        BraceItem::Word(w) => expand_braces(w),
        BraceItem::NumberRange { start, end, step, width } => expand_numeric_range(*start, *end, *step, *width)
            .into_iter()
            .map(|s| WordNode {
                parts: vec![WordPart::Literal(s)],
            })
            .collect(),
        BraceItem::CharRange { start, end, step } => expand_char_range(*start, *end, *step)
            .into_iter()
            .map(|s| WordNode {
                parts: vec![WordPart::Literal(s)],
            })
            .collect(),
    }
}

/// Expand every brace part of a word, left to right
pub fn expand_braces(word: &WordNode) -> Vec<WordNode> {
    let Some(idx) = word.parts.iter().position(|p| matches!(p, WordPart::Brace(_))) else {
        return vec![word.clone()];
    };
    let WordPart::Brace(items) = &word.parts[idx] else {
        return vec![word.clone()];
    };

    let prefix = &word.parts[..idx];
    let suffix = WordNode {
        parts: word.parts[idx + 1..].to_vec(),
    };
    let suffixes = expand_braces(&suffix);

    let mut out = Vec::new();
    for item in items {
        for middle in item_words(item) {
            for tail in &suffixes {
                if out.len() >= MAX_BRACE_RESULTS {
                    return out;
                }
                let mut parts = prefix.to_vec();
                parts.extend(middle.parts.iter().cloned());
                parts.extend(tail.parts.iter().cloned());
                out.push(WordNode { parts });
            }
        }
    }
    out
}

pub fn has_braces(word: &WordNode) -> bool {
    word.parts.iter().any(|p| matches!(p, WordPart::Brace(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::word_parser::parse_word;

    fn expand(text: &str) -> Vec<String> {
        let word = parse_word(text).unwrap();
        expand_braces(&word).iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_numeric_ranges() {
        assert_eq!(expand_numeric_range(1, 3, None, 0), vec!["1", "2", "3"]);
        assert_eq!(expand_numeric_range(1, 10, Some(3), 0), vec!["1", "4", "7", "10"]);
        assert_eq!(expand_numeric_range(3, 1, None, 0), vec!["3", "2", "1"]);
        assert_eq!(expand_numeric_range(1, 3, Some(0), 0), vec!["1", "2", "3"]);
        assert_eq!(expand_numeric_range(8, 10, None, 2), vec!["08", "09", "10"]);
        assert_eq!(expand_numeric_range(-1, 1, None, 2), vec!["-1", "00", "01"]);
    }

    #[test]
    fn test_char_ranges() {
        assert_eq!(expand_char_range('a', 'e', Some(2)), vec!["a", "c", "e"]);
        assert_eq!(expand_char_range('c', 'a', None), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_word_expansion() {
        assert_eq!(expand("{a,b}"), vec!["a", "b"]);
        assert_eq!(expand("x{1..3}y"), vec!["x1y", "x2y", "x3y"]);
        assert_eq!(expand("{a,b}{1,2}"), vec!["a1", "a2", "b1", "b2"]);
        assert_eq!(expand("{a,{b,c}}"), vec!["a", "b", "c"]);
        assert_eq!(expand("plain"), vec!["plain"]);
    }
}
