//! Parameter Operations
//!
//! The value transformations behind `${name op ...}` once the parameter
//! value and any pattern words have been expanded:
//! - `#` `##` `%` `%%` pattern removal
//! - `/` `//` `/#` `/%` replacement
//! - `^` `^^` `,` `,,` case modification
//! - `:offset:length` substrings and array slices

use crate::ast::types::{PatternSide, ReplaceAnchor};
use crate::interpreter::expansion::pattern::CompiledPattern;

/// Char-boundary byte offsets of `s`, including `s.len()`
fn boundaries(s: &str) -> Vec<usize> {
    s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len())).collect()
}

/// `${v#p}` / `${v##p}` / `${v%p}` / `${v%%p}`
pub fn remove_pattern(value: &str, pattern: &CompiledPattern, side: PatternSide, greedy: bool) -> String {
    let bounds = boundaries(value);
    match side {
        PatternSide::Prefix => {
            let candidates: Box<dyn Iterator<Item = &usize>> =
                if greedy { Box::new(bounds.iter().rev()) } else { Box::new(bounds.iter()) };
            for &end in candidates {
                if pattern.matches(&value[..end]) {
                    return value[end..].to_string();
                }
            }
        }
        PatternSide::Suffix => {
            let candidates: Box<dyn Iterator<Item = &usize>> =
                if greedy { Box::new(bounds.iter()) } else { Box::new(bounds.iter().rev()) };
            for &start in candidates {
                if pattern.matches(&value[start..]) {
                    return value[..start].to_string();
                }
            }
        }
    }
    value.to_string()
}

/// Longest match starting at byte `start`, as an end offset
fn longest_match_at(value: &str, bounds: &[usize], start: usize, pattern: &CompiledPattern) -> Option<usize> {
    bounds
        .iter()
        .rev()
        .filter(|&&end| end >= start)
        .find(|&&end| pattern.matches(&value[start..end]))
        .copied()
}

/// `${v/p/r}` and its `//`, `/#`, `/%` forms. Matching is longest-first;
/// an empty match replaces nothing.
pub fn replace_pattern(
    value: &str,
    pattern: &CompiledPattern,
    replacement: &str,
    all: bool,
    anchor: Option<ReplaceAnchor>,
) -> String {
    let bounds = boundaries(value);
    match anchor {
        Some(ReplaceAnchor::Start) => match longest_match_at(value, &bounds, 0, pattern) {
            Some(end) => format!("{}{}", replacement, &value[end..]),
            None => value.to_string(),
        },
        Some(ReplaceAnchor::End) => {
            for &start in &bounds {
                if pattern.matches(&value[start..]) {
                    return format!("{}{}", &value[..start], replacement);
                }
            }
            value.to_string()
        }
        None => {
            let mut out = String::new();
            let mut idx = 0;
            let mut pos = 0;
            while idx < bounds.len() - 1 {
                let start = bounds[idx];
                match longest_match_at(value, &bounds, start, pattern) {
                    Some(end) if end > start => {
                        out.push_str(&value[pos..start]);
                        out.push_str(replacement);
                        pos = end;
                        if !all {
                            break;
                        }
                        idx = bounds.iter().position(|&b| b == end).unwrap_or(bounds.len() - 1);
                    }
                    _ => idx += 1,
                }
            }
            out.push_str(&value[pos..]);
            out
        }
    }
}

/// `${v^}` `${v^^}` `${v,}` `${v,,}`
pub fn case_modify(value: &str, upper: bool, all: bool) -> String {
    let convert = |c: char| -> String {
        if upper {
            c.to_uppercase().collect()
        } else {
            c.to_lowercase().collect()
        }
    };
    if all {
        return value.chars().map(convert).collect();
    }
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => format!("{}{}", convert(first), chars.as_str()),
        None => String::new(),
    }
}

/// Resolve offset/length against a sequence of `len` items. A negative
/// offset counts from the end; a negative length is an end offset.
/// Returns None when the offset is out of range.
pub fn slice_bounds(len: usize, offset: i64, length: Option<i64>) -> Option<(usize, usize)> {
    let len_i = len as i64;
    let start = if offset < 0 { len_i + offset } else { offset };
    if start < 0 || start > len_i {
        return None;
    }
    let end = match length {
        None => len_i,
        Some(l) if l < 0 => len_i + l,
        Some(l) => (start + l).min(len_i),
    };
    if end < start {
        return Some((start as usize, start as usize));
    }
    Some((start as usize, end as usize))
}

/// `${v:offset:length}`
pub fn substring(value: &str, offset: i64, length: Option<i64>) -> String {
    let chars: Vec<char> = value.chars().collect();
    match slice_bounds(chars.len(), offset, length) {
        Some((s, e)) => chars[s..e].iter().collect(),
        None => String::new(),
    }
}

/// `${a[@]:offset:length}`
pub fn slice_values(values: &[String], offset: i64, length: Option<i64>) -> Vec<String> {
    match slice_bounds(values.len(), offset, length) {
        Some((s, e)) => values[s..e].to_vec(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::expansion::pattern::PatternOptions;

    fn pat(p: &str) -> CompiledPattern {
        CompiledPattern::compile(p, PatternOptions::default()).unwrap()
    }

    #[test]
    fn test_removal() {
        let v = "dir/sub/file.tar.gz";
        assert_eq!(remove_pattern(v, &pat("*/"), PatternSide::Prefix, false), "sub/file.tar.gz");
        assert_eq!(remove_pattern(v, &pat("*/"), PatternSide::Prefix, true), "file.tar.gz");
        assert_eq!(remove_pattern(v, &pat(".*"), PatternSide::Suffix, false), "dir/sub/file.tar");
        assert_eq!(remove_pattern(v, &pat(".*"), PatternSide::Suffix, true), "dir/sub/file");
        assert_eq!(remove_pattern(v, &pat("nomatch"), PatternSide::Prefix, true), v);
    }

    #[test]
    fn test_replace() {
        assert_eq!(replace_pattern("hello world", &pat("o"), "0", false, None), "hell0 world");
        assert_eq!(replace_pattern("hello world", &pat("o"), "0", true, None), "hell0 w0rld");
        assert_eq!(replace_pattern("aaa", &pat("a"), "b", false, Some(ReplaceAnchor::Start)), "baa");
        assert_eq!(replace_pattern("aaa", &pat("a"), "b", false, Some(ReplaceAnchor::End)), "aab");
        assert_eq!(replace_pattern("a.b.c", &pat("."), "", true, None), "abc");
        assert_eq!(replace_pattern("abc", &pat("x*"), "-", true, None), "abc");
    }

    #[test]
    fn test_case_modify() {
        assert_eq!(case_modify("hello", true, false), "Hello");
        assert_eq!(case_modify("hello", true, true), "HELLO");
        assert_eq!(case_modify("HELLO", false, false), "hELLO");
        assert_eq!(case_modify("", true, true), "");
    }

    #[test]
    fn test_substring() {
        assert_eq!(substring("abcdef", 2, None), "cdef");
        assert_eq!(substring("abcdef", 1, Some(3)), "bcd");
        assert_eq!(substring("abcdef", -2, None), "ef");
        assert_eq!(substring("abcdef", 1, Some(-1)), "bcde");
        assert_eq!(substring("abc", 10, None), "");
        let values: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(slice_values(&values, 1, Some(1)), vec!["b"]);
    }
}
