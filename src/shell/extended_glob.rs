//! Glob Qualifiers
//!
//! The trailing `(...)` filters of `EXTENDED_GLOB` filename patterns:
//! - `.` plain files, `/` directories, `@` symlinks, `*` executables
//! - `L[unit][+-]n` size (`k`, `m`, `g` units; `+` more, `-` less)
//! - `m[+-]n` modification age in days
//! - `r`, `w`, `x` owner permissions
//! - `^` negates the qualifiers after it
//!
//! Qualifiers filter the matches after the directory walk.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    Equal,
    Greater,
}

impl Comparison {
    fn check(&self, actual: u64, wanted: u64) -> bool {
        match self {
            Comparison::Less => actual < wanted,
            Comparison::Equal => actual == wanted,
            Comparison::Greater => actual > wanted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    PlainFile,
    Directory,
    Symlink,
    Executable,
    /// Size compared in `unit`-byte blocks, rounded up
    Size { cmp: Comparison, amount: u64, unit: u64 },
    /// Whole days since last modification
    ModifiedDays { cmp: Comparison, days: u64 },
    OwnerRead,
    OwnerWrite,
    OwnerExec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualifierSet {
    items: Vec<(Qualifier, bool)>,
}

fn unit_size(c: char) -> Option<u64> {
    match c.to_ascii_lowercase() {
        'k' => Some(1024),
        'm' => Some(1024 * 1024),
        'g' => Some(1024 * 1024 * 1024),
        'p' => Some(512),
        _ => None,
    }
}

fn parse_comparison(chars: &[char], i: &mut usize) -> Comparison {
    match chars.get(*i) {
        Some('+') => {
            *i += 1;
            Comparison::Greater
        }
        Some('-') => {
            *i += 1;
            Comparison::Less
        }
        _ => Comparison::Equal,
    }
}

fn parse_number(chars: &[char], i: &mut usize) -> Option<u64> {
    let start = *i;
    while *i < chars.len() && chars[*i].is_ascii_digit() {
        *i += 1;
    }
    chars[start..*i].iter().collect::<String>().parse().ok()
}

/// Parse the text between the parentheses. None when any character is
/// not a qualifier, so `(a|b)`-style groups are left to the matcher.
pub fn parse_qualifiers(text: &str) -> Option<QualifierSet> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return None;
    }
    let mut items = Vec::new();
    let mut negated = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        let q = match c {
            '^' => {
                negated = !negated;
                continue;
            }
            '.' => Qualifier::PlainFile,
            '/' => Qualifier::Directory,
            '@' => Qualifier::Symlink,
            '*' => Qualifier::Executable,
            'r' => Qualifier::OwnerRead,
            'w' => Qualifier::OwnerWrite,
            'x' => Qualifier::OwnerExec,
            'L' => {
                let mut unit = chars.get(i).and_then(|&u| unit_size(u));
                if unit.is_some() {
                    i += 1;
                }
                let cmp = parse_comparison(&chars, &mut i);
                let amount = parse_number(&chars, &mut i)?;
                if unit.is_none() {
                    unit = chars.get(i).and_then(|&u| unit_size(u));
                    if unit.is_some() {
                        i += 1;
                    }
                }
                Qualifier::Size {
                    cmp,
                    amount,
                    unit: unit.unwrap_or(1),
                }
            }
            'm' => {
                // `d` is the default unit and may be spelled out
                if chars.get(i) == Some(&'d') {
                    i += 1;
                }
                let cmp = parse_comparison(&chars, &mut i);
                let days = parse_number(&chars, &mut i)?;
                Qualifier::ModifiedDays { cmp, days }
            }
            _ => return None,
        };
        items.push((q, negated));
    }
    Some(QualifierSet { items })
}

/// Split a trailing qualifier group off a pattern
pub fn split_qualifiers(pattern: &str) -> (String, Option<QualifierSet>) {
    if !pattern.ends_with(')') || pattern.ends_with("\\)") {
        return (pattern.to_string(), None);
    }
    let Some(open) = pattern.rfind('(') else {
        return (pattern.to_string(), None);
    };
    if open > 0 && pattern[..open].ends_with('\\') {
        return (pattern.to_string(), None);
    }
    let inner = &pattern[open + 1..pattern.len() - 1];
    match parse_qualifiers(inner) {
        Some(set) => (pattern[..open].to_string(), Some(set)),
        None => (pattern.to_string(), None),
    }
}

fn check(q: &Qualifier, path: &Path) -> bool {
    let Ok(link_meta) = std::fs::symlink_metadata(path) else {
        return false;
    };
    let mode = link_meta.permissions().mode();
    match q {
        Qualifier::PlainFile => link_meta.is_file(),
        Qualifier::Directory => link_meta.is_dir(),
        Qualifier::Symlink => link_meta.file_type().is_symlink(),
        Qualifier::Executable => link_meta.is_file() && mode & 0o111 != 0,
        Qualifier::OwnerRead => mode & 0o400 != 0,
        Qualifier::OwnerWrite => mode & 0o200 != 0,
        Qualifier::OwnerExec => mode & 0o100 != 0,
        Qualifier::Size { cmp, amount, unit } => {
            let blocks = link_meta.len().div_ceil(*unit);
            cmp.check(blocks, *amount)
        }
        Qualifier::ModifiedDays { cmp, days } => {
            let age = link_meta
                .modified()
                .ok()
                .and_then(|m| SystemTime::now().duration_since(m).ok())
                .map_or(0, |d| d.as_secs() / 86_400);
            cmp.check(age, *days)
        }
    }
}

impl QualifierSet {
    /// All qualifiers must hold
    pub fn accepts(&self, path: &Path) -> bool {
        self.items.iter().all(|(q, negated)| check(q, path) != *negated)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let set = parse_qualifiers("./").unwrap();
        assert_eq!(set.items.len(), 2);
        let set = parse_qualifiers("Lk+2").unwrap();
        assert_eq!(
            set.items[0].0,
            Qualifier::Size { cmp: Comparison::Greater, amount: 2, unit: 1024 }
        );
        let set = parse_qualifiers("L-100").unwrap();
        assert_eq!(set.items[0].0, Qualifier::Size { cmp: Comparison::Less, amount: 100, unit: 1 });
        let set = parse_qualifiers("^/").unwrap();
        assert!(set.items[0].1);
        assert!(parse_qualifiers("a|b").is_none());
    }

    #[test]
    fn test_split() {
        let (p, q) = split_qualifiers("*.rs(.)");
        assert_eq!(p, "*.rs");
        assert!(q.is_some());
        let (p, q) = split_qualifiers("(foo|bar)");
        assert_eq!(p, "(foo|bar)");
        assert!(q.is_none());
    }

    #[test]
    fn test_filters() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, vec![b'x'; 2000]).unwrap();
        let sub = dir.path().join("d");
        std::fs::create_dir(&sub).unwrap();
        assert!(parse_qualifiers(".").unwrap().accepts(&file));
        assert!(!parse_qualifiers(".").unwrap().accepts(&sub));
        assert!(parse_qualifiers("/").unwrap().accepts(&sub));
        assert!(parse_qualifiers("^/").unwrap().accepts(&file));
        assert!(parse_qualifiers("L+1000").unwrap().accepts(&file));
        assert!(parse_qualifiers("Lk-3").unwrap().accepts(&file));
        assert!(!parse_qualifiers("L-1000").unwrap().accepts(&file));
        assert!(parse_qualifiers("m-1").unwrap().accepts(&file));
    }
}
