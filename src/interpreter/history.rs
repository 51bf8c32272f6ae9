//! Command History
//!
//! In-memory history list shared by a shell and its subshells. Entries are
//! numbered from 1 and timestamped; the list is trimmed to `HISTSIZE`.

use chrono::{DateTime, Local};

pub const DEFAULT_HISTSIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub number: usize,
    pub command: String,
    pub exit_code: Option<i32>,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    next_number: usize,
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTSIZE)
    }
}

/// Flags from the option table that shape what gets recorded
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryPolicy {
    pub ignore_dups: bool,
    pub ignore_space: bool,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            next_number: 1,
            max_size,
        }
    }

    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.trim();
    }

    /// Record a command. Returns false when the policy suppressed it.
    pub fn add(&mut self, command: &str, exit_code: Option<i32>, policy: HistoryPolicy) -> bool {
        let trimmed = command.trim_end_matches('\n');
        if trimmed.trim().is_empty() {
            return false;
        }
        if policy.ignore_space && trimmed.starts_with(' ') {
            return false;
        }
        if policy.ignore_dups && self.entries.last().map_or(false, |e| e.command == trimmed) {
            return false;
        }
        self.entries.push(HistoryEntry {
            number: self.next_number,
            command: trimmed.to_string(),
            exit_code,
            timestamp: Local::now(),
        });
        self.next_number += 1;
        self.trim();
        true
    }

    fn trim(&mut self) {
        if self.entries.len() > self.max_size {
            let excess = self.entries.len() - self.max_size;
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The most recent `n` entries
    pub fn last(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `history` listing format: right-aligned number, two spaces, command
pub fn format_entries(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        out.push_str(&format!("{:>5}  {}\n", e.number, e.command));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbering_and_trim() {
        let mut h = History::new(2);
        h.add("a", Some(0), HistoryPolicy::default());
        h.add("b", Some(0), HistoryPolicy::default());
        h.add("c", Some(1), HistoryPolicy::default());
        let numbers: Vec<usize> = h.entries().iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![2, 3]);
        assert_eq!(h.entries()[1].exit_code, Some(1));
    }

    #[test]
    fn test_policies() {
        let mut h = History::default();
        let policy = HistoryPolicy {
            ignore_dups: true,
            ignore_space: true,
        };
        assert!(h.add("ls", None, policy));
        assert!(!h.add("ls", None, policy));
        assert!(!h.add(" secret", None, policy));
        assert!(h.add("pwd", None, policy));
        assert!(h.add("ls", None, policy));
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn test_format_and_last() {
        let mut h = History::default();
        h.add("echo one", None, HistoryPolicy::default());
        h.add("echo two", None, HistoryPolicy::default());
        assert_eq!(format_entries(h.last(1)), "    2  echo two\n");
    }
}
