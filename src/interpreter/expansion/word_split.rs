//! Field Splitting
//!
//! Assembles the fields of one word from its expanded pieces. Quoted text
//! is appended as-is; unquoted expansion results are split on `$IFS`:
//! - IFS whitespace collapses and is trimmed at the edges
//! - each non-whitespace IFS character ends a field, so `a,,b` gives an
//!   empty middle field
//! - a trailing delimiter does not create an empty last field
//!
//! Each field also carries a pattern form of its text where characters
//! that must match literally are backslash-escaped, for globbing.

use crate::interpreter::expansion::pattern::escape_pattern;

/// One finished field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    pub text: String,
    pub pattern: String,
    /// Contains a glob operator that came from unquoted text
    pub has_glob: bool,
}

#[derive(Debug, Default)]
pub struct FieldBuilder {
    fields: Vec<Field>,
    current: Field,
    /// The current field exists even if empty (quotes were seen)
    forced: bool,
    /// IFS whitespace seen; the next content starts a new field
    pending_break: bool,
}

impl FieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn has_content(&self) -> bool {
        !self.current.text.is_empty() || self.forced
    }

    fn flush_pending(&mut self) {
        if self.pending_break {
            self.pending_break = false;
            self.finish_field();
        }
    }

    /// End the current field if it has anything in it
    fn finish_field(&mut self) {
        if self.has_content() {
            self.fields.push(std::mem::take(&mut self.current));
        }
        self.current = Field::default();
        self.forced = false;
    }

    /// Quoted text: literal, never split
    pub fn push_quoted(&mut self, text: &str) {
        self.flush_pending();
        self.forced = true;
        self.current.text.push_str(text);
        self.current.pattern.push_str(&escape_pattern(text));
    }

    /// Unquoted source text: glob operators stay active
    pub fn push_unquoted_literal(&mut self, text: &str, has_glob: bool) {
        if text.is_empty() {
            return;
        }
        self.flush_pending();
        self.current.text.push_str(text);
        self.current.pattern.push_str(text);
        self.current.has_glob |= has_glob;
    }

    /// Unquoted expansion result. Split on `ifs` when `split` is set;
    /// `glob_active` keeps pattern characters of the result live.
    pub fn push_expansion(&mut self, text: &str, ifs: &str, split: bool, glob_active: bool) {
        if !split || ifs.is_empty() {
            if text.is_empty() {
                return;
            }
            self.flush_pending();
            self.append_expansion_text(text, glob_active);
            return;
        }

        let mut run = String::new();
        for c in text.chars() {
            if !ifs.contains(c) {
                if run.is_empty() {
                    self.flush_pending();
                }
                run.push(c);
                continue;
            }
            if !run.is_empty() {
                self.append_expansion_text(&std::mem::take(&mut run), glob_active);
            }
            if c.is_whitespace() {
                if self.has_content() {
                    self.pending_break = true;
                }
            } else {
                // A non-whitespace delimiter always ends a field, even an empty one
                self.pending_break = false;
                self.forced = true;
                self.finish_field();
            }
        }
        if !run.is_empty() {
            self.append_expansion_text(&run, glob_active);
        }
    }

    fn append_expansion_text(&mut self, text: &str, glob_active: bool) {
        self.current.text.push_str(text);
        if glob_active {
            self.current.pattern.push_str(text);
            self.current.has_glob |= crate::interpreter::expansion::pattern::has_glob_chars(text, false);
        } else {
            self.current.pattern.push_str(&escape_pattern(text));
        }
    }

    /// Force a field boundary (between the elements of `"$@"`)
    pub fn break_field(&mut self) {
        self.pending_break = false;
        self.forced = true;
        self.finish_field();
    }

    /// End the current field without creating an empty one (between the
    /// elements of an unquoted array)
    pub fn end_field(&mut self) {
        self.pending_break = false;
        self.finish_field();
    }

    /// Mark the current field as existing even when empty
    pub fn force(&mut self) {
        self.flush_pending();
        self.forced = true;
    }

    pub fn finish(mut self) -> Vec<Field> {
        self.pending_break = false;
        if self.has_content() {
            self.fields.push(self.current);
        }
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str, ifs: &str) -> Vec<String> {
        let mut b = FieldBuilder::new();
        b.push_expansion(text, ifs, true, false);
        b.finish().into_iter().map(|f| f.text).collect()
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(split("  a  b\tc\n", " \t\n"), vec!["a", "b", "c"]);
        assert!(split("   ", " \t\n").is_empty());
    }

    #[test]
    fn test_non_whitespace_delimiters() {
        assert_eq!(split("a,,b", ","), vec!["a", "", "b"]);
        assert_eq!(split("a , b", " ,"), vec!["a", "b"]);
        assert_eq!(split(",b", ","), vec!["", "b"]);
        assert_eq!(split("a,", ","), vec!["a"]);
    }

    #[test]
    fn test_adjacent_parts_join() {
        let mut b = FieldBuilder::new();
        b.push_unquoted_literal("pre", false);
        b.push_expansion("x y", " ", true, false);
        b.push_quoted("post");
        let fields: Vec<String> = b.finish().into_iter().map(|f| f.text).collect();
        assert_eq!(fields, vec!["prex", "ypost"]);
    }

    #[test]
    fn test_trailing_space_then_quoted() {
        let mut b = FieldBuilder::new();
        b.push_expansion("a ", " ", true, false);
        b.push_quoted("b");
        let fields: Vec<String> = b.finish().into_iter().map(|f| f.text).collect();
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_quoted_field_survives() {
        let mut b = FieldBuilder::new();
        b.push_quoted("");
        assert_eq!(b.finish().len(), 1);
        let mut b = FieldBuilder::new();
        b.push_expansion("", " ", true, false);
        assert!(b.finish().is_empty());
    }

    #[test]
    fn test_pattern_escaping() {
        let mut b = FieldBuilder::new();
        b.push_quoted("*");
        b.push_unquoted_literal("*.rs", true);
        let f = &b.finish()[0];
        assert_eq!(f.pattern, "\\**.rs");
        assert!(f.has_glob);
    }
}
