//! GlobExpander: Filename Generation
//!
//! Walks the real filesystem segment by segment, matching each path
//! component with the shared pattern compiler.
//! - dotfiles only match when the segment starts with `.` or `GLOB_DOTS`
//! - `**/` descends through any number of directories
//! - with `EXTENDED_GLOB`, `pat~excl` drops whole-path matches and a
//!   trailing `(...)` group filters results by qualifiers
//!
//! Results are sorted. An empty result is reported to the caller, which
//! applies `NULL_GLOB`/`NO_MATCH`.

use std::path::{Path, PathBuf};

use crate::interpreter::expansion::pattern::{
    find_top_level, has_glob_chars, unescape_pattern, CompiledPattern, PatternOptions,
};
use crate::interpreter::types::ShellContext;
use crate::shell::extended_glob::{split_qualifiers, QualifierSet};

/// Options controlling glob expansion behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobOptions {
    pub dotglob: bool,
    pub extended: bool,
    pub case_sensitive: bool,
}

impl Default for GlobOptions {
    fn default() -> Self {
        Self {
            dotglob: false,
            extended: false,
            case_sensitive: true,
        }
    }
}

impl GlobOptions {
    pub fn from_context(ctx: &ShellContext) -> Self {
        Self {
            dotglob: ctx.zsh_opt("GLOB_DOTS"),
            extended: ctx.zsh_opt("EXTENDED_GLOB"),
            case_sensitive: ctx.zsh_opt("CASE_GLOB"),
        }
    }

    fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            extended: self.extended,
            case_insensitive: !self.case_sensitive,
        }
    }
}

pub struct GlobExpander {
    cwd: PathBuf,
    options: GlobOptions,
}

impl GlobExpander {
    pub fn new(cwd: impl Into<PathBuf>, options: GlobOptions) -> Self {
        Self {
            cwd: cwd.into(),
            options,
        }
    }

    pub fn from_context(ctx: &ShellContext) -> Self {
        Self::new(ctx.cwd.clone(), GlobOptions::from_context(ctx))
    }

    /// Check if a string contains glob operators.
    pub fn is_glob_pattern(&self, s: &str) -> bool {
        has_glob_chars(s, self.options.extended)
    }

    /// Expand a pattern (backslash escapes mark literal characters) into
    /// sorted matching paths.
    pub fn expand(&self, pattern: &str) -> Vec<String> {
        let mut pattern = pattern.to_string();
        let mut qualifiers: Option<QualifierSet> = None;
        let mut exclusion: Option<CompiledPattern> = None;

        if self.options.extended {
            let (rest, quals) = split_qualifiers(&pattern);
            pattern = rest;
            qualifiers = quals;

            let chars: Vec<char> = pattern.chars().collect();
            if let Some(pos) = find_top_level(&chars, '~').filter(|&p| p > 0) {
                let excl: String = chars[pos + 1..].iter().collect();
                exclusion = CompiledPattern::compile(&excl, self.options.pattern_options()).ok();
                pattern = chars[..pos].iter().collect();
            }
        }

        let absolute = pattern.starts_with('/');
        let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let start = if absolute { "/".to_string() } else { String::new() };

        let mut results = Vec::new();
        self.expand_segments(&start, &segments, &mut results);

        if let Some(excl) = &exclusion {
            results.retain(|r| !excl.matches(r));
        }
        if let Some(quals) = &qualifiers {
            results.retain(|r| quals.accepts(&self.resolve(r)));
        }
        if pattern.ends_with('/') {
            results = results.into_iter().map(|r| format!("{}/", r)).collect();
        }
        results.sort();
        results.dedup();
        results
    }

    fn resolve(&self, display: &str) -> PathBuf {
        let p = Path::new(display);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.join(p)
        }
    }

    fn join(base: &str, name: &str) -> String {
        if base.is_empty() {
            name.to_string()
        } else if base.ends_with('/') {
            format!("{}{}", base, name)
        } else {
            format!("{}/{}", base, name)
        }
    }

    fn expand_segments(&self, base: &str, segments: &[&str], out: &mut Vec<String>) {
        let Some((segment, rest)) = segments.split_first() else {
            if !base.is_empty() {
                out.push(base.to_string());
            }
            return;
        };

        if *segment == "**" && !rest.is_empty() {
            self.expand_recursive(base, rest, out);
            return;
        }

        if !self.is_glob_pattern(segment) {
            let path = Self::join(base, &unescape_pattern(segment));
            let resolved = self.resolve(&path);
            let exists = if rest.is_empty() { resolved.symlink_metadata().is_ok() } else { resolved.is_dir() };
            if exists {
                self.expand_segments(&path, rest, out);
            }
            return;
        }

        let Ok(compiled) = CompiledPattern::compile(segment, self.options.pattern_options()) else {
            return;
        };
        let allow_dots = self.options.dotglob || segment.starts_with('.') || segment.starts_with("\\.");
        for name in self.list_dir(base) {
            if name.starts_with('.') && !allow_dots {
                continue;
            }
            if !compiled.matches(&name) {
                continue;
            }
            let path = Self::join(base, &name);
            if rest.is_empty() || self.resolve(&path).is_dir() {
                self.expand_segments(&path, rest, out);
            }
        }
    }

    /// `**/rest`: try `rest` here and under every non-hidden subdirectory
    fn expand_recursive(&self, base: &str, rest: &[&str], out: &mut Vec<String>) {
        self.expand_segments(base, rest, out);
        for name in self.list_dir(base) {
            if name.starts_with('.') && !self.options.dotglob {
                continue;
            }
            let path = Self::join(base, &name);
            let resolved = self.resolve(&path);
            let is_real_dir = resolved
                .symlink_metadata()
                .map(|m| m.file_type().is_dir())
                .unwrap_or(false);
            if is_real_dir {
                self.expand_recursive(&path, rest, out);
            }
        }
    }

    fn list_dir(&self, base: &str) -> Vec<String> {
        let dir = if base.is_empty() { self.cwd.clone() } else { self.resolve(base) };
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for f in ["a.txt", "b.txt", "c.rs", ".hidden.txt", "file1", "file2", "file10"] {
            std::fs::write(root.join(f), "x").unwrap();
        }
        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "x").unwrap();
        std::fs::write(root.join("src/nested/deep.rs"), "x").unwrap();
        dir
    }

    fn expander(dir: &tempfile::TempDir, options: GlobOptions) -> GlobExpander {
        GlobExpander::new(dir.path(), options)
    }

    #[test]
    fn test_simple_star() {
        let dir = fixture();
        let g = expander(&dir, GlobOptions::default());
        assert_eq!(g.expand("*.txt"), vec!["a.txt", "b.txt"]);
        assert!(g.expand("*.none").is_empty());
    }

    #[test]
    fn test_dotfiles() {
        let dir = fixture();
        let g = expander(&dir, GlobOptions::default());
        assert_eq!(g.expand(".*.txt"), vec![".hidden.txt"]);
        let g = expander(&dir, GlobOptions { dotglob: true, ..Default::default() });
        assert_eq!(g.expand("*.txt"), vec![".hidden.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_directories_and_recursion() {
        let dir = fixture();
        let g = expander(&dir, GlobOptions::default());
        assert_eq!(g.expand("src/*.rs"), vec!["src/lib.rs"]);
        assert_eq!(g.expand("**/*.rs"), vec!["c.rs", "src/lib.rs", "src/nested/deep.rs"]);
    }

    #[test]
    fn test_numeric_ranges_and_escapes() {
        let dir = fixture();
        let g = expander(&dir, GlobOptions::default());
        assert_eq!(g.expand("file<1-2>"), vec!["file1", "file2"]);
        assert_eq!(g.expand("file<->"), vec!["file1", "file10", "file2"]);
        assert!(g.expand("\\*.txt").is_empty());
    }

    #[test]
    fn test_extended_exclusion_and_qualifiers() {
        let dir = fixture();
        let g = expander(&dir, GlobOptions { extended: true, ..Default::default() });
        assert_eq!(g.expand("*.txt~a*"), vec!["b.txt"]);
        assert_eq!(g.expand("^*.txt"), vec!["c.rs", "file1", "file10", "file2", "src"]);
        assert_eq!(g.expand("*(/)"), vec!["src"]);
        assert_eq!(g.expand("s*(.)"), Vec::<String>::new());
    }

    #[test]
    fn test_absolute_pattern() {
        let dir = fixture();
        let g = GlobExpander::new("/", GlobOptions::default());
        let pattern = format!("{}/*.rs", dir.path().display());
        assert_eq!(g.expand(&pattern), vec![format!("{}/c.rs", dir.path().display())]);
    }
}
