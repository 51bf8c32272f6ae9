//! ZSH Options
//!
//! The `setopt`/`unsetopt` option table. Options are stored under their
//! canonical upper-snake name (`EXTENDED_GLOB`). Lookups ignore case and
//! underscores, resolve a short alias table and accept a `NO` prefix that
//! inverts the option (`NO_UNSET`, `nonomatch`).
//!
//! The POSIX `set -o` flags live in [`ShellOptions`]; the two views are kept
//! in sync through [`ZshOptions::sync_to_posix`] and
//! [`ZshOptions::sync_from_posix`].

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;

use crate::interpreter::types::ShellOptions;

lazy_static! {
    /// Canonical option names and their defaults.
    ///
    /// Defaults follow zsh except where the shell keeps POSIX behaviour:
    /// `SH_WORD_SPLIT` is on and `NO_MATCH` is off.
    static ref OPTION_DEFAULTS: Vec<(&'static str, bool)> = vec![
        // Changing directories
        ("AUTO_CD", false),
        ("AUTO_PUSHD", false),
        ("CDABLE_VARS", false),
        ("CD_SILENT", false),
        ("CHASE_DOTS", false),
        ("CHASE_LINKS", false),
        ("POSIX_CD", false),
        ("PUSHD_IGNORE_DUPS", false),
        ("PUSHD_MINUS", false),
        ("PUSHD_SILENT", false),
        ("PUSHD_TO_HOME", false),
        // Completion
        ("ALWAYS_LAST_PROMPT", true),
        ("ALWAYS_TO_END", false),
        ("AUTO_LIST", true),
        ("AUTO_MENU", true),
        ("AUTO_NAME_DIRS", false),
        ("AUTO_PARAM_KEYS", true),
        ("AUTO_PARAM_SLASH", true),
        ("AUTO_REMOVE_SLASH", true),
        ("COMPLETE_ALIASES", false),
        ("COMPLETE_IN_WORD", false),
        ("GLOB_COMPLETE", false),
        ("HASH_LIST_ALL", true),
        ("LIST_AMBIGUOUS", true),
        ("LIST_BEEP", true),
        ("LIST_PACKED", false),
        ("LIST_ROWS_FIRST", false),
        ("LIST_TYPES", true),
        ("MENU_COMPLETE", false),
        ("REC_EXACT", false),
        // Expansion and globbing
        ("BAD_PATTERN", true),
        ("BARE_GLOB_QUAL", true),
        ("BRACE_CCL", false),
        ("CASE_GLOB", true),
        ("CASE_MATCH", true),
        ("CSH_NULL_GLOB", false),
        ("EQUALS", true),
        ("EXTENDED_GLOB", false),
        ("FORCE_FLOAT", false),
        ("GLOB", true),
        ("GLOB_ASSIGN", false),
        ("GLOB_DOTS", false),
        ("GLOB_STAR_SHORT", false),
        ("GLOB_SUBST", false),
        ("HIST_SUBST_PATTERN", false),
        ("IGNORE_BRACES", false),
        ("IGNORE_CLOSE_BRACES", false),
        ("KSH_GLOB", false),
        ("MAGIC_EQUAL_SUBST", false),
        ("MARK_DIRS", false),
        ("MULTIBYTE", true),
        ("NO_MATCH", false),
        ("NULL_GLOB", false),
        ("NUMERIC_GLOB_SORT", false),
        ("RC_EXPAND_PARAM", false),
        ("REMATCH_PCRE", false),
        ("SH_GLOB", false),
        ("UNSET", true),
        ("WARN_CREATE_GLOBAL", false),
        ("WARN_NESTED_VAR", false),
        // History
        ("APPEND_HISTORY", true),
        ("BANG_HIST", true),
        ("EXTENDED_HISTORY", false),
        ("HIST_ALLOW_CLOBBER", false),
        ("HIST_BEEP", true),
        ("HIST_EXPIRE_DUPS_FIRST", false),
        ("HIST_FCNTL_LOCK", false),
        ("HIST_FIND_NO_DUPS", false),
        ("HIST_IGNORE_ALL_DUPS", false),
        ("HIST_IGNORE_DUPS", false),
        ("HIST_IGNORE_SPACE", false),
        ("HIST_LEX_WORDS", false),
        ("HIST_NO_FUNCTIONS", false),
        ("HIST_NO_STORE", false),
        ("HIST_REDUCE_BLANKS", false),
        ("HIST_SAVE_BY_COPY", true),
        ("HIST_SAVE_NO_DUPS", false),
        ("HIST_VERIFY", false),
        ("INC_APPEND_HISTORY", false),
        ("SHARE_HISTORY", false),
        // Initialisation
        ("ALL_EXPORT", false),
        ("GLOBAL_EXPORT", true),
        ("GLOBAL_RCS", true),
        ("RCS", true),
        // Input/output
        ("ALIASES", true),
        ("CLOBBER", true),
        ("CLOBBER_EMPTY", false),
        ("CORRECT", false),
        ("CORRECT_ALL", false),
        ("DVORAK", false),
        ("FLOW_CONTROL", true),
        ("IGNORE_EOF", false),
        ("INTERACTIVE_COMMENTS", true),
        ("HASH_CMDS", true),
        ("HASH_DIRS", true),
        ("HASH_EXECUTABLES_ONLY", false),
        ("MAIL_WARNING", false),
        ("PATH_DIRS", false),
        ("PATH_SCRIPT", false),
        ("PRINT_EIGHT_BIT", false),
        ("PRINT_EXIT_VALUE", false),
        ("RC_QUOTES", false),
        ("RM_STAR_SILENT", false),
        ("RM_STAR_WAIT", false),
        ("SHORT_LOOPS", true),
        ("SUN_KEYBOARD_HACK", false),
        // Job control
        ("AUTO_CONTINUE", false),
        ("AUTO_RESUME", false),
        ("BG_NICE", true),
        ("CHECK_JOBS", true),
        ("CHECK_RUNNING_JOBS", true),
        ("HUP", true),
        ("LONG_LIST_JOBS", false),
        ("MONITOR", false),
        ("NOTIFY", true),
        ("POSIX_JOBS", false),
        // Prompting
        ("PROMPT_BANG", false),
        ("PROMPT_CR", true),
        ("PROMPT_SP", true),
        ("PROMPT_PERCENT", true),
        ("PROMPT_SUBST", false),
        ("TRANSIENT_RPROMPT", false),
        // Scripts and functions
        ("ALIAS_FUNC_DEF", false),
        ("C_BASES", false),
        ("C_PRECEDENCES", false),
        ("DEBUG_BEFORE_CMD", true),
        ("ERR_EXIT", false),
        ("ERR_RETURN", false),
        ("EVAL_LINENO", true),
        ("EXEC", true),
        ("FUNCTION_ARGZERO", true),
        ("LOCAL_LOOPS", false),
        ("LOCAL_OPTIONS", false),
        ("LOCAL_PATTERNS", false),
        ("LOCAL_TRAPS", false),
        ("MULTI_FUNC_DEF", true),
        ("MULTIOS", true),
        ("OCTAL_ZEROES", false),
        ("PIPE_FAIL", false),
        ("SOURCE_TRACE", false),
        ("TYPESET_SILENT", false),
        ("VERBOSE", false),
        ("XTRACE", false),
        // Shell emulation
        ("APPEND_CREATE", false),
        ("BASH_REMATCH", true),
        ("BSD_ECHO", true),
        ("CONTINUE_ON_ERROR", false),
        ("CSH_JUNKIE_HISTORY", false),
        ("CSH_JUNKIE_LOOPS", false),
        ("CSH_JUNKIE_QUOTES", false),
        ("CSH_NULLCMD", false),
        ("KSH_ARRAYS", true),
        ("KSH_AUTOLOAD", false),
        ("KSH_OPTION_PRINT", false),
        ("KSH_TYPESET", false),
        ("KSH_ZERO_SUBSCRIPT", false),
        ("POSIX_ALIASES", false),
        ("POSIX_ARGZERO", false),
        ("POSIX_BUILTINS", false),
        ("POSIX_IDENTIFIERS", false),
        ("POSIX_STRINGS", false),
        ("POSIX_TRAPS", false),
        ("SH_FILE_EXPANSION", false),
        ("SH_NULLCMD", false),
        ("SH_OPTION_LETTERS", false),
        ("SH_WORD_SPLIT", true),
        ("TRAPS_ASYNC", false),
        // Shell state
        ("INTERACTIVE", false),
        ("LOGIN", false),
        ("PRIVILEGED", false),
        ("RESTRICTED", false),
        ("SHIN_STDIN", false),
        ("SINGLE_COMMAND", false),
        // Zle
        ("BEEP", true),
        ("COMBINING_CHARS", false),
        ("EMACS", false),
        ("OVERSTRIKE", false),
        ("SINGLE_LINE_ZLE", false),
        ("VI", false),
        ("ZLE", false),
    ];

    /// Lookup key (upper case, no underscores) -> canonical name
    static ref CANONICAL: HashMap<String, &'static str> = OPTION_DEFAULTS
        .iter()
        .map(|(name, _)| (name.replace('_', ""), *name))
        .collect();

    /// Alternative names zsh accepts for some options
    static ref OPTION_ALIASES: HashMap<&'static str, (&'static str, bool)> = {
        let mut m = HashMap::new();
        m.insert("BRACEEXPAND", ("IGNORE_BRACES", false));
        m.insert("DOTGLOB", ("GLOB_DOTS", true));
        m.insert("HASHALL", ("HASH_CMDS", true));
        m.insert("HISTAPPEND", ("APPEND_HISTORY", true));
        m.insert("HISTEXPAND", ("BANG_HIST", true));
        m.insert("LOG", ("HIST_NO_FUNCTIONS", false));
        m.insert("MAILWARN", ("MAIL_WARNING", true));
        m.insert("ONECMD", ("SINGLE_COMMAND", true));
        m.insert("PHYSICAL", ("CHASE_LINKS", true));
        m.insert("PROMPTVARS", ("PROMPT_SUBST", true));
        m.insert("STDIN", ("SHIN_STDIN", true));
        m.insert("TRACKALL", ("HASH_CMDS", true));
        m.insert("ERREXIT", ("ERR_EXIT", true));
        m.insert("NOUNSET", ("UNSET", false));
        m.insert("NOGLOB", ("GLOB", false));
        m.insert("NOCLOBBER", ("CLOBBER", false));
        m.insert("NOEXEC", ("EXEC", false));
        m.insert("ALLEXPORT", ("ALL_EXPORT", true));
        m.insert("PIPEFAIL", ("PIPE_FAIL", true));
        m.insert("NULLGLOB", ("NULL_GLOB", true));
        m.insert("FAILGLOB", ("NO_MATCH", true));
        m.insert("EXTGLOB", ("EXTENDED_GLOB", true));
        m
    };
}

/// Resolve a user-supplied option name to `(canonical, value_when_set)`.
///
/// `setopt no_unset` resolves to `("UNSET", false)`.
pub fn resolve_option(name: &str) -> Option<(&'static str, bool)> {
    let key: String = name
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_uppercase();
    if key.is_empty() {
        return None;
    }
    if let Some(&(canonical, value)) = OPTION_ALIASES.get(key.as_str()) {
        return Some((canonical, value));
    }
    if let Some(&canonical) = CANONICAL.get(&key) {
        return Some((canonical, true));
    }
    if let Some(rest) = key.strip_prefix("NO") {
        if let Some(&(canonical, value)) = OPTION_ALIASES.get(rest) {
            return Some((canonical, !value));
        }
        if let Some(&canonical) = CANONICAL.get(rest) {
            return Some((canonical, false));
        }
    }
    None
}

/// The ZSH option table
#[derive(Debug, Clone)]
pub struct ZshOptions {
    values: BTreeMap<&'static str, bool>,
}

impl Default for ZshOptions {
    fn default() -> Self {
        Self {
            values: OPTION_DEFAULTS.iter().cloned().collect(),
        }
    }
}

impl ZshOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an option by any accepted spelling; unknown names read as false
    pub fn is_set(&self, name: &str) -> bool {
        match resolve_option(name) {
            Some((canonical, polarity)) => self.values.get(canonical).copied().unwrap_or(false) == polarity,
            None => false,
        }
    }

    /// `setopt name` (`on == true`) or `unsetopt name` (`on == false`).
    /// Returns false for unknown options.
    pub fn set(&mut self, name: &str, on: bool) -> bool {
        match resolve_option(name) {
            Some((canonical, polarity)) => {
                self.values.insert(canonical, if on { polarity } else { !polarity });
                true
            }
            None => false,
        }
    }

    /// Options whose value differs from the default, as `setopt` lists them
    pub fn changed_from_default(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, default) in OPTION_DEFAULTS.iter() {
            let value = self.values.get(name).copied().unwrap_or(*default);
            if value != *default {
                let display = name.to_ascii_lowercase().replace('_', "");
                if value {
                    out.push(display);
                } else {
                    out.push(format!("no{}", display));
                }
            }
        }
        out.sort();
        out
    }

    /// Every option currently on, in lower-case zsh spelling
    pub fn enabled(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.to_ascii_lowercase().replace('_', ""))
            .collect()
    }

    /// Push ZSH option values into the POSIX option struct
    pub fn sync_to_posix(&self, posix: &mut ShellOptions) {
        posix.errexit = self.is_set("ERR_EXIT");
        posix.nounset = !self.is_set("UNSET");
        posix.xtrace = self.is_set("XTRACE");
        posix.verbose = self.is_set("VERBOSE");
        posix.noglob = !self.is_set("GLOB");
        posix.noclobber = !self.is_set("CLOBBER");
        posix.allexport = self.is_set("ALL_EXPORT");
        posix.pipefail = self.is_set("PIPE_FAIL");
        posix.noexec = !self.is_set("EXEC");
        posix.monitor = self.is_set("MONITOR");
    }

    /// Pull the POSIX option struct into the ZSH table
    pub fn sync_from_posix(&mut self, posix: &ShellOptions) {
        self.set("ERR_EXIT", posix.errexit);
        self.set("UNSET", !posix.nounset);
        self.set("XTRACE", posix.xtrace);
        self.set("VERBOSE", posix.verbose);
        self.set("GLOB", !posix.noglob);
        self.set("CLOBBER", !posix.noclobber);
        self.set("ALL_EXPORT", posix.allexport);
        self.set("PIPE_FAIL", posix.pipefail);
        self.set("EXEC", !posix.noexec);
        self.set("MONITOR", posix.monitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_large() {
        assert!(OPTION_DEFAULTS.len() > 100);
    }

    #[test]
    fn test_name_normalisation() {
        assert_eq!(resolve_option("extendedglob"), Some(("EXTENDED_GLOB", true)));
        assert_eq!(resolve_option("Extended_Glob"), Some(("EXTENDED_GLOB", true)));
        assert_eq!(resolve_option("no_unset"), Some(("UNSET", false)));
        assert_eq!(resolve_option("NOMATCH"), Some(("NO_MATCH", true)));
        assert_eq!(resolve_option("nonomatch"), Some(("NO_MATCH", false)));
        assert_eq!(resolve_option("notify"), Some(("NOTIFY", true)));
        assert_eq!(resolve_option("dotglob"), Some(("GLOB_DOTS", true)));
        assert_eq!(resolve_option("bogus"), None);
    }

    #[test]
    fn test_set_and_query() {
        let mut opts = ZshOptions::new();
        assert!(!opts.is_set("NULL_GLOB"));
        assert!(opts.set("nullglob", true));
        assert!(opts.is_set("NULL_GLOB"));
        assert!(opts.set("NO_UNSET", true));
        assert!(!opts.is_set("UNSET"));
        assert!(opts.is_set("NO_UNSET"));
        assert!(!opts.set("not_an_option", true));
    }

    #[test]
    fn test_changed_listing() {
        let mut opts = ZshOptions::new();
        opts.set("EXTENDED_GLOB", true);
        opts.set("CLOBBER", false);
        assert_eq!(opts.changed_from_default(), vec!["extendedglob", "noclobber"]);
    }

    #[test]
    fn test_posix_sync_round_trip() {
        let mut opts = ZshOptions::new();
        let mut posix = ShellOptions::default();
        posix.errexit = true;
        posix.nounset = true;
        opts.sync_from_posix(&posix);
        assert!(opts.is_set("ERR_EXIT"));
        assert!(opts.is_set("NO_UNSET"));

        opts.set("PIPE_FAIL", true);
        opts.sync_to_posix(&mut posix);
        assert!(posix.pipefail);
        assert!(posix.errexit);
    }
}
