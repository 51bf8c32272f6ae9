//! Interpreter Types
//!
//! Shell state (`ShellContext`), execution results and limits.
//!
//! One `ShellContext` exists per `Shell`. Subshells, command substitutions
//! and background jobs run against a `Clone` of it; the job table and the
//! history list are shared through `Arc<Mutex<..>>` so OS process handles
//! are never duplicated.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use indexmap::IndexMap;
use rand::Rng;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::ast::types::FunctionDefNode;
use crate::interpreter::assoc_arrays::{AssocArrayManager, ShellArray};
use crate::interpreter::completion::CompletionRegistry;
use crate::interpreter::errors::{InterpreterError, RuntimeError};
use crate::interpreter::history::History;
use crate::interpreter::jobs::{JobTable, SharedJobTable};
use crate::interpreter::zsh_options::{resolve_option, ZshOptions};

pub const DEFAULT_IFS: &str = " \t\n";

/// Shell options (set -e, etc.)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellOptions {
    /// set -e: Exit immediately if a command exits with non-zero status
    pub errexit: bool,
    /// set -o pipefail: Pipeline status is the last non-zero stage status
    pub pipefail: bool,
    /// set -u: Treat unset variables as an error when substituting
    pub nounset: bool,
    /// set -x: Print commands and their arguments as they are executed
    pub xtrace: bool,
    /// set -v: Print shell input lines as they are read
    pub verbose: bool,
    /// set -a: Export all variables
    pub allexport: bool,
    /// set -C: Prevent overwriting files with redirection
    pub noclobber: bool,
    /// set -f: Disable filename expansion (globbing)
    pub noglob: bool,
    /// set -n: Read commands but do not execute them
    pub noexec: bool,
    /// set -m: Job control; background jobs get their own process group
    pub monitor: bool,
}

/// Single-letter `set` flags and the POSIX option each one controls
pub const SET_FLAGS: &[(char, &str)] = &[
    ('e', "errexit"),
    ('u', "nounset"),
    ('x', "xtrace"),
    ('v', "verbose"),
    ('f', "noglob"),
    ('C', "noclobber"),
    ('a', "allexport"),
    ('n', "noexec"),
    ('m', "monitor"),
];

impl ShellOptions {
    /// Names accepted by `set -o`
    pub const NAMES: &'static [&'static str] = &[
        "allexport",
        "errexit",
        "monitor",
        "noclobber",
        "noexec",
        "noglob",
        "nounset",
        "pipefail",
        "verbose",
        "xtrace",
    ];

    pub fn get(&self, name: &str) -> Option<bool> {
        Some(match name {
            "errexit" => self.errexit,
            "pipefail" => self.pipefail,
            "nounset" => self.nounset,
            "xtrace" => self.xtrace,
            "verbose" => self.verbose,
            "allexport" => self.allexport,
            "noclobber" => self.noclobber,
            "noglob" => self.noglob,
            "noexec" => self.noexec,
            "monitor" => self.monitor,
            _ => return None,
        })
    }

    pub fn set(&mut self, name: &str, on: bool) -> bool {
        let slot = match name {
            "errexit" => &mut self.errexit,
            "pipefail" => &mut self.pipefail,
            "nounset" => &mut self.nounset,
            "xtrace" => &mut self.xtrace,
            "verbose" => &mut self.verbose,
            "allexport" => &mut self.allexport,
            "noclobber" => &mut self.noclobber,
            "noglob" => &mut self.noglob,
            "noexec" => &mut self.noexec,
            "monitor" => &mut self.monitor,
            _ => return false,
        };
        *slot = on;
        true
    }
}

/// Execution limits configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionLimits {
    /// Maximum function call depth (`FUNCNEST`)
    pub max_call_depth: u32,
    /// Maximum number of commands to execute
    pub max_command_count: u64,
    /// Maximum number of iterations of one loop
    pub max_loop_iterations: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            max_command_count: 100_000,
            max_loop_iterations: 1_000_000,
        }
    }
}

/// Execution result from a command or script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecResult {
    pub fn new(stdout: String, stderr: String, exit_code: i32) -> Self {
        Self { stdout, stderr, exit_code }
    }

    /// Success result with no output
    pub fn ok() -> Self {
        Self::new(String::new(), String::new(), 0)
    }

    /// Failure result with stderr message
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self::new(String::new(), stderr.into(), 1)
    }

    /// Failure result with stderr message and custom exit code
    pub fn failure_with_code(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self::new(String::new(), stderr.into(), exit_code)
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Append another result's output, taking its exit code
    pub fn append(&mut self, other: ExecResult) {
        self.stdout.push_str(&other.stdout);
        self.stderr.push_str(&other.stderr);
        self.exit_code = other.exit_code;
    }
}

impl Default for ExecResult {
    fn default() -> Self {
        Self::ok()
    }
}

impl Serialize for ExecResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ExecResult", 4)?;
        s.serialize_field("stdout", &self.stdout)?;
        s.serialize_field("stderr", &self.stderr)?;
        s.serialize_field("exit_code", &self.exit_code)?;
        s.serialize_field("success", &self.success())?;
        s.end()
    }
}

// ============================================================================
// Standard Input
// ============================================================================

/// Where in-process commands read their standard input from
#[derive(Debug, Clone, Default)]
pub enum Input {
    /// In-memory text (heredocs, `<` redirections, captured stage output)
    Buffer { data: String, pos: usize },
    /// The read end of a pipeline pipe, shared by every command in a stage
    Pipe(Arc<Mutex<os_pipe::PipeReader>>),
    /// An open file (`< file`, `<&3`); reads advance the shared offset
    File(Arc<File>),
    /// The shell process's own stdin
    Inherit,
    /// Nothing to read
    #[default]
    Empty,
}

/// Read one byte at a time so nothing past the delimiter is consumed
fn read_stream_until(reader: &mut dyn Read, delim: char) -> Option<(String, bool)> {
    let mut bytes = Vec::new();
    let mut found = false;
    let mut buf = [0u8; 1];
    let mut delim_buf = [0u8; 4];
    let delim_bytes = delim.encode_utf8(&mut delim_buf).as_bytes().to_vec();
    while let Ok(1) = reader.read(&mut buf) {
        bytes.push(buf[0]);
        if bytes.ends_with(&delim_bytes) {
            bytes.truncate(bytes.len() - delim_bytes.len());
            found = true;
            break;
        }
    }
    if bytes.is_empty() && !found {
        return None;
    }
    Some((String::from_utf8_lossy(&bytes).into_owned(), found))
}

fn read_stream_chars(reader: &mut dyn Read, count: usize) -> Option<String> {
    let mut bytes = Vec::new();
    let mut buf = [0u8; 1];
    while String::from_utf8_lossy(&bytes).chars().count() < count {
        match reader.read(&mut buf) {
            Ok(1) => bytes.push(buf[0]),
            _ => break,
        }
    }
    if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Input {
    pub fn from_string(data: impl Into<String>) -> Self {
        Input::Buffer { data: data.into(), pos: 0 }
    }

    pub fn from_pipe(reader: os_pipe::PipeReader) -> Self {
        Input::Pipe(Arc::new(Mutex::new(reader)))
    }

    /// Read up to and excluding `delim`. `None` at end of input; the bool
    /// is false when input ended before the delimiter.
    pub fn read_until(&mut self, delim: char) -> Option<(String, bool)> {
        match self {
            Input::Buffer { data, pos } => {
                if *pos >= data.len() {
                    return None;
                }
                let rest = &data[*pos..];
                match rest.find(delim) {
                    Some(i) => {
                        let line = rest[..i].to_string();
                        *pos += i + delim.len_utf8();
                        Some((line, true))
                    }
                    None => {
                        let line = rest.to_string();
                        *pos = data.len();
                        Some((line, false))
                    }
                }
            }
            Input::Pipe(reader) => {
                let mut reader = reader.lock().ok()?;
                read_stream_until(&mut *reader, delim)
            }
            Input::File(file) => read_stream_until(&mut &**file, delim),
            Input::Inherit => read_stream_until(&mut std::io::stdin().lock(), delim),
            Input::Empty => None,
        }
    }

    /// Read at most `count` characters
    pub fn read_chars(&mut self, count: usize) -> Option<String> {
        match self {
            Input::Buffer { data, pos } => {
                if *pos >= data.len() {
                    return None;
                }
                let taken: String = data[*pos..].chars().take(count).collect();
                *pos += taken.len();
                Some(taken)
            }
            Input::Pipe(reader) => {
                let mut reader = reader.lock().ok()?;
                read_stream_chars(&mut *reader, count)
            }
            Input::File(file) => read_stream_chars(&mut &**file, count),
            Input::Inherit => read_stream_chars(&mut std::io::stdin().lock(), count),
            Input::Empty => None,
        }
    }

    /// Everything not yet consumed. The shell's own stdin is never drained.
    pub fn take_rest(&mut self) -> Option<String> {
        match self {
            Input::Buffer { data, pos } => {
                let rest = data.get(*pos..).unwrap_or("").to_string();
                *pos = data.len();
                Some(rest)
            }
            Input::Pipe(reader) => {
                let mut reader = reader.lock().ok()?;
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes).ok()?;
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            Input::File(file) => {
                let mut bytes = Vec::new();
                (&**file).read_to_end(&mut bytes).ok()?;
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => None,
        }
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self, Input::Inherit)
    }
}

// ============================================================================
// File Descriptors
// ============================================================================

/// A descriptor opened with `exec n>file` and kept for the shell's lifetime
#[derive(Debug, Clone)]
pub enum FdTarget {
    File { file: Arc<File>, path: PathBuf, readable: bool },
    /// Duplicated from the shell's own standard output or error
    Stdout,
    Stderr,
    Closed,
}

// ============================================================================
// getopts
// ============================================================================

/// Position inside a bundled option group (`-abc`) between getopts calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetoptsState {
    /// OPTIND value the char index belongs to
    pub optind: usize,
    /// Next character within the current argument
    pub char_index: usize,
}

// ============================================================================
// Local Scopes
// ============================================================================

/// What a name held before `local` shadowed it
#[derive(Debug, Clone, Default)]
pub struct SavedVar {
    pub scalar: Option<String>,
    pub array: Option<ShellArray>,
    pub exported: bool,
    pub integer: bool,
}

// ============================================================================
// Process Substitution
// ============================================================================

/// Our end of a `<(..)`/`>(..)` pipe, held open while the command runs
#[derive(Debug)]
pub enum SubstitutionEnd {
    Reader(os_pipe::PipeReader),
    Writer(os_pipe::PipeWriter),
}

#[derive(Debug)]
pub struct ProcessSubstitution {
    pub end: SubstitutionEnd,
    /// The `>(..)` reader thread; its output is appended to the command's
    pub output: Option<std::thread::JoinHandle<ExecResult>>,
}

/// Substitutions opened while expanding the current command. Clones start
/// empty; each context only finishes its own.
#[derive(Debug, Default)]
pub struct PendingSubstitutions(pub Vec<ProcessSubstitution>);

impl Clone for PendingSubstitutions {
    fn clone(&self) -> Self {
        Self::default()
    }
}

// ============================================================================
// Pipeline Wiring
// ============================================================================

/// Set by the pipeline on a simple-command stage. An external command
/// takes `stdout` and writes straight into the next stage's pipe; other
/// commands leave it and their captured output is copied in afterwards.
#[derive(Debug, Default)]
pub struct StageWiring {
    pub stdout: Option<os_pipe::PipeWriter>,
    /// `|&`: stderr goes down the pipe as well
    pub merge_stderr: bool,
}

impl Clone for StageWiring {
    fn clone(&self) -> Self {
        Self::default()
    }
}

/// A trap handler: a command string, or ignore
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrapAction {
    Command(String),
    Ignore,
}

// ============================================================================
// Shell Context
// ============================================================================

/// Complete interpreter state.
#[derive(Debug, Clone)]
pub struct ShellContext {
    // ---- Variables ----
    pub vars: HashMap<String, String>,
    pub exported: HashSet<String>,
    pub readonly: HashSet<String>,
    /// Names declared with `typeset -i`/`integer`
    pub integer_vars: HashSet<String>,
    pub arrays: AssocArrayManager,
    pub positional: Vec<String>,
    /// `$0`
    pub script_name: String,

    // ---- Functions & Scopes ----
    pub functions: IndexMap<String, Arc<FunctionDefNode>>,
    /// One map per active function call
    pub local_scopes: Vec<HashMap<String, SavedVar>>,

    // ---- Options ----
    pub options: ShellOptions,
    pub zsh_options: ZshOptions,

    // ---- Shared Collaborators ----
    pub jobs: SharedJobTable,
    pub history: Arc<Mutex<History>>,
    pub completion: CompletionRegistry,

    // ---- Shell Features ----
    pub traps: HashMap<String, TrapAction>,
    pub aliases: IndexMap<String, String>,
    pub cwd: PathBuf,

    // ---- Execution Tracking ----
    pub last_exit_code: i32,
    /// `$!`
    pub last_bg_pid: Option<u32>,
    pub getopts_state: GetoptsState,
    pub loop_depth: u32,
    pub call_depth: u32,
    /// Non-zero while running an if/while/until condition or a non-final
    /// `&&`/`||` member; errexit is suspended
    pub condition_depth: u32,
    pub command_count: u64,
    pub limits: ExecutionLimits,
    pub start_time: Instant,
    pub current_line: usize,
    /// `$$`; unchanged in subshells
    pub shell_pid: u32,
    /// True inside `( .. )`, `$( .. )` and background jobs
    pub in_subshell: bool,

    // ---- I/O ----
    pub stdin: Input,
    pub fds: HashMap<i32, FdTarget>,
    /// Diagnostics produced while expanding words, flushed by the engine
    pub expansion_stderr: String,
    /// Status of the last command substitution in the current command
    pub last_subst_status: Option<i32>,
    /// Set by background threads so the job can be cancelled
    pub cancel: Option<Arc<AtomicBool>>,
    /// OS processes started by a background thread job
    pub spawned_pids: Option<Arc<Mutex<Vec<u32>>>>,
    pub substitutions: PendingSubstitutions,
    pub stage: StageWiring,
}

impl Default for ShellContext {
    fn default() -> Self {
        Self::new(PathBuf::from("/"), HashMap::new())
    }
}

impl ShellContext {
    /// Fresh context; every entry of `env` is imported as an exported variable
    pub fn new(cwd: PathBuf, env: HashMap<String, String>) -> Self {
        let mut ctx = Self {
            vars: HashMap::new(),
            exported: HashSet::new(),
            readonly: HashSet::new(),
            integer_vars: HashSet::new(),
            arrays: AssocArrayManager::new(),
            positional: Vec::new(),
            script_name: "zshell".to_string(),
            functions: IndexMap::new(),
            local_scopes: Vec::new(),
            options: ShellOptions::default(),
            zsh_options: ZshOptions::new(),
            jobs: Arc::new(Mutex::new(JobTable::new())),
            history: Arc::new(Mutex::new(History::default())),
            completion: CompletionRegistry::new(),
            traps: HashMap::new(),
            aliases: IndexMap::new(),
            cwd,
            last_exit_code: 0,
            last_bg_pid: None,
            getopts_state: GetoptsState::default(),
            loop_depth: 0,
            call_depth: 0,
            condition_depth: 0,
            command_count: 0,
            limits: ExecutionLimits::default(),
            start_time: Instant::now(),
            current_line: 0,
            shell_pid: std::process::id(),
            in_subshell: false,
            stdin: Input::Empty,
            fds: HashMap::new(),
            expansion_stderr: String::new(),
            last_subst_status: None,
            cancel: None,
            spawned_pids: None,
            substitutions: PendingSubstitutions::default(),
            stage: StageWiring::default(),
        };
        for (k, v) in env {
            ctx.vars.insert(k.clone(), v);
            ctx.exported.insert(k);
        }
        ctx.vars.entry("IFS".to_string()).or_insert_with(|| DEFAULT_IFS.to_string());
        ctx.vars.entry("PS4".to_string()).or_insert_with(|| "+ ".to_string());
        ctx.vars.entry("OPTIND".to_string()).or_insert_with(|| "1".to_string());
        let pwd = ctx.cwd.to_string_lossy().into_owned();
        ctx.vars.insert("PWD".to_string(), pwd);
        ctx.exported.insert("PWD".to_string());
        ctx
    }

    /// Copy for a subshell. Traps other than ignores are reset.
    pub fn subshell(&self) -> Self {
        let mut child = self.clone();
        child.traps.retain(|_, action| *action == TrapAction::Ignore);
        child.in_subshell = true;
        child.expansion_stderr.clear();
        child
    }

    // ------------------------------------------------------------------------
    // Variable lookup
    // ------------------------------------------------------------------------

    /// Value of a special parameter, if `name` is one
    pub fn special_param(&self, name: &str) -> Option<String> {
        Some(match name {
            "?" => self.last_exit_code.to_string(),
            "$" => self.shell_pid.to_string(),
            "!" => self.last_bg_pid.map(|p| p.to_string()).unwrap_or_default(),
            "#" => self.positional.len().to_string(),
            "0" => self.script_name.clone(),
            "-" => self.option_flags(),
            "@" => self.positional.join(" "),
            "*" => {
                let sep = self.ifs().chars().next().map(String::from).unwrap_or_default();
                self.positional.join(&sep)
            }
            "RANDOM" => rand::thread_rng().gen_range(0..32768).to_string(),
            "SECONDS" => self.start_time.elapsed().as_secs().to_string(),
            "LINENO" => self.current_line.to_string(),
            _ => {
                if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
                    let n: usize = name.parse().ok()?;
                    return self.positional.get(n.checked_sub(1)?).cloned();
                }
                return None;
            }
        })
    }

    /// Value of a parameter: specials, scalars, then element 0 of an array
    pub fn get_var(&self, name: &str) -> Option<String> {
        if let Some(v) = self.special_param(name) {
            return Some(v);
        }
        if let Some(v) = self.vars.get(name) {
            return Some(v.clone());
        }
        let array = self.arrays.get(name)?;
        array.get("0").cloned().or_else(|| array.values().into_iter().next())
    }

    /// Whether a parameter is set (an empty value counts as set)
    pub fn is_set(&self, name: &str) -> bool {
        match name {
            "!" => self.last_bg_pid.is_some(),
            _ if !name.is_empty() && name != "0" && name.bytes().all(|b| b.is_ascii_digit()) => {
                self.special_param(name).is_some()
            }
            _ => self.special_param(name).is_some() || self.vars.contains_key(name) || self.arrays.contains(name),
        }
    }

    pub fn is_array(&self, name: &str) -> bool {
        self.arrays.contains(name)
    }

    /// All values of an array, or of `@`/`*`
    pub fn array_values(&self, name: &str) -> Option<Vec<String>> {
        if name == "@" || name == "*" {
            return Some(self.positional.clone());
        }
        self.arrays.get(name).map(|a| a.values())
    }

    pub fn ifs(&self) -> String {
        self.vars.get("IFS").cloned().unwrap_or_else(|| DEFAULT_IFS.to_string())
    }

    pub fn home(&self) -> Option<String> {
        self.vars.get("HOME").cloned()
    }

    /// Letters of the enabled single-letter options, for `$-`
    pub fn option_flags(&self) -> String {
        SET_FLAGS
            .iter()
            .filter(|(_, name)| self.options.get(name).unwrap_or(false))
            .map(|(c, _)| *c)
            .collect()
    }

    // ------------------------------------------------------------------------
    // Variable mutation
    // ------------------------------------------------------------------------

    /// Store a scalar without readonly checks. Assigning to an indexed
    /// array name sets element 0.
    pub fn set_var(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(array) = self.arrays.get_mut(name) {
            array.set("0", value);
            return;
        }
        match name {
            "PWD" => self.cwd = PathBuf::from(&value),
            // Assigning OPTIND restarts option parsing
            "OPTIND" => self.getopts_state.char_index = 0,
            _ => {}
        }
        self.vars.insert(name.to_string(), value);
        if self.options.allexport {
            self.exported.insert(name.to_string());
        }
    }

    /// Assign a scalar, honouring `readonly`
    pub fn assign(&mut self, name: &str, value: impl Into<String>) -> Result<(), InterpreterError> {
        self.check_writable(name)?;
        self.set_var(name, value);
        Ok(())
    }

    pub fn check_writable(&self, name: &str) -> Result<(), InterpreterError> {
        if self.readonly.contains(name) {
            return Err(RuntimeError::new(format!("read-only variable: {}", name), 1).into());
        }
        Ok(())
    }

    /// Replace a name's value with an array
    pub fn set_array(&mut self, name: &str, array: ShellArray) -> Result<(), InterpreterError> {
        self.check_writable(name)?;
        self.vars.remove(name);
        self.arrays.insert(name, array);
        Ok(())
    }

    /// Set one element; creates the array on first use
    pub fn set_array_element(&mut self, name: &str, key: &str, value: String) -> Result<(), InterpreterError> {
        self.check_writable(name)?;
        if !self.arrays.contains(name) {
            let existing = self.vars.remove(name);
            let array = self.arrays.get_or_create(name);
            if let Some(v) = existing {
                array.set("0", v);
            }
        }
        let ok = self.arrays.get_or_create(name).set(key, value);
        if !ok {
            return Err(RuntimeError::new(format!("{}: bad array subscript", key), 1).into());
        }
        Ok(())
    }

    pub fn unset_var(&mut self, name: &str) -> Result<(), InterpreterError> {
        if self.readonly.contains(name) {
            return Err(RuntimeError::new(format!("read-only variable: {}", name), 1).into());
        }
        self.vars.remove(name);
        self.arrays.remove(name);
        self.exported.remove(name);
        self.integer_vars.remove(name);
        Ok(())
    }

    pub fn export(&mut self, name: &str) {
        self.exported.insert(name.to_string());
    }

    /// Environment handed to external processes
    pub fn child_env(&self) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = self
            .exported
            .iter()
            .filter_map(|name| self.get_exported_value(name).map(|v| (name.clone(), v)))
            .collect();
        env.sort();
        env
    }

    fn get_exported_value(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .cloned()
            .or_else(|| self.arrays.get(name).map(|a| a.values().join(" ")))
    }

    // ------------------------------------------------------------------------
    // Local scopes
    // ------------------------------------------------------------------------

    pub fn push_scope(&mut self) {
        self.local_scopes.push(HashMap::new());
    }

    /// Restore every name the innermost scope shadowed
    pub fn pop_scope(&mut self) {
        let Some(scope) = self.local_scopes.pop() else {
            return;
        };
        for (name, saved) in scope {
            self.vars.remove(&name);
            self.arrays.remove(&name);
            self.readonly.remove(&name);
            if let Some(v) = saved.scalar {
                self.vars.insert(name.clone(), v);
            }
            if let Some(a) = saved.array {
                self.arrays.insert(&name, a);
            }
            if saved.exported {
                self.exported.insert(name.clone());
            } else {
                self.exported.remove(&name);
            }
            if saved.integer {
                self.integer_vars.insert(name);
            } else {
                self.integer_vars.remove(&name);
            }
        }
    }

    /// Shadow `name` in the innermost function scope. Returns false outside
    /// functions. The current value stays visible until reassigned.
    pub fn declare_local(&mut self, name: &str) -> bool {
        let saved = SavedVar {
            scalar: self.vars.get(name).cloned(),
            array: self.arrays.get(name).cloned(),
            exported: self.exported.contains(name),
            integer: self.integer_vars.contains(name),
        };
        match self.local_scopes.last_mut() {
            Some(scope) => {
                scope.entry(name.to_string()).or_insert(saved);
                true
            }
            None => false,
        }
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.local_scopes.last().map_or(false, |s| s.contains_key(name))
    }

    // ------------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------------

    /// Set a POSIX or ZSH option by any accepted spelling; both option
    /// tables are updated. Returns false for unknown names.
    pub fn set_option(&mut self, name: &str, on: bool) -> bool {
        if self.options.set(name, on) {
            self.zsh_options.sync_from_posix(&self.options);
            return true;
        }
        match resolve_option(name) {
            Some(_) => {
                self.zsh_options.set(name, on);
                self.zsh_options.sync_to_posix(&mut self.options);
                true
            }
            None => false,
        }
    }

    /// Whether a ZSH option is on
    pub fn zsh_opt(&self, name: &str) -> bool {
        self.zsh_options.is_set(name)
    }

    // ------------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------------

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |c| c.load(Ordering::SeqCst))
    }

    /// Remember a process started on behalf of a background thread job
    pub fn track_child(&self, pid: u32) {
        if let Some(pids) = &self.spawned_pids {
            if let Ok(mut pids) = pids.lock() {
                pids.push(pid);
            }
        }
    }

    /// Resolve a possibly relative path against the shell's cwd
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            p
        } else {
            self.cwd.join(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::assoc_arrays::ArrayKind;

    #[test]
    fn test_exec_result_serializes_success() {
        let json = serde_json::to_value(ExecResult::new("a\n".into(), String::new(), 0)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["stdout"], "a\n");
        let json = serde_json::to_value(ExecResult::failure("x")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["exit_code"], 1);
    }

    #[test]
    fn test_special_params() {
        let mut ctx = ShellContext::default();
        ctx.positional = vec!["a".into(), "b".into()];
        ctx.last_exit_code = 3;
        assert_eq!(ctx.get_var("?").as_deref(), Some("3"));
        assert_eq!(ctx.get_var("#").as_deref(), Some("2"));
        assert_eq!(ctx.get_var("2").as_deref(), Some("b"));
        assert_eq!(ctx.get_var("3"), None);
        assert!(!ctx.is_set("!"));
        let r: u32 = ctx.get_var("RANDOM").unwrap().parse().unwrap();
        assert!(r < 32768);
    }

    #[test]
    fn test_readonly_and_allexport() {
        let mut ctx = ShellContext::default();
        ctx.assign("X", "1").unwrap();
        ctx.readonly.insert("X".into());
        assert!(ctx.assign("X", "2").is_err());
        assert!(ctx.unset_var("X").is_err());
        ctx.options.allexport = true;
        ctx.assign("Y", "v").unwrap();
        assert!(ctx.child_env().contains(&("Y".to_string(), "v".to_string())));
    }

    #[test]
    fn test_local_scope_restores() {
        let mut ctx = ShellContext::default();
        ctx.set_var("x", "global");
        ctx.push_scope();
        assert!(ctx.declare_local("x"));
        ctx.set_var("x", "local");
        ctx.declare_local("fresh");
        ctx.set_var("fresh", "1");
        ctx.pop_scope();
        assert_eq!(ctx.get_var("x").as_deref(), Some("global"));
        assert_eq!(ctx.get_var("fresh"), None);
        assert!(!ctx.declare_local("x"));
    }

    #[test]
    fn test_array_element_promotes_scalar() {
        let mut ctx = ShellContext::default();
        ctx.set_var("a", "zero");
        ctx.set_array_element("a", "2", "two".into()).unwrap();
        assert_eq!(ctx.array_values("a"), Some(vec!["zero".to_string(), "two".to_string()]));
        ctx.arrays.declare("m", ArrayKind::Associative);
        ctx.set_array_element("m", "k", "v".into()).unwrap();
        assert_eq!(ctx.get_var("m"), Some("v".to_string()));
    }

    #[test]
    fn test_option_sync() {
        let mut ctx = ShellContext::default();
        assert!(ctx.set_option("errexit", true));
        assert!(ctx.zsh_opt("ERR_EXIT"));
        assert!(ctx.set_option("NO_UNSET", true));
        assert!(ctx.options.nounset);
        assert_eq!(ctx.option_flags(), "eu");
        assert!(!ctx.set_option("bogus", true));
    }

    #[test]
    fn test_input_buffer() {
        let mut input = Input::from_string("one\ntwo");
        assert_eq!(input.read_until('\n'), Some(("one".to_string(), true)));
        assert_eq!(input.read_until('\n'), Some(("two".to_string(), false)));
        assert_eq!(input.read_until('\n'), None);
        let mut input = Input::from_string("abcdef");
        assert_eq!(input.read_chars(2).as_deref(), Some("ab"));
        assert_eq!(input.take_rest().as_deref(), Some("cdef"));
    }
}
