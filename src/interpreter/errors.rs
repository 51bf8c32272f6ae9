//! Control Flow and Runtime Errors
//!
//! Error types used to implement shell control flow:
//! - break / continue: leave or restart loops
//! - return: leave functions and sourced files
//! - exit: terminate the script (or the current subshell)
//! - errexit: exit on error (set -e)
//! - nounset: error on unset parameters (set -u)
//!
//! plus the runtime failures that abort a command: arithmetic errors, bad
//! substitutions, glob failures and execution limits.
//!
//! All of them carry stdout/stderr so output produced before the error
//! survives as it propagates up the execution stack.

use thiserror::Error;

/// Errors that accumulate output while unwinding.
pub trait ControlFlowError: std::error::Error {
    fn stdout(&self) -> &str;
    fn stderr(&self) -> &str;
    fn stdout_mut(&mut self) -> &mut String;
    fn stderr_mut(&mut self) -> &mut String;

    /// Prepend output from the current context before re-throwing.
    fn prepend_output(&mut self, stdout: &str, stderr: &str) {
        let new_stdout = format!("{}{}", stdout, self.stdout());
        let new_stderr = format!("{}{}", stderr, self.stderr());
        *self.stdout_mut() = new_stdout;
        *self.stderr_mut() = new_stderr;
    }
}

macro_rules! impl_control_flow {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ControlFlowError for $ty {
                fn stdout(&self) -> &str { &self.stdout }
                fn stderr(&self) -> &str { &self.stderr }
                fn stdout_mut(&mut self) -> &mut String { &mut self.stdout }
                fn stderr_mut(&mut self) -> &mut String { &mut self.stderr }
            }
        )*
    };
}

/// `break [n]`
#[derive(Debug, Clone, Error)]
#[error("break")]
pub struct BreakError {
    pub levels: u32,
    pub stdout: String,
    pub stderr: String,
}

impl BreakError {
    pub fn new(levels: u32) -> Self {
        Self { levels, stdout: String::new(), stderr: String::new() }
    }
}

/// `continue [n]`
#[derive(Debug, Clone, Error)]
#[error("continue")]
pub struct ContinueError {
    pub levels: u32,
    pub stdout: String,
    pub stderr: String,
}

impl ContinueError {
    pub fn new(levels: u32) -> Self {
        Self { levels, stdout: String::new(), stderr: String::new() }
    }
}

/// `return [n]`
#[derive(Debug, Clone, Error)]
#[error("return")]
pub struct ReturnError {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ReturnError {
    pub fn new(exit_code: i32) -> Self {
        Self { exit_code, stdout: String::new(), stderr: String::new() }
    }
}

/// A command failed while `set -e` was active.
#[derive(Debug, Clone, Error)]
#[error("errexit: command exited with status {exit_code}")]
pub struct ErrexitError {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ErrexitError {
    pub fn new(exit_code: i32, stdout: String, stderr: String) -> Self {
        Self { exit_code, stdout, stderr }
    }
}

/// An unset parameter was referenced while `set -u` was active.
#[derive(Debug, Clone, Error)]
#[error("{var_name}: parameter not set")]
pub struct NounsetError {
    pub var_name: String,
    pub stdout: String,
    pub stderr: String,
}

impl NounsetError {
    pub fn new(var_name: impl Into<String>) -> Self {
        let var_name = var_name.into();
        let stderr = format!("zshell: {}: parameter not set\n", var_name);
        Self { var_name, stdout: String::new(), stderr }
    }
}

/// `exit [n]`
#[derive(Debug, Clone, Error)]
#[error("exit")]
pub struct ExitError {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExitError {
    pub fn new(exit_code: i32) -> Self {
        Self { exit_code, stdout: String::new(), stderr: String::new() }
    }
}

/// Arithmetic failure: division by zero, bad syntax, bad base.
/// The command being expanded fails with status 1.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ArithmeticError {
    pub message: String,
    pub stdout: String,
    pub stderr: String,
}

impl ArithmeticError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let stderr = format!("zshell: {}\n", message);
        Self { message, stdout: String::new(), stderr }
    }
}

/// Expansion failure: bad substitution or `${name:?message}`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExpansionError {
    pub message: String,
    pub stdout: String,
    pub stderr: String,
}

impl ExpansionError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let stderr = format!("zshell: {}\n", message);
        Self { message, stdout: String::new(), stderr }
    }
}

/// A glob had no matches while `NO_MATCH` was set.
#[derive(Debug, Clone, Error)]
#[error("no matches found: {pattern}")]
pub struct GlobError {
    pub pattern: String,
    pub stdout: String,
    pub stderr: String,
}

impl GlobError {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let stderr = format!("zshell: no matches found: {}\n", pattern);
        Self { pattern, stdout: String::new(), stderr }
    }
}

/// Generic failure that aborts the current command (bad redirection target,
/// unreadable file, ...).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub message: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        let message = message.into();
        let stderr = format!("zshell: {}\n", message);
        Self { message, exit_code, stdout: String::new(), stderr }
    }
}

/// The type of execution limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    Recursion,
    Commands,
    Iterations,
}

impl std::fmt::Display for LimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitType::Recursion => write!(f, "recursion"),
            LimitType::Commands => write!(f, "commands"),
            LimitType::Iterations => write!(f, "iterations"),
        }
    }
}

/// Recursion depth, command count or loop iteration limit exceeded.
/// Always raised before the native stack can overflow.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExecutionLimitError {
    pub message: String,
    pub limit_type: LimitType,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionLimitError {
    pub const EXIT_CODE: i32 = 126;

    pub fn new(message: impl Into<String>, limit_type: LimitType) -> Self {
        let message = message.into();
        let stderr = format!("zshell: {}\n", message);
        Self { message, limit_type, stdout: String::new(), stderr }
    }
}

impl_control_flow!(
    BreakError,
    ContinueError,
    ReturnError,
    ErrexitError,
    NounsetError,
    ExitError,
    ArithmeticError,
    ExpansionError,
    GlobError,
    RuntimeError,
    ExecutionLimitError,
);

/// Unified error enum for all interpreter errors.
#[derive(Debug, Clone, Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Break(#[from] BreakError),
    #[error(transparent)]
    Continue(#[from] ContinueError),
    #[error(transparent)]
    Return(#[from] ReturnError),
    #[error(transparent)]
    Errexit(#[from] ErrexitError),
    #[error(transparent)]
    Nounset(#[from] NounsetError),
    #[error(transparent)]
    Exit(#[from] ExitError),
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
    #[error(transparent)]
    Glob(#[from] GlobError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    ExecutionLimit(#[from] ExecutionLimitError),
}

impl InterpreterError {
    fn inner_mut(&mut self) -> &mut dyn ControlFlowError {
        match self {
            InterpreterError::Break(e) => e,
            InterpreterError::Continue(e) => e,
            InterpreterError::Return(e) => e,
            InterpreterError::Errexit(e) => e,
            InterpreterError::Nounset(e) => e,
            InterpreterError::Exit(e) => e,
            InterpreterError::Arithmetic(e) => e,
            InterpreterError::Expansion(e) => e,
            InterpreterError::Glob(e) => e,
            InterpreterError::Runtime(e) => e,
            InterpreterError::ExecutionLimit(e) => e,
        }
    }

    fn inner(&self) -> &dyn ControlFlowError {
        match self {
            InterpreterError::Break(e) => e,
            InterpreterError::Continue(e) => e,
            InterpreterError::Return(e) => e,
            InterpreterError::Errexit(e) => e,
            InterpreterError::Nounset(e) => e,
            InterpreterError::Exit(e) => e,
            InterpreterError::Arithmetic(e) => e,
            InterpreterError::Expansion(e) => e,
            InterpreterError::Glob(e) => e,
            InterpreterError::Runtime(e) => e,
            InterpreterError::ExecutionLimit(e) => e,
        }
    }

    /// Prepend output produced before the error was raised
    pub fn prepend_output(mut self, stdout: &str, stderr: &str) -> Self {
        if !stdout.is_empty() || !stderr.is_empty() {
            self.inner_mut().prepend_output(stdout, stderr);
        }
        self
    }

    /// Move the accumulated output out, leaving the error empty
    pub fn take_output(&mut self) -> (String, String) {
        let inner = self.inner_mut();
        (std::mem::take(inner.stdout_mut()), std::mem::take(inner.stderr_mut()))
    }

    pub fn stdout(&self) -> &str {
        self.inner().stdout()
    }

    pub fn stderr(&self) -> &str {
        self.inner().stderr()
    }

    /// Exit status a script ends with when this error reaches the top level
    pub fn exit_code(&self) -> i32 {
        match self {
            InterpreterError::Break(_) | InterpreterError::Continue(_) => 0,
            InterpreterError::Return(e) => e.exit_code,
            InterpreterError::Errexit(e) => e.exit_code,
            InterpreterError::Exit(e) => e.exit_code,
            InterpreterError::Runtime(e) => e.exit_code,
            InterpreterError::ExecutionLimit(_) => ExecutionLimitError::EXIT_CODE,
            InterpreterError::Nounset(_)
            | InterpreterError::Arithmetic(_)
            | InterpreterError::Expansion(_)
            | InterpreterError::Glob(_) => 1,
        }
    }

    /// Errors that only abort the command being run; the script continues
    pub fn is_command_failure(&self) -> bool {
        matches!(
            self,
            InterpreterError::Arithmetic(_) | InterpreterError::Glob(_) | InterpreterError::Runtime(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepend_output_accumulates() {
        let err: InterpreterError = ExitError::new(3).into();
        let err = err.prepend_output("b\n", "").prepend_output("a\n", "warn\n");
        assert_eq!(err.stdout(), "a\nb\n");
        assert_eq!(err.stderr(), "warn\n");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_messages_use_shell_prefix() {
        assert_eq!(NounsetError::new("FOO").stderr, "zshell: FOO: parameter not set\n");
        assert_eq!(ArithmeticError::new("division by zero").stderr, "zshell: division by zero\n");
        assert_eq!(GlobError::new("*.nope").stderr, "zshell: no matches found: *.nope\n");
    }

    #[test]
    fn test_classification() {
        let limit: InterpreterError = ExecutionLimitError::new("too deep", LimitType::Recursion).into();
        assert_eq!(limit.exit_code(), 126);
        assert!(InterpreterError::from(ArithmeticError::new("x")).is_command_failure());
    }
}
