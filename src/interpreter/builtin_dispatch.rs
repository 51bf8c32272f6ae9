//! Builtin Command Dispatch
//!
//! Maps command names to builtins through a table built once. Special
//! builtins are found before functions; the rest after them. `command`,
//! `builtin` and `exec` are precommand modifiers handled by command
//! resolution; they are listed here so `type` and completion know them.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::interpreter::builtins::{
    alias_cmd, break_cmd, cd_cmd, continue_cmd, declare_cmd, echo_cmd, eval_cmd, exit_cmd, export_cmd,
    getopts_cmd, history_cmd, jobs_cmd, kill_cmd, let_cmd, local_cmd, printf_cmd, read_cmd, return_cmd,
    set_cmd, setopt_cmd, shift_cmd, source_cmd, test_cmd, trap_cmd, type_cmd, unset_cmd,
};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Colon,
    True,
    False,
    Echo,
    Printf,
    Pwd,
    Cd,
    Export,
    Unset,
    Set,
    Test,
    Bracket,
    Read,
    Trap,
    Getopts,
    Eval,
    Source,
    Exit,
    Return,
    Break,
    Continue,
    Shift,
    Local,
    Typeset,
    Readonly,
    Integer,
    Let,
    Alias,
    Unalias,
    Type,
    Whence,
    Which,
    Jobs,
    Fg,
    Bg,
    Wait,
    Kill,
    Disown,
    Setopt,
    Unsetopt,
    History,
    /// `command`, `builtin`, `exec`
    Precommand,
}

/// Signature shared by every builtin; `args` excludes the command name
pub type BuiltinHandler = fn(&mut ShellContext, &[String]) -> Result<ExecResult, InterpreterError>;

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, Builtin> = {
        let mut m = HashMap::new();
        m.insert(":", Builtin::Colon);
        m.insert("true", Builtin::True);
        m.insert("false", Builtin::False);
        m.insert("echo", Builtin::Echo);
        m.insert("printf", Builtin::Printf);
        m.insert("pwd", Builtin::Pwd);
        m.insert("cd", Builtin::Cd);
        m.insert("export", Builtin::Export);
        m.insert("unset", Builtin::Unset);
        m.insert("set", Builtin::Set);
        m.insert("test", Builtin::Test);
        m.insert("[", Builtin::Bracket);
        m.insert("read", Builtin::Read);
        m.insert("trap", Builtin::Trap);
        m.insert("getopts", Builtin::Getopts);
        m.insert("eval", Builtin::Eval);
        m.insert("source", Builtin::Source);
        m.insert(".", Builtin::Source);
        m.insert("exit", Builtin::Exit);
        m.insert("return", Builtin::Return);
        m.insert("break", Builtin::Break);
        m.insert("continue", Builtin::Continue);
        m.insert("shift", Builtin::Shift);
        m.insert("local", Builtin::Local);
        m.insert("typeset", Builtin::Typeset);
        m.insert("declare", Builtin::Typeset);
        m.insert("readonly", Builtin::Readonly);
        m.insert("integer", Builtin::Integer);
        m.insert("let", Builtin::Let);
        m.insert("alias", Builtin::Alias);
        m.insert("unalias", Builtin::Unalias);
        m.insert("type", Builtin::Type);
        m.insert("whence", Builtin::Whence);
        m.insert("which", Builtin::Which);
        m.insert("jobs", Builtin::Jobs);
        m.insert("fg", Builtin::Fg);
        m.insert("bg", Builtin::Bg);
        m.insert("wait", Builtin::Wait);
        m.insert("kill", Builtin::Kill);
        m.insert("disown", Builtin::Disown);
        m.insert("setopt", Builtin::Setopt);
        m.insert("unsetopt", Builtin::Unsetopt);
        m.insert("history", Builtin::History);
        m.insert("command", Builtin::Precommand);
        m.insert("builtin", Builtin::Precommand);
        m.insert("exec", Builtin::Precommand);
        m
    };
}

/// POSIX special builtins: found before functions
const SPECIAL_BUILTINS: &[&str] = &[
    ":", ".", "break", "continue", "eval", "exec", "exit", "export", "readonly", "return", "set", "shift",
    "source", "trap", "unset",
];

pub fn lookup_builtin(name: &str) -> Option<Builtin> {
    BUILTINS.get(name).copied()
}

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains_key(name)
}

pub fn is_special_builtin(name: &str) -> bool {
    SPECIAL_BUILTINS.contains(&name)
}

/// All builtin names, sorted
pub fn builtin_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = BUILTINS.keys().copied().collect();
    names.sort_unstable();
    names
}

fn handle_true(_ctx: &mut ShellContext, _args: &[String]) -> Result<ExecResult, InterpreterError> {
    Ok(ExecResult::ok())
}

fn handle_false(_ctx: &mut ShellContext, _args: &[String]) -> Result<ExecResult, InterpreterError> {
    Ok(ExecResult::new(String::new(), String::new(), 1))
}

impl Builtin {
    /// The function implementing this builtin. Precommand modifiers have
    /// none; command resolution handles them.
    pub fn handler(self) -> Option<BuiltinHandler> {
        Some(match self {
            Builtin::Colon | Builtin::True => handle_true,
            Builtin::False => handle_false,
            Builtin::Echo => echo_cmd::handle_echo,
            Builtin::Printf => printf_cmd::handle_printf,
            Builtin::Pwd => cd_cmd::handle_pwd,
            Builtin::Cd => cd_cmd::handle_cd,
            Builtin::Export => export_cmd::handle_export,
            Builtin::Unset => unset_cmd::handle_unset,
            Builtin::Set => set_cmd::handle_set,
            Builtin::Test => test_cmd::handle_test,
            Builtin::Bracket => test_cmd::handle_bracket,
            Builtin::Read => read_cmd::handle_read,
            Builtin::Trap => trap_cmd::handle_trap,
            Builtin::Getopts => getopts_cmd::handle_getopts,
            Builtin::Eval => eval_cmd::handle_eval,
            Builtin::Source => source_cmd::handle_source,
            Builtin::Exit => exit_cmd::handle_exit,
            Builtin::Return => return_cmd::handle_return,
            Builtin::Break => break_cmd::handle_break,
            Builtin::Continue => continue_cmd::handle_continue,
            Builtin::Shift => shift_cmd::handle_shift,
            Builtin::Local => local_cmd::handle_local,
            Builtin::Typeset => declare_cmd::handle_typeset,
            Builtin::Readonly => declare_cmd::handle_readonly,
            Builtin::Integer => declare_cmd::handle_integer,
            Builtin::Let => let_cmd::handle_let,
            Builtin::Alias => alias_cmd::handle_alias,
            Builtin::Unalias => alias_cmd::handle_unalias,
            Builtin::Type => type_cmd::handle_type,
            Builtin::Whence => type_cmd::handle_whence,
            Builtin::Which => type_cmd::handle_which,
            Builtin::Jobs => jobs_cmd::handle_jobs,
            Builtin::Fg => jobs_cmd::handle_fg,
            Builtin::Bg => jobs_cmd::handle_bg,
            Builtin::Wait => jobs_cmd::handle_wait,
            Builtin::Kill => kill_cmd::handle_kill,
            Builtin::Disown => jobs_cmd::handle_disown,
            Builtin::Setopt => setopt_cmd::handle_setopt,
            Builtin::Unsetopt => setopt_cmd::handle_unsetopt,
            Builtin::History => history_cmd::handle_history,
            Builtin::Precommand => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup_builtin("echo"), Some(Builtin::Echo));
        assert_eq!(lookup_builtin("declare"), Some(Builtin::Typeset));
        assert_eq!(lookup_builtin("ls"), None);
        assert!(lookup_builtin("exec").unwrap().handler().is_none());
        assert!(lookup_builtin("[").unwrap().handler().is_some());
    }

    #[test]
    fn test_special_builtins() {
        assert!(is_special_builtin("export"));
        assert!(is_special_builtin(":"));
        assert!(!is_special_builtin("echo"));
        assert!(builtin_names().windows(2).all(|w| w[0] <= w[1]));
    }
}
