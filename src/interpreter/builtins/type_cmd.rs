//! type / whence / which - Describe how a command name would be interpreted
//!
//! type [-a] [-t] name ...      - `name is a shell builtin`, `name is /bin/ls`
//! whence [-avw] name ...       - terse form; `-v` is `type`, `-w` prints the kind
//! which [-a] name ...          - like whence, reporting misses on stdout
//!
//! `command -v` and `command -V` share these descriptions.

use super::split_flags;
use crate::interpreter::command_resolution::{classify_command, CommandKind};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    /// `ls is /bin/ls`
    Verbose,
    /// `/bin/ls`
    Terse,
    /// `ls: command`
    Word,
    /// `file` (`type -t`)
    Kind,
}

fn kind_word(kind: &CommandKind) -> &'static str {
    match kind {
        CommandKind::Alias(_) => "alias",
        CommandKind::Keyword => "reserved",
        CommandKind::Function => "function",
        CommandKind::SpecialBuiltin | CommandKind::Builtin => "builtin",
        CommandKind::File(_) => "command",
    }
}

fn describe(name: &str, kind: &CommandKind, style: Style) -> String {
    match style {
        Style::Verbose => match kind {
            CommandKind::Alias(value) => format!("{} is an alias for {}", name, value),
            CommandKind::Keyword => format!("{} is a reserved word", name),
            CommandKind::Function => format!("{} is a shell function", name),
            CommandKind::SpecialBuiltin => format!("{} is a special shell builtin", name),
            CommandKind::Builtin => format!("{} is a shell builtin", name),
            CommandKind::File(path) => format!("{} is {}", name, path.display()),
        },
        Style::Terse => match kind {
            CommandKind::Alias(value) => value.clone(),
            CommandKind::File(path) => path.display().to_string(),
            _ => name.to_string(),
        },
        Style::Word => format!("{}: {}", name, kind_word(kind)),
        Style::Kind => match kind {
            CommandKind::Keyword => "keyword".to_string(),
            CommandKind::File(_) => "file".to_string(),
            other => kind_word(other).to_string(),
        },
    }
}

fn describe_all(ctx: &ShellContext, names: &[String], style: Style, all: bool, miss: &str) -> ExecResult {
    let mut result = ExecResult::ok();
    for name in names {
        let kinds = classify_command(ctx, name, all);
        if kinds.is_empty() {
            result.exit_code = 1;
            match style {
                Style::Verbose => result.stdout.push_str(&format!("{} not found\n", name)),
                Style::Word => result.stdout.push_str(&format!("{}: none\n", name)),
                _ => result.stdout.push_str(&miss.replace("{}", name)),
            }
            continue;
        }
        let shown = if all { kinds.len() } else { 1 };
        for kind in kinds.iter().take(shown) {
            result.stdout.push_str(&describe(name, kind, style));
            result.stdout.push('\n');
        }
    }
    result
}

/// Descriptions for `command -v` (terse) and `command -V` (verbose)
pub fn describe_commands(ctx: &ShellContext, names: &[String], verbose: bool) -> ExecResult {
    let style = if verbose { Style::Verbose } else { Style::Terse };
    describe_all(ctx, names, style, false, "")
}

/// Handle the type builtin command
pub fn handle_type(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, names) = split_flags(args);
    let all = flags.iter().any(|(c, _)| *c == 'a');
    let style = if flags.iter().any(|(c, _)| *c == 't') { Style::Kind } else { Style::Verbose };
    Ok(describe_all(ctx, names, style, all, ""))
}

pub fn handle_whence(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, names) = split_flags(args);
    let has = |flag: char| flags.iter().any(|(c, _)| *c == flag);
    let style = if has('v') {
        Style::Verbose
    } else if has('w') {
        Style::Word
    } else {
        Style::Terse
    };
    Ok(describe_all(ctx, names, style, has('a'), ""))
}

pub fn handle_which(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, names) = split_flags(args);
    let all = flags.iter().any(|(c, _)| *c == 'a');
    Ok(describe_all(ctx, names, Style::Terse, all, "{} not found\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn ctx() -> ShellContext {
        let mut ctx = ShellContext::default();
        ctx.set_var("PATH", "/usr/bin:/bin");
        ctx.aliases.insert("ll".into(), "ls -l".into());
        ctx
    }

    #[test]
    fn test_type_descriptions() {
        let mut ctx = ctx();
        let r = handle_type(&mut ctx, &args(&["echo", "export", "if", "ll"])).unwrap();
        assert_eq!(
            r.stdout,
            "echo is a shell builtin\nexport is a special shell builtin\nif is a reserved word\nll is an alias for ls -l\n"
        );
        let r = handle_type(&mut ctx, &args(&["no_such_cmd_zz"])).unwrap();
        assert_eq!(r.exit_code, 1);
        assert_eq!(r.stdout, "no_such_cmd_zz not found\n");
    }

    #[test]
    fn test_type_external_and_kind() {
        let mut ctx = ctx();
        let r = handle_type(&mut ctx, &args(&["sh"])).unwrap();
        assert!(r.stdout.starts_with("sh is /"));
        let r = handle_type(&mut ctx, &args(&["-t", "sh", "cd"])).unwrap();
        assert_eq!(r.stdout, "file\nbuiltin\n");
    }

    #[test]
    fn test_whence_and_which() {
        let mut ctx = ctx();
        assert_eq!(handle_whence(&mut ctx, &args(&["ll", "echo"])).unwrap().stdout, "ls -l\necho\n");
        assert_eq!(handle_whence(&mut ctx, &args(&["-w", "echo"])).unwrap().stdout, "echo: builtin\n");
        let r = handle_which(&mut ctx, &args(&["no_such_cmd_zz"])).unwrap();
        assert_eq!((r.stdout.as_str(), r.exit_code), ("no_such_cmd_zz not found\n", 1));
        let r = describe_commands(&ctx, &args(&["no_such_cmd_zz"]), false);
        assert_eq!((r.stdout.as_str(), r.exit_code), ("", 1));
    }
}
