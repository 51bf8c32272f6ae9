//! cd / pwd - Working directory builtins
//!
//! cd [-L|-P] [dir]
//! - cd      - change to $HOME
//! - cd -    - change to $OLDPWD and print it
//! - cd -P   - resolve symlinks in the new directory
//!
//! pwd [-L|-P]

use std::path::{Component, Path, PathBuf};

use super::{builtin_error, split_flags};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};

/// Resolve `.` and `..` lexically
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
            _ => {}
        }
    }
    out
}

/// Handle the cd builtin command
pub fn handle_cd(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, operands) = split_flags(args);
    let mut physical = false;
    for (flag, _) in flags {
        match flag {
            'P' => physical = true,
            'L' => physical = false,
            other => return Ok(builtin_error("cd", format!("bad option: -{}", other))),
        }
    }
    if operands.len() > 1 {
        return Ok(builtin_error("cd", "too many arguments"));
    }

    let mut print_path = false;
    let target = match operands.first().map(String::as_str) {
        None => match ctx.home() {
            Some(home) => home,
            None => return Ok(builtin_error("cd", "HOME not set")),
        },
        Some("-") => match ctx.get_var("OLDPWD") {
            Some(old) => {
                print_path = true;
                old
            }
            None => return Ok(builtin_error("cd", "OLDPWD not set")),
        },
        Some(dir) => dir.to_string(),
    };

    let mut new_dir = normalize_path(&ctx.resolve_path(&target));
    if !new_dir.exists() {
        return Ok(builtin_error("cd", format!("no such file or directory: {}", target)));
    }
    if !new_dir.is_dir() {
        return Ok(builtin_error("cd", format!("not a directory: {}", target)));
    }
    if physical {
        if let Ok(canonical) = std::fs::canonicalize(&new_dir) {
            new_dir = canonical;
        }
    }

    let old = ctx.cwd.to_string_lossy().into_owned();
    let new = new_dir.to_string_lossy().into_owned();
    ctx.assign("OLDPWD", old)?;
    ctx.assign("PWD", new.clone())?;
    ctx.cwd = new_dir;

    let stdout = if print_path { format!("{}\n", new) } else { String::new() };
    Ok(ExecResult::new(stdout, String::new(), 0))
}

/// Handle the pwd builtin command
pub fn handle_pwd(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, _) = split_flags(args);
    let physical = flags.iter().any(|(c, _)| *c == 'P');
    let dir = if physical {
        std::fs::canonicalize(&ctx.cwd).unwrap_or_else(|_| ctx.cwd.clone())
    } else {
        ctx.cwd.clone()
    };
    Ok(ExecResult::new(format!("{}\n", dir.display()), String::new(), 0))
}
