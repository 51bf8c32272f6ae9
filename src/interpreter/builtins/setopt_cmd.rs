//! setopt / unsetopt - Turn ZSH options on and off
//!
//! setopt [name ...]
//! unsetopt [name ...]
//!
//! Names are case-insensitive, may contain underscores and take a `no`
//! prefix (`setopt no_glob` is `unsetopt glob`). POSIX names such as
//! `errexit` are accepted too. Without arguments the options that differ
//! from their defaults are listed.

use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};

fn toggle(ctx: &mut ShellContext, cmd: &str, args: &[String], on: bool) -> ExecResult {
    if args.is_empty() {
        let stdout: String = ctx
            .zsh_options
            .changed_from_default()
            .into_iter()
            .map(|name| format!("{}\n", name))
            .collect();
        return ExecResult::new(stdout, String::new(), 0);
    }
    let mut result = ExecResult::ok();
    for name in args {
        if !ctx.set_option(name, on) {
            result.stderr.push_str(&format!("zshell: {}: no such option: {}\n", cmd, name));
            result.exit_code = 1;
        }
    }
    result
}

pub fn handle_setopt(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    Ok(toggle(ctx, "setopt", args, true))
}

pub fn handle_unsetopt(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    Ok(toggle(ctx, "unsetopt", args, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_setopt_spellings() {
        let mut ctx = ShellContext::default();
        handle_setopt(&mut ctx, &args(&["Extended_Glob", "nounset"])).unwrap();
        assert!(ctx.zsh_opt("EXTENDED_GLOB"));
        assert!(ctx.options.nounset);
        handle_setopt(&mut ctx, &args(&["no_extended_glob"])).unwrap();
        assert!(!ctx.zsh_opt("EXTENDED_GLOB"));
        handle_unsetopt(&mut ctx, &args(&["nounset"])).unwrap();
        assert!(!ctx.options.nounset);
    }

    #[test]
    fn test_listing_and_errors() {
        let mut ctx = ShellContext::default();
        assert_eq!(handle_setopt(&mut ctx, &[]).unwrap().stdout, "");
        handle_setopt(&mut ctx, &args(&["errexit"])).unwrap();
        assert_eq!(handle_setopt(&mut ctx, &[]).unwrap().stdout, "errexit\n");
        let r = handle_unsetopt(&mut ctx, &args(&["bogus"])).unwrap();
        assert_eq!(r.stderr, "zshell: unsetopt: no such option: bogus\n");
    }
}
