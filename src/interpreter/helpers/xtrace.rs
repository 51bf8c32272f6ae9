//! xtrace (set -x)
//!
//! Each traced command is written to stderr as `PS4` followed by its
//! expanded words, quoted so the line could be pasted back in. `PS4`
//! goes through prompt expansion; `%N` and `%i` name the script and
//! line.

use crate::interpreter::expansion::prompt::expand_prompt;
use crate::interpreter::helpers::quoting::quote_value;
use crate::interpreter::types::ShellContext;

pub const DEFAULT_PS4: &str = "+ ";

/// Expanded `PS4`; an empty `PS4` gives no prefix
pub fn xtrace_prefix(ctx: &ShellContext) -> String {
    match ctx.vars.get("PS4") {
        None => DEFAULT_PS4.to_string(),
        Some(ps4) if ps4.is_empty() => String::new(),
        Some(ps4) => expand_prompt(ctx, ps4),
    }
}

/// Trace line for a simple command, or None when xtrace is off
pub fn trace_command(ctx: &ShellContext, assignments: &[String], argv: &[String]) -> Option<String> {
    if !ctx.options.xtrace {
        return None;
    }
    let words: Vec<String> = assignments
        .iter()
        .cloned()
        .chain(argv.iter().map(|a| quote_value(a)))
        .collect();
    if words.is_empty() {
        return None;
    }
    Some(format!("{}{}\n", xtrace_prefix(ctx), words.join(" ")))
}

/// Trace line for a construct that is not a simple command (`[[ ]]`,
/// `(( ))`, `for` iterations)
pub fn trace_text(ctx: &ShellContext, text: &str) -> Option<String> {
    ctx.options
        .xtrace
        .then(|| format!("{}{}\n", xtrace_prefix(ctx), text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_command() {
        let mut ctx = ShellContext::default();
        assert_eq!(trace_command(&ctx, &[], &["echo".into()]), None);
        ctx.options.xtrace = true;
        let line = trace_command(&ctx, &["X=1".into()], &["echo".into(), "a b".into()]);
        assert_eq!(line.as_deref(), Some("+ X=1 echo 'a b'\n"));
        ctx.vars.insert("PS4".into(), String::new());
        assert_eq!(trace_text(&ctx, "[[ a ]]").as_deref(), Some("[[ a ]]\n"));
    }
}
