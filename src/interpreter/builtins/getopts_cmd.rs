//! getopts - Parse options from the positional parameters
//!
//! getopts optstring name [arg ...]
//!
//! Each call stores the next option letter in `name`, its argument in
//! OPTARG, and advances OPTIND. A letter followed by `:` takes an
//! argument. A leading `:` selects silent error reporting. Grouped
//! options (`-ab`) are tracked with a character index that persists
//! between calls; assigning OPTIND resets it.

use super::{is_identifier, usage_error};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, GetoptsState, ShellContext};

fn finish(ctx: &mut ShellContext, name: &str, option: &str, optind: usize) -> Result<(), InterpreterError> {
    ctx.assign(name, option)?;
    let char_index = ctx.getopts_state.char_index;
    ctx.assign("OPTIND", optind.to_string())?;
    ctx.getopts_state = GetoptsState { optind, char_index };
    Ok(())
}

/// Handle the getopts builtin command
pub fn handle_getopts(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let [optstring, name, rest @ ..] = args else {
        return Ok(usage_error("getopts", "not enough arguments"));
    };
    if !is_identifier(name) {
        return Ok(usage_error("getopts", format!("not an identifier: {}", name)));
    }
    let params: Vec<String> = if rest.is_empty() { ctx.positional.clone() } else { rest.to_vec() };
    let (silent, spec) = match optstring.strip_prefix(':') {
        Some(spec) => (true, spec),
        None => (false, optstring.as_str()),
    };

    let mut optind: usize = ctx.get_var("OPTIND").and_then(|v| v.parse().ok()).unwrap_or(1).max(1);
    if optind != ctx.getopts_state.optind {
        ctx.getopts_state.char_index = 0;
    }

    if ctx.getopts_state.char_index == 0 {
        let current = params.get(optind - 1).map(String::as_str);
        match current {
            Some("--") => {
                finish(ctx, name, "?", optind + 1)?;
                return Ok(ExecResult::new(String::new(), String::new(), 1));
            }
            Some(arg) if arg.starts_with('-') && arg.len() > 1 => ctx.getopts_state.char_index = 1,
            _ => {
                finish(ctx, name, "?", optind)?;
                return Ok(ExecResult::new(String::new(), String::new(), 1));
            }
        }
    }

    let arg: Vec<char> = params.get(optind - 1).map(|a| a.chars().collect()).unwrap_or_default();
    let Some(&letter) = arg.get(ctx.getopts_state.char_index) else {
        ctx.getopts_state.char_index = 0;
        finish(ctx, name, "?", optind)?;
        return Ok(ExecResult::new(String::new(), String::new(), 1));
    };
    ctx.getopts_state.char_index += 1;
    let at_end = ctx.getopts_state.char_index >= arg.len();
    let remainder: String = arg[ctx.getopts_state.char_index..].iter().collect();
    if at_end {
        optind += 1;
        ctx.getopts_state.char_index = 0;
    }

    let position = spec.find(letter).filter(|_| letter != ':');
    let Some(position) = position else {
        let mut stderr = String::new();
        if silent {
            ctx.assign("OPTARG", letter.to_string())?;
        } else {
            ctx.unset_var("OPTARG")?;
            stderr = format!("zshell: bad option: -{}\n", letter);
        }
        finish(ctx, name, "?", optind)?;
        return Ok(ExecResult::new(String::new(), stderr, 0));
    };

    let takes_argument = spec[position + letter.len_utf8()..].starts_with(':');
    if !takes_argument {
        ctx.unset_var("OPTARG")?;
        finish(ctx, name, &letter.to_string(), optind)?;
        return Ok(ExecResult::ok());
    }

    if !at_end {
        ctx.assign("OPTARG", remainder)?;
        ctx.getopts_state.char_index = 0;
        finish(ctx, name, &letter.to_string(), optind + 1)?;
        return Ok(ExecResult::ok());
    }
    match params.get(optind - 1) {
        Some(value) => {
            ctx.assign("OPTARG", value.clone())?;
            finish(ctx, name, &letter.to_string(), optind + 1)?;
            Ok(ExecResult::ok())
        }
        None if silent => {
            ctx.assign("OPTARG", letter.to_string())?;
            finish(ctx, name, ":", optind)?;
            Ok(ExecResult::ok())
        }
        None => {
            ctx.unset_var("OPTARG")?;
            finish(ctx, name, "?", optind)?;
            let stderr = format!("zshell: argument expected after -{} option\n", letter);
            Ok(ExecResult::new(String::new(), stderr, 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::execution_engine::ExecutionEngine;
    use crate::interpreter::types::{ExecResult, ShellContext};
    use crate::parser::parse;

    fn run(script: &str) -> ExecResult {
        let mut ctx = ShellContext::default();
        ExecutionEngine.run_isolated(&mut ctx, &parse(script).unwrap())
    }

    #[test]
    fn test_grouped_and_arguments() {
        let r = run(
            "set -- -ab -c val -dfoo rest
             while getopts abc:d: opt; do echo \"$opt ${OPTARG-}\"; done
             echo $OPTIND",
        );
        assert_eq!(r.stdout, "a \nb \nc val\nd foo\n5\n");
    }

    #[test]
    fn test_unknown_option_reports() {
        let r = run("set -- -x; getopts ab opt; echo $? $opt");
        assert_eq!(r.stdout, "0 ?\n");
        assert_eq!(r.stderr, "zshell: bad option: -x\n");
    }

    #[test]
    fn test_silent_mode() {
        let r = run("set -- -x -a; getopts :a: opt; echo $opt $OPTARG; getopts :a: opt; echo $opt $OPTARG");
        assert_eq!(r.stdout, "? x\n: a\n");
        assert_eq!(r.stderr, "");
    }

    #[test]
    fn test_end_of_options() {
        let r = run("set -- -a -- -b; while getopts ab o; do echo $o; done; echo $OPTIND");
        assert_eq!(r.stdout, "a\n3\n");
    }

    #[test]
    fn test_reset_optind() {
        let r = run("set -- -ab; getopts ab o; OPTIND=1; getopts ab o; echo $o");
        assert_eq!(r.stdout, "a\n");
    }
}
