//! set - Shell options and positional parameters
//!
//! set                      - list variables
//! set [-+eux...] [args]    - toggle single-letter options
//! set -o name / +o name    - toggle an option by name (POSIX or ZSH)
//! set -o / +o              - list options / print commands restoring them
//! set -- [args]            - replace the positional parameters
//! set -A name [values]     - assign an indexed array

use super::builtin_error;
use super::declare_cmd::variable_names;
use crate::interpreter::assoc_arrays::ShellArray;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::quoting::quote_value;
use crate::interpreter::types::{ExecResult, ShellContext, ShellOptions, SET_FLAGS};

fn list_variables(ctx: &ShellContext) -> String {
    let mut out = String::new();
    for name in variable_names(ctx) {
        if let Some(array) = ctx.arrays.get(&name) {
            let values: Vec<String> = array.values().iter().map(|v| quote_value(v)).collect();
            out.push_str(&format!("{}=( {} )\n", name, values.join(" ")));
        } else if let Some(value) = ctx.vars.get(&name) {
            out.push_str(&format!("{}={}\n", name, quote_value(value)));
        }
    }
    out
}

fn list_options(ctx: &ShellContext, as_commands: bool) -> String {
    ShellOptions::NAMES
        .iter()
        .map(|name| {
            let on = ctx.options.get(name).unwrap_or(false);
            if as_commands {
                format!("set {}o {}\n", if on { '-' } else { '+' }, name)
            } else {
                format!("{:<22}{}\n", name, if on { "on" } else { "off" })
            }
        })
        .collect()
}

/// Handle the set builtin command
pub fn handle_set(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    if args.is_empty() {
        return Ok(ExecResult::new(list_variables(ctx), String::new(), 0));
    }

    let mut stdout = String::new();
    let mut assign_array = false;
    let mut i = 0;
    let mut positional: Option<&[String]> = None;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--" {
            positional = Some(&args[i + 1..]);
            break;
        }
        if arg == "-" {
            ctx.set_option("xtrace", false);
            ctx.set_option("verbose", false);
            positional = Some(&args[i + 1..]).filter(|rest| !rest.is_empty());
            break;
        }
        let on = match arg.chars().next() {
            Some('-') => true,
            Some('+') => false,
            _ => {
                positional = Some(&args[i..]);
                break;
            }
        };
        i += 1;
        for flag in arg[1..].chars() {
            match flag {
                'o' => match args.get(i) {
                    Some(name) if !name.starts_with('-') && !name.starts_with('+') => {
                        i += 1;
                        if !ctx.set_option(name, on) {
                            return Ok(builtin_error("set", format!("no such option: {}", name)));
                        }
                    }
                    _ => stdout.push_str(&list_options(ctx, !on)),
                },
                'A' => assign_array = on,
                _ => match SET_FLAGS.iter().find(|(c, _)| *c == flag) {
                    Some((_, name)) => {
                        ctx.set_option(name, on);
                    }
                    None => return Ok(builtin_error("set", format!("bad option: {}{}", if on { '-' } else { '+' }, flag))),
                },
            }
        }
    }

    if assign_array {
        let rest = positional.unwrap_or(&[]);
        let Some((name, values)) = rest.split_first() else {
            return Ok(ExecResult::new(list_variables(ctx), String::new(), 0));
        };
        ctx.set_array(name, ShellArray::from_values(values.to_vec()))?;
        return Ok(ExecResult::new(stdout, String::new(), 0));
    }

    if let Some(rest) = positional {
        ctx.positional = rest.to_vec();
    }
    Ok(ExecResult::new(stdout, String::new(), 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_flags() {
        let mut ctx = ShellContext::default();
        handle_set(&mut ctx, &args(&["-eu"])).unwrap();
        assert!(ctx.options.errexit && ctx.options.nounset);
        handle_set(&mut ctx, &args(&["+e"])).unwrap();
        assert!(!ctx.options.errexit);
        assert!(ctx.zsh_opt("NO_UNSET"));
    }

    #[test]
    fn test_set_long_options() {
        let mut ctx = ShellContext::default();
        handle_set(&mut ctx, &args(&["-o", "pipefail"])).unwrap();
        assert!(ctx.options.pipefail);
        handle_set(&mut ctx, &args(&["-o", "extended_glob"])).unwrap();
        assert!(ctx.zsh_opt("EXTENDED_GLOB"));
        let r = handle_set(&mut ctx, &args(&["-o", "bogus"])).unwrap();
        assert_eq!(r.exit_code, 1);
        let listing = handle_set(&mut ctx, &args(&["+o"])).unwrap().stdout;
        assert!(listing.contains("set -o pipefail\n"));
        assert!(listing.contains("set +o errexit\n"));
    }

    #[test]
    fn test_set_positional() {
        let mut ctx = ShellContext::default();
        handle_set(&mut ctx, &args(&["a", "b"])).unwrap();
        assert_eq!(ctx.positional, args(&["a", "b"]));
        handle_set(&mut ctx, &args(&["-x", "--", "-c"])).unwrap();
        assert_eq!(ctx.positional, args(&["-c"]));
        handle_set(&mut ctx, &args(&["--"])).unwrap();
        assert!(ctx.positional.is_empty());
    }

    #[test]
    fn test_set_array() {
        let mut ctx = ShellContext::default();
        handle_set(&mut ctx, &args(&["-A", "arr", "x", "y"])).unwrap();
        assert_eq!(ctx.array_values("arr"), Some(args(&["x", "y"])));
    }

    #[test]
    fn test_bad_flag() {
        let mut ctx = ShellContext::default();
        let r = handle_set(&mut ctx, &args(&["-Q"])).unwrap();
        assert_eq!(r.stderr, "zshell: set: bad option: -Q\n");
    }
}
