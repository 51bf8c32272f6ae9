//! history - Show or clear the command history
//!
//! history      - list every entry
//! history n    - list the last n entries
//! history -c   - clear the list

use super::builtin_error;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::history::format_entries;
use crate::interpreter::types::{ExecResult, ShellContext};

pub fn handle_history(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let Ok(mut history) = ctx.history.lock() else {
        return Ok(builtin_error("history", "history unavailable"));
    };
    let stdout = match args.first().map(String::as_str) {
        None => format_entries(history.entries()),
        Some("-c") => {
            history.clear();
            String::new()
        }
        Some(n) => match n.parse::<usize>() {
            Ok(n) => format_entries(history.last(n)),
            Err(_) => return Ok(builtin_error("history", format!("bad argument: {}", n))),
        },
    };
    Ok(ExecResult::new(stdout, String::new(), 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::history::HistoryPolicy;

    #[test]
    fn test_history_listing_and_clear() {
        let mut ctx = ShellContext::default();
        {
            let mut h = ctx.history.lock().unwrap();
            for cmd in ["ls", "pwd", "echo hi"] {
                h.add(cmd, Some(0), HistoryPolicy::default());
            }
        }
        let r = handle_history(&mut ctx, &[]).unwrap();
        assert_eq!(r.stdout, "    1  ls\n    2  pwd\n    3  echo hi\n");
        let r = handle_history(&mut ctx, &["2".to_string()]).unwrap();
        assert_eq!(r.stdout, "    2  pwd\n    3  echo hi\n");
        handle_history(&mut ctx, &["-c".to_string()]).unwrap();
        assert!(ctx.history.lock().unwrap().is_empty());
        assert_eq!(handle_history(&mut ctx, &["x".to_string()]).unwrap().exit_code, 1);
    }
}
