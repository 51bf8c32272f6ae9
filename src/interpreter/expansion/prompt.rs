//! Prompt Expansion
//!
//! zsh `%` escapes (`%n %m %~ %d %/ %# %? %% %j`) and the bash-style
//! backslash escapes (`\u \h \w \W \$ \n`) found in `PS1`-like strings.
//! Unknown escapes are kept as written.

use std::ffi::CStr;

use crate::interpreter::types::ShellContext;

fn hostname() -> String {
    let mut buf = [0 as libc::c_char; 256];
    // SAFETY: the buffer length is passed, and gethostname NUL-terminates
    // on success
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr(), buf.len()) };
    if rc != 0 {
        return String::new();
    }
    // SAFETY: NUL-terminated by gethostname
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    name.to_string_lossy().into_owned()
}

fn short_hostname() -> String {
    let full = hostname();
    full.split('.').next().unwrap_or("").to_string()
}

fn username(ctx: &ShellContext) -> String {
    ctx.get_var("USER")
        .or_else(|| ctx.get_var("LOGNAME"))
        .unwrap_or_else(|| {
            // SAFETY: geteuid has no preconditions
            unsafe { libc::geteuid() }.to_string()
        })
}

fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions
    unsafe { libc::geteuid() == 0 }
}

/// Current directory with `$HOME` abbreviated to `~`
fn tilde_cwd(ctx: &ShellContext) -> String {
    let cwd = ctx.cwd.to_string_lossy().into_owned();
    match ctx.home() {
        Some(home) if !home.is_empty() && home != "/" => {
            if cwd == home {
                "~".to_string()
            } else if let Some(rest) = cwd.strip_prefix(&format!("{}/", home)) {
                format!("~/{}", rest)
            } else {
                cwd
            }
        }
        _ => cwd,
    }
}

fn job_count(ctx: &ShellContext) -> usize {
    ctx.jobs.lock().map(|mut t| t.list().len()).unwrap_or(0)
}

pub fn expand_prompt(ctx: &ShellContext, ps: &str) -> String {
    let mut out = String::new();
    let mut chars = ps.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' => match chars.next() {
                Some('n') => out.push_str(&username(ctx)),
                Some('m') => out.push_str(&short_hostname()),
                Some('M') => out.push_str(&hostname()),
                Some('~') => out.push_str(&tilde_cwd(ctx)),
                Some('d') | Some('/') => out.push_str(&ctx.cwd.to_string_lossy()),
                Some('#') => out.push(if is_root() { '#' } else { '%' }),
                Some('?') => out.push_str(&ctx.last_exit_code.to_string()),
                Some('%') => out.push('%'),
                Some('j') => out.push_str(&job_count(ctx).to_string()),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            },
            '\\' => match chars.next() {
                Some('u') => out.push_str(&username(ctx)),
                Some('h') => out.push_str(&short_hostname()),
                Some('H') => out.push_str(&hostname()),
                Some('w') => out.push_str(&tilde_cwd(ctx)),
                Some('W') => {
                    let cwd = tilde_cwd(ctx);
                    let base = if cwd == "/" || cwd == "~" {
                        cwd
                    } else {
                        cwd.rsplit('/').next().unwrap_or("").to_string()
                    };
                    out.push_str(&base);
                }
                Some('$') => out.push(if is_root() { '#' } else { '$' }),
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx() -> ShellContext {
        let mut ctx = ShellContext::default();
        ctx.set_var("USER", "alice");
        ctx.set_var("HOME", "/home/alice");
        ctx.cwd = PathBuf::from("/home/alice/src/proj");
        ctx.last_exit_code = 2;
        ctx
    }

    #[test]
    fn test_zsh_escapes() {
        let c = ctx();
        assert_eq!(expand_prompt(&c, "%n:%~ %? %%"), "alice:~/src/proj 2 %");
        assert_eq!(expand_prompt(&c, "%d"), "/home/alice/src/proj");
        assert_eq!(expand_prompt(&c, "%j"), "0");
        assert_eq!(expand_prompt(&c, "%z"), "%z");
    }

    #[test]
    fn test_bash_escapes() {
        let c = ctx();
        assert_eq!(expand_prompt(&c, "\\u \\w \\W\\n"), "alice ~/src/proj proj\n");
    }

    #[test]
    fn test_hostname_is_short() {
        let c = ctx();
        assert!(!expand_prompt(&c, "%m").contains('.'));
    }
}
