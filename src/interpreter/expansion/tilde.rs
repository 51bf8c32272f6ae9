//! Tilde Expansion
//!
//! `~` → `$HOME`, `~user` → that user's home directory, `~+` → `$PWD`,
//! `~-` → `$OLDPWD`. Unknown users and unset variables leave the text as
//! written.

use std::ffi::{CStr, CString};

use crate::interpreter::types::ShellContext;

/// Home directory of a user from the password database
pub fn user_home(user: &str) -> Option<String> {
    let name = CString::new(user).ok()?;
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    // SAFETY: every pointer refers to storage that outlives the call, and
    // the buffer length matches the buffer
    let rc = unsafe { libc::getpwnam_r(name.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result) };
    if rc != 0 || result.is_null() || pwd.pw_dir.is_null() {
        return None;
    }
    // SAFETY: pw_dir points into `buf`, NUL-terminated by getpwnam_r
    let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
    Some(dir.to_string_lossy().into_owned())
}

fn current_user_home() -> Option<String> {
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    // SAFETY: as in user_home
    let rc = unsafe { libc::getpwuid_r(libc::geteuid(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result) };
    if rc != 0 || result.is_null() || pwd.pw_dir.is_null() {
        return None;
    }
    // SAFETY: pw_dir points into `buf`
    let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
    Some(dir.to_string_lossy().into_owned())
}

/// Expand one tilde prefix
pub fn expand_tilde(ctx: &ShellContext, user: Option<&str>) -> String {
    let expanded = match user {
        None => ctx.home().or_else(current_user_home),
        Some("+") => ctx.get_var("PWD"),
        Some("-") => ctx.get_var("OLDPWD"),
        Some(name) => user_home(name),
    };
    expanded.unwrap_or_else(|| format!("~{}", user.unwrap_or("")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_and_dirs() {
        let mut ctx = ShellContext::default();
        ctx.set_var("HOME", "/home/tester");
        ctx.set_var("OLDPWD", "/prev");
        assert_eq!(expand_tilde(&ctx, None), "/home/tester");
        assert_eq!(expand_tilde(&ctx, Some("-")), "/prev");
        assert_eq!(expand_tilde(&ctx, Some("+")), "/");
    }

    #[test]
    fn test_unknown_user_is_literal() {
        let ctx = ShellContext::default();
        assert_eq!(expand_tilde(&ctx, Some("no_such_user_zz")), "~no_such_user_zz");
    }

    #[test]
    fn test_root_home() {
        assert!(user_home("root").is_some());
    }
}
