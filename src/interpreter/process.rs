//! External Processes
//!
//! `$PATH` resolution, spawning with an explicit environment and stdio,
//! exit status decoding and shebang inspection.

use std::ffi::CString;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// Interpreters whose scripts this shell runs itself
const SHELL_INTERPRETERS: &[&str] = &["sh", "bash", "zsh", "ksh", "dash", "zshell"];

/// Whether the current user may execute `path`
pub fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match CString::new(path.as_os_str().as_bytes()) {
        // SAFETY: access() only reads the NUL-terminated path
        Ok(c) => unsafe { libc::access(c.as_ptr(), libc::X_OK) == 0 },
        Err(_) => false,
    }
}

/// Resolve a command name. Names containing `/` are taken relative to
/// `cwd`; others are searched along `path_var`. Returns the first existing
/// file, executable or not, so callers can tell 126 from 127.
pub fn find_in_path(name: &str, path_var: Option<&str>, cwd: &Path) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let p = if Path::new(name).is_absolute() { PathBuf::from(name) } else { cwd.join(name) };
        return p.exists().then_some(p);
    }
    let mut first_match = None;
    for dir in path_var.unwrap_or("/usr/local/bin:/usr/bin:/bin").split(':') {
        let dir = if dir.is_empty() { cwd.to_path_buf() } else { PathBuf::from(dir) };
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        if first_match.is_none() && candidate.is_file() {
            first_match = Some(candidate);
        }
    }
    first_match
}

/// Exit status as a shell status: the code, or 128 + signal
pub fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

/// Interpreter and optional argument from a `#!` line
pub fn shebang(path: &Path) -> Option<(String, Option<String>)> {
    let file = File::open(path).ok()?;
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first).ok()?;
    let line = first.strip_prefix("#!")?.trim();
    let mut parts = line.splitn(2, char::is_whitespace);
    let interpreter = parts.next().filter(|s| !s.is_empty())?.to_string();
    let arg = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Some((interpreter, arg))
}

/// Whether a shebang names a shell this interpreter can run itself.
/// `#!/usr/bin/env zsh` counts as `zsh`.
pub fn is_shell_interpreter(interpreter: &str, arg: Option<&str>) -> bool {
    let base = Path::new(interpreter).file_name().and_then(|s| s.to_str()).unwrap_or(interpreter);
    let base = if base == "env" { arg.unwrap_or("") } else { base };
    SHELL_INTERPRETERS.contains(&base)
}

/// Everything needed to start one external command
pub struct SpawnSpec<'a> {
    pub program: &'a Path,
    pub argv: &'a [String],
    pub env: &'a [(String, String)],
    pub cwd: &'a Path,
    /// Put the child in its own process group (background jobs)
    pub new_process_group: bool,
}

/// Start a process with a clean environment
pub fn spawn(spec: &SpawnSpec, stdin: Stdio, stdout: Stdio, stderr: Stdio) -> io::Result<Child> {
    let mut cmd = Command::new(spec.program);
    if let Some(name) = spec.argv.first() {
        cmd.arg0(name);
    }
    cmd.args(spec.argv.iter().skip(1))
        .env_clear()
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(spec.cwd)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(stderr);
    if spec.new_process_group {
        cmd.process_group(0);
    }
    cmd.spawn()
}

/// How a failed spawn is reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnFailure {
    /// 127
    NotFound,
    /// 126
    PermissionDenied,
    /// The file has no recognised format; run it as a shell script
    NotExecutableFormat,
    Other(String),
}

impl SpawnFailure {
    pub fn from_io(err: &io::Error) -> Self {
        if err.raw_os_error() == Some(libc::ENOEXEC) {
            return SpawnFailure::NotExecutableFormat;
        }
        match err.kind() {
            io::ErrorKind::NotFound => SpawnFailure::NotFound,
            io::ErrorKind::PermissionDenied => SpawnFailure::PermissionDenied,
            _ => SpawnFailure::Other(err.to_string()),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            SpawnFailure::NotFound => 127,
            _ => 126,
        }
    }

    pub fn message(&self, name: &str) -> String {
        match self {
            SpawnFailure::NotFound => format!("zshell: command not found: {}\n", name),
            SpawnFailure::PermissionDenied | SpawnFailure::NotExecutableFormat => {
                format!("zshell: permission denied: {}\n", name)
            }
            SpawnFailure::Other(msg) => format!("zshell: {}: {}\n", name, msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_find_in_path() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("tool");
        std::fs::write(&exe, "#!/bin/sh\necho hi\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        let path_var = dir.path().to_string_lossy().into_owned();
        assert_eq!(find_in_path("tool", Some(&path_var), Path::new("/")), Some(exe.clone()));
        assert_eq!(find_in_path("./tool", None, dir.path()), Some(dir.path().join("./tool")));
        assert_eq!(find_in_path("missing", Some(&path_var), Path::new("/")), None);
    }

    #[test]
    fn test_non_executable_is_found_but_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data");
        std::fs::write(&file, "x").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();
        let path_var = dir.path().to_string_lossy().into_owned();
        let found = find_in_path("data", Some(&path_var), Path::new("/")).unwrap();
        assert!(!is_executable(&found));
    }

    #[test]
    fn test_shebang() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "#!/usr/bin/env python3").unwrap();
        let (interp, arg) = shebang(f.path()).unwrap();
        assert_eq!(interp, "/usr/bin/env");
        assert_eq!(arg.as_deref(), Some("python3"));
        assert!(!is_shell_interpreter(&interp, arg.as_deref()));
        assert!(is_shell_interpreter("/bin/sh", None));
        assert!(is_shell_interpreter("/usr/bin/env", Some("zsh")));
    }

    #[test]
    fn test_spawn_and_status() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let spec = SpawnSpec {
            program: Path::new("/bin/sh"),
            argv: &argv,
            env: &[],
            cwd: Path::new("/"),
            new_process_group: false,
        };
        let mut child = spawn(&spec, Stdio::null(), Stdio::null(), Stdio::null()).unwrap();
        assert_eq!(exit_code_of(child.wait().unwrap()), 3);
    }

    #[test]
    fn test_spawn_failure_mapping() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(SpawnFailure::from_io(&err).exit_code(), 127);
        assert_eq!(SpawnFailure::NotFound.message("nope"), "zshell: command not found: nope\n");
        assert_eq!(SpawnFailure::PermissionDenied.exit_code(), 126);
    }
}
