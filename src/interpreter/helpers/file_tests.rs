//! File test operators for `test`, `[` and `[[ ]]`.
//!
//! Paths are resolved against the shell's cwd. Permission tests ask the
//! kernel with `access(2)` so they reflect the effective user.

use std::ffi::CString;
use std::fs::Metadata;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::Path;

/// Unary operators that test a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTestOperator {
    /// -e / -a
    Exists,
    /// -f
    RegularFile,
    /// -d
    Directory,
    /// -s
    NonEmpty,
    /// -r
    Readable,
    /// -w
    Writable,
    /// -x
    Executable,
    /// -L / -h
    SymbolicLink,
    /// -p
    NamedPipe,
    /// -S
    Socket,
    /// -b
    BlockSpecial,
    /// -c
    CharSpecial,
    /// -k
    StickyBit,
    /// -u
    SetUid,
    /// -g
    SetGid,
    /// -O
    OwnedByUser,
    /// -G
    OwnedByGroup,
}

impl FileTestOperator {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "-e" | "-a" => Self::Exists,
            "-f" => Self::RegularFile,
            "-d" => Self::Directory,
            "-s" => Self::NonEmpty,
            "-r" => Self::Readable,
            "-w" => Self::Writable,
            "-x" => Self::Executable,
            "-L" | "-h" => Self::SymbolicLink,
            "-p" => Self::NamedPipe,
            "-S" => Self::Socket,
            "-b" => Self::BlockSpecial,
            "-c" => Self::CharSpecial,
            "-k" => Self::StickyBit,
            "-u" => Self::SetUid,
            "-g" => Self::SetGid,
            "-O" => Self::OwnedByUser,
            "-G" => Self::OwnedByGroup,
            _ => return None,
        })
    }
}

fn access(path: &Path, mode: libc::c_int) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the call's duration
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

fn check_meta(op: FileTestOperator, meta: &Metadata) -> bool {
    let ft = meta.file_type();
    let mode = meta.permissions().mode();
    match op {
        FileTestOperator::Exists => true,
        FileTestOperator::RegularFile => ft.is_file(),
        FileTestOperator::Directory => ft.is_dir(),
        FileTestOperator::NonEmpty => meta.len() > 0,
        FileTestOperator::NamedPipe => ft.is_fifo(),
        FileTestOperator::Socket => ft.is_socket(),
        FileTestOperator::BlockSpecial => ft.is_block_device(),
        FileTestOperator::CharSpecial => ft.is_char_device(),
        FileTestOperator::StickyBit => mode & 0o1000 != 0,
        FileTestOperator::SetUid => mode & 0o4000 != 0,
        FileTestOperator::SetGid => mode & 0o2000 != 0,
        // SAFETY: geteuid/getegid have no preconditions
        FileTestOperator::OwnedByUser => meta.uid() == unsafe { libc::geteuid() },
        FileTestOperator::OwnedByGroup => meta.gid() == unsafe { libc::getegid() },
        FileTestOperator::Readable
        | FileTestOperator::Writable
        | FileTestOperator::Executable
        | FileTestOperator::SymbolicLink => false,
    }
}

/// Evaluate a unary file test on an already resolved path
pub fn evaluate_file_test(op: FileTestOperator, path: &Path) -> bool {
    match op {
        FileTestOperator::SymbolicLink => path
            .symlink_metadata()
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false),
        FileTestOperator::Readable => access(path, libc::R_OK),
        FileTestOperator::Writable => access(path, libc::W_OK),
        FileTestOperator::Executable => access(path, libc::X_OK),
        _ => path.metadata().map(|m| check_meta(op, &m)).unwrap_or(false),
    }
}

/// `-nt`, `-ot`, `-ef`; None for other operators
pub fn evaluate_file_comparison(op: &str, left: &Path, right: &Path) -> Option<bool> {
    let lm = left.metadata().ok();
    let rm = right.metadata().ok();
    let mtime = |m: &Option<Metadata>| m.as_ref().and_then(|m| m.modified().ok());
    Some(match op {
        "-nt" => match (mtime(&lm), mtime(&rm)) {
            (Some(l), Some(r)) => l > r,
            (Some(_), None) => true,
            _ => false,
        },
        "-ot" => match (mtime(&lm), mtime(&rm)) {
            (Some(l), Some(r)) => l < r,
            (None, Some(_)) => true,
            _ => false,
        },
        "-ef" => match (lm, rm) {
            (Some(l), Some(r)) => l.dev() == r.dev() && l.ino() == r.ino(),
            _ => false,
        },
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tests() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "data").unwrap();
        let empty = dir.path().join("e");
        std::fs::write(&empty, "").unwrap();

        let op = |s| FileTestOperator::parse(s).unwrap();
        assert!(evaluate_file_test(op("-e"), &file));
        assert!(evaluate_file_test(op("-f"), &file));
        assert!(!evaluate_file_test(op("-d"), &file));
        assert!(evaluate_file_test(op("-d"), dir.path()));
        assert!(evaluate_file_test(op("-s"), &file));
        assert!(!evaluate_file_test(op("-s"), &empty));
        assert!(evaluate_file_test(op("-r"), &file));
        assert!(!evaluate_file_test(op("-e"), &dir.path().join("missing")));
        assert!(FileTestOperator::parse("-q").is_none());
    }

    #[test]
    fn test_symlink_and_comparison() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "x").unwrap();
        let link = dir.path().join("l");
        std::os::unix::fs::symlink(&file, &link).unwrap();
        assert!(evaluate_file_test(FileTestOperator::SymbolicLink, &link));
        assert!(!evaluate_file_test(FileTestOperator::SymbolicLink, &file));
        assert_eq!(evaluate_file_comparison("-ef", &file, &link), Some(true));
        assert_eq!(evaluate_file_comparison("-nt", &file, &dir.path().join("none")), Some(true));
        assert_eq!(evaluate_file_comparison("-eq", &file, &link), None);
    }
}
