//! Kernel access for the collector.
//!
//! Everything the collector learns about a process goes through the
//! [`ProcSource`] trait. [`SysProcFs`] reads the live `/proc` (or the `/proc`
//! below a sysroot); tests plug in synthetic sources.
//!
//! All reads are path based. A directory listing is read to completion and
//! its handle dropped before the caller sees the entries, so no directory
//! handle outlives the call that opened it and scanning thousands of
//! processes never accumulates descriptors.

use crate::error::{LsfdError, Result};
use crate::file::FileStat;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Resource categories the kernel can compare between two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKind {
    /// Open file table (`KCMP_FILES`).
    Files,
    /// Address space (`KCMP_VM`).
    Vm,
    /// Filesystem information: root, cwd, umask (`KCMP_FS`).
    Fs,
}

impl ShareKind {
    fn kcmp_type(self) -> libc::c_long {
        // <linux/kcmp.h>
        match self {
            ShareKind::Vm => 1,
            ShareKind::Files => 2,
            ShareKind::Fs => 3,
        }
    }
}

/// Outcome of a sharing comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sharing {
    Shared,
    NotShared,
    /// The comparison could not be made; callers must collect.
    Unknown,
}

/// Source of per-process kernel state.
///
/// `name` arguments are relative to the process directory, e.g. `fd/3`,
/// `exe`, `ns/mnt`, `maps`, `fdinfo/3`.
pub trait ProcSource {
    /// Numeric entries of the process list. Failure here is fatal.
    fn pids(&self) -> Result<Vec<i32>>;

    /// Task ids of a thread group, leader included.
    fn tids(&self, pid: i32) -> Vec<i32>;

    /// Whether the process directory is still there.
    fn exists(&self, pid: i32) -> bool;

    fn command(&self, pid: i32) -> Option<String>;

    /// Open descriptor numbers, ascending.
    fn fds(&self, pid: i32) -> Vec<u64>;

    /// Link target, byte for byte.
    fn read_link(&self, pid: i32, name: &str) -> io::Result<PathBuf>;

    /// stat(2) following the link.
    fn stat(&self, pid: i32, name: &str) -> io::Result<FileStat>;

    /// lstat(2) of the link itself.
    fn lstat(&self, pid: i32, name: &str) -> io::Result<FileStat>;

    /// stat(2) of an absolute path as seen by the inspected system.
    fn stat_path(&self, path: &Path) -> io::Result<FileStat>;

    /// Raw contents of a file below the process directory. Kernel text files
    /// may carry non-UTF-8 paths, so decoding is left to the per-line parsers.
    fn read_file(&self, pid: i32, name: &str) -> io::Result<Vec<u8>>;

    /// Reads a system-wide text file below `/proc` (`devices`, `misc`, ...).
    fn read_system_file(&self, name: &str) -> io::Result<String>;

    /// Value of the `system.sockprotoname` attribute of a socket link.
    fn socket_protocol(&self, pid: i32, name: &str) -> Option<String>;

    /// Compares one resource category of two tasks.
    fn compare(&self, pid1: i32, pid2: i32, kind: ShareKind) -> Sharing;
}

impl From<&fs::Metadata> for FileStat {
    fn from(m: &fs::Metadata) -> Self {
        FileStat {
            dev: m.dev(),
            ino: m.ino(),
            size: m.size(),
            nlink: m.nlink(),
            mode: m.mode(),
            rdev: m.rdev(),
            uid: m.uid(),
        }
    }
}

/// `/proc` of the running system, or of a sysroot.
#[derive(Debug)]
pub struct SysProcFs {
    root: PathBuf,
    proc_root: PathBuf,
    live: bool,
    kcmp_warned: AtomicBool,
}

impl Default for SysProcFs {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SysProcFs {
    pub fn new(sysroot: Option<&Path>) -> Self {
        let root = sysroot
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        let live = root == Path::new("/");
        Self {
            proc_root: root.join("proc"),
            root,
            live,
            kcmp_warned: AtomicBool::new(false),
        }
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    fn process_path(&self, pid: i32) -> PathBuf {
        self.proc_root.join(pid.to_string())
    }

    fn entry_path(&self, pid: i32, name: &str) -> PathBuf {
        self.process_path(pid).join(name)
    }
}

/// Numeric directory entries of `dir`.
fn numeric_entries<T: std::str::FromStr>(dir: &Path) -> io::Result<Vec<T>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if let Ok(v) = name.parse() {
            out.push(v);
        }
    }
    Ok(out)
}

/// Non-empty lines of a kernel text file.
pub fn split_lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    content
        .split(|&b| b == b'\n')
        .filter(|line| !line.is_empty())
}

/// Reads the process name from `comm`, falling back to the basename of the
/// first `cmdline` word.
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    if let Ok(raw) = fs::read(proc_path.join("comm")) {
        let s = String::from_utf8_lossy(&raw);
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let content = fs::read(proc_path.join("cmdline")).ok()?;
    let first = content.split(|&b| b == 0u8).next()?;
    if first.is_empty() {
        return None;
    }
    Path::new(OsStr::from_bytes(first))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

impl ProcSource for SysProcFs {
    fn pids(&self) -> Result<Vec<i32>> {
        let mut pids = numeric_entries(&self.proc_root).map_err(|source| {
            LsfdError::ProcessList {
                path: self.proc_root.clone(),
                source,
            }
        })?;
        pids.sort_unstable();
        Ok(pids)
    }

    fn tids(&self, pid: i32) -> Vec<i32> {
        numeric_entries(&self.entry_path(pid, "task")).unwrap_or_default()
    }

    fn exists(&self, pid: i32) -> bool {
        self.process_path(pid).is_dir()
    }

    fn command(&self, pid: i32) -> Option<String> {
        read_process_name(&self.process_path(pid))
    }

    fn fds(&self, pid: i32) -> Vec<u64> {
        match numeric_entries::<u64>(&self.entry_path(pid, "fd")) {
            Ok(mut fds) => {
                fds.sort_unstable();
                fds
            }
            Err(e) => {
                trace!("pid {}: cannot list fd/: {}", pid, e);
                Vec::new()
            }
        }
    }

    fn read_link(&self, pid: i32, name: &str) -> io::Result<PathBuf> {
        fs::read_link(self.entry_path(pid, name))
    }

    fn stat(&self, pid: i32, name: &str) -> io::Result<FileStat> {
        fs::metadata(self.entry_path(pid, name)).map(|m| FileStat::from(&m))
    }

    fn lstat(&self, pid: i32, name: &str) -> io::Result<FileStat> {
        fs::symlink_metadata(self.entry_path(pid, name)).map(|m| FileStat::from(&m))
    }

    fn stat_path(&self, path: &Path) -> io::Result<FileStat> {
        let full = self.root.join(path.strip_prefix("/").unwrap_or(path));
        fs::metadata(full).map(|m| FileStat::from(&m))
    }

    fn read_file(&self, pid: i32, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.entry_path(pid, name))
    }

    fn read_system_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.proc_root.join(name))
    }

    fn socket_protocol(&self, pid: i32, name: &str) -> Option<String> {
        let raw = xattr::get_deref(self.entry_path(pid, name), "system.sockprotoname")
            .ok()??;
        let proto = String::from_utf8_lossy(&raw)
            .trim_end_matches('\0')
            .to_string();
        (!proto.is_empty()).then_some(proto)
    }

    fn compare(&self, pid1: i32, pid2: i32, kind: ShareKind) -> Sharing {
        // Task ids below a sysroot do not name live tasks.
        if !self.live {
            return Sharing::Unknown;
        }

        let rc = unsafe {
            libc::syscall(
                libc::SYS_kcmp,
                pid1 as libc::c_long,
                pid2 as libc::c_long,
                kind.kcmp_type(),
                0 as libc::c_long,
                0 as libc::c_long,
            )
        };

        match rc {
            0 => Sharing::Shared,
            r if r > 0 => Sharing::NotShared,
            _ => {
                let err = io::Error::last_os_error();
                if !self.kcmp_warned.swap(true, Ordering::Relaxed) {
                    debug!(
                        "kcmp unavailable ({}), collecting every thread's resources",
                        err
                    );
                }
                Sharing::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_kind_kcmp_types() {
        assert_eq!(ShareKind::Vm.kcmp_type(), 1);
        assert_eq!(ShareKind::Files.kcmp_type(), 2);
        assert_eq!(ShareKind::Fs.kcmp_type(), 3);
    }

    #[test]
    fn test_sysroot_is_not_live() {
        let fs = SysProcFs::new(Some(Path::new("/nonexistent-root")));
        assert_eq!(fs.proc_root(), Path::new("/nonexistent-root/proc"));
        assert_eq!(fs.compare(1, 2, ShareKind::Files), Sharing::Unknown);
    }

    #[test]
    fn test_missing_proc_root_is_fatal() {
        let fs = SysProcFs::new(Some(Path::new("/nonexistent-root")));
        assert!(matches!(fs.pids(), Err(LsfdError::ProcessList { .. })));
    }

    #[test]
    fn test_split_lines_keeps_raw_bytes() {
        let lines: Vec<&[u8]> = split_lines(b"a b\n\nweird\xff\nlast").collect();
        assert_eq!(lines, vec![&b"a b"[..], &b"weird\xff"[..], &b"last"[..]]);
    }

    #[test]
    fn test_read_own_process() {
        let fs = SysProcFs::default();
        let pid = std::process::id() as i32;
        assert!(fs.exists(pid));
        assert!(fs.command(pid).is_some());
        assert!(fs.pids().expect("live /proc").contains(&pid));
    }
}
