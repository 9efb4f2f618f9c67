//! Shared helpers for the integration tests: an in-memory process table
//! implementing `ProcSource`.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use lsfd::error::{LsfdError, Result};
use lsfd::{FileStat, ProcSource, ShareKind, Sharing};
use nix::sys::stat::makedev;

fn not_found(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, what.to_string())
}

pub fn regular(dev: u64, ino: u64, size: u64) -> FileStat {
    FileStat {
        dev,
        ino,
        size,
        nlink: 1,
        mode: libc::S_IFREG | 0o644,
        rdev: 0,
        uid: 0,
    }
}

pub fn char_device(rdev: u64, ino: u64) -> FileStat {
    FileStat {
        dev: makedev(0, 5),
        ino,
        size: 0,
        nlink: 1,
        mode: libc::S_IFCHR | 0o666,
        rdev,
        uid: 0,
    }
}

pub fn socket(ino: u64) -> FileStat {
    FileStat {
        dev: makedev(0, 8),
        ino,
        size: 0,
        nlink: 1,
        mode: libc::S_IFSOCK | 0o777,
        rdev: 0,
        uid: 0,
    }
}

pub fn namespace(ino: u64) -> FileStat {
    FileStat {
        dev: makedev(0, 4),
        ino,
        size: 0,
        nlink: 1,
        mode: libc::S_IFREG | 0o444,
        rdev: 0,
        uid: 0,
    }
}

#[derive(Debug, Default)]
pub struct FakeProcess {
    command: Option<String>,
    tids: Vec<i32>,
    fds: Vec<u64>,
    links: HashMap<String, (String, FileStat)>,
    lstat_modes: HashMap<String, u32>,
    files: HashMap<String, String>,
    protocols: HashMap<String, String>,
}

impl FakeProcess {
    pub fn link(&mut self, name: &str, target: &str, stat: FileStat) -> &mut Self {
        self.links
            .insert(name.to_string(), (target.to_string(), stat));
        self
    }

    pub fn fd(&mut self, fd: u64, target: &str, stat: FileStat) -> &mut Self {
        self.fds.push(fd);
        self.fds.sort_unstable();
        self.link(&format!("fd/{}", fd), target, stat)
    }

    pub fn lstat_mode(&mut self, name: &str, mode: u32) -> &mut Self {
        self.lstat_modes.insert(name.to_string(), mode);
        self
    }

    pub fn file(&mut self, name: &str, content: &str) -> &mut Self {
        self.files.insert(name.to_string(), content.to_string());
        self
    }

    pub fn protocol(&mut self, name: &str, proto: &str) -> &mut Self {
        self.protocols.insert(name.to_string(), proto.to_string());
        self
    }
}

/// In-memory `ProcSource`. Counts stat calls and records file reads.
#[derive(Debug, Default)]
pub struct FakeProcSource {
    listed: Vec<i32>,
    processes: HashMap<i32, FakeProcess>,
    paths: HashMap<PathBuf, FileStat>,
    system_files: HashMap<String, String>,
    sharing: Vec<(i32, i32, ShareKind, Sharing)>,
    default_sharing: Option<Sharing>,
    unreadable: bool,
    stat_calls: Cell<usize>,
    reads: RefCell<Vec<(i32, String)>>,
}

impl FakeProcSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A process that cannot list `/proc` at all.
    pub fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Self::default()
        }
    }

    pub fn add_process(&mut self, pid: i32, command: &str) -> &mut FakeProcess {
        self.listed.push(pid);
        let proc = self.processes.entry(pid).or_default();
        proc.command = Some(command.to_string());
        proc.tids = vec![pid];
        proc
    }

    /// A process whose command can't be read.
    pub fn add_nameless_process(&mut self, pid: i32) -> &mut FakeProcess {
        self.listed.push(pid);
        let proc = self.processes.entry(pid).or_default();
        proc.tids = vec![pid];
        proc
    }

    pub fn add_thread(&mut self, leader: i32, tid: i32) -> &mut FakeProcess {
        let command = self.processes.get_mut(&leader).and_then(|p| {
            p.tids.push(tid);
            p.command.clone()
        });
        let thread = self.processes.entry(tid).or_default();
        thread.command = command;
        thread
    }

    /// Listed in the process table, gone by the time it is read.
    pub fn add_vanished(&mut self, pid: i32) {
        self.listed.push(pid);
    }

    pub fn process(&mut self, pid: i32) -> &mut FakeProcess {
        self.processes.entry(pid).or_default()
    }

    pub fn path(&mut self, path: &str, stat: FileStat) -> &mut Self {
        self.paths.insert(PathBuf::from(path), stat);
        self
    }

    pub fn system_file(&mut self, name: &str, content: &str) -> &mut Self {
        self.system_files
            .insert(name.to_string(), content.to_string());
        self
    }

    pub fn share(&mut self, leader: i32, tid: i32, kind: ShareKind, sharing: Sharing) -> &mut Self {
        self.sharing.push((leader, tid, kind, sharing));
        self
    }

    pub fn default_sharing(&mut self, sharing: Sharing) -> &mut Self {
        self.default_sharing = Some(sharing);
        self
    }

    pub fn stat_calls(&self) -> usize {
        self.stat_calls.get()
    }

    /// How often `name` was read for `pid`.
    pub fn reads_of(&self, pid: i32, name: &str) -> usize {
        self.reads
            .borrow()
            .iter()
            .filter(|(p, n)| *p == pid && n == name)
            .count()
    }

    /// How often `name` was read for any process.
    pub fn total_reads_of(&self, name: &str) -> usize {
        self.reads.borrow().iter().filter(|(_, n)| n == name).count()
    }

    fn get(&self, pid: i32) -> io::Result<&FakeProcess> {
        self.processes
            .get(&pid)
            .ok_or_else(|| not_found("no such process"))
    }

    fn count_stat(&self) {
        self.stat_calls.set(self.stat_calls.get() + 1);
    }
}

impl ProcSource for FakeProcSource {
    fn pids(&self) -> Result<Vec<i32>> {
        if self.unreadable {
            return Err(LsfdError::ProcessList {
                path: "/proc".into(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(self.listed.clone())
    }

    fn tids(&self, pid: i32) -> Vec<i32> {
        self.processes
            .get(&pid)
            .map(|p| p.tids.clone())
            .unwrap_or_default()
    }

    fn exists(&self, pid: i32) -> bool {
        self.processes.contains_key(&pid)
    }

    fn command(&self, pid: i32) -> Option<String> {
        self.processes.get(&pid)?.command.clone()
    }

    fn fds(&self, pid: i32) -> Vec<u64> {
        self.processes
            .get(&pid)
            .map(|p| p.fds.clone())
            .unwrap_or_default()
    }

    fn read_link(&self, pid: i32, name: &str) -> io::Result<PathBuf> {
        self.get(pid)?
            .links
            .get(name)
            .map(|(target, _)| PathBuf::from(target))
            .ok_or_else(|| not_found(name))
    }

    fn stat(&self, pid: i32, name: &str) -> io::Result<FileStat> {
        self.count_stat();
        self.get(pid)?
            .links
            .get(name)
            .map(|(_, stat)| *stat)
            .ok_or_else(|| not_found(name))
    }

    fn lstat(&self, pid: i32, name: &str) -> io::Result<FileStat> {
        let proc = self.get(pid)?;
        if !proc.links.contains_key(name) {
            return Err(not_found(name));
        }
        let mode = proc
            .lstat_modes
            .get(name)
            .copied()
            .unwrap_or(libc::S_IFLNK | 0o700);
        Ok(FileStat {
            mode,
            ..FileStat::default()
        })
    }

    fn stat_path(&self, path: &Path) -> io::Result<FileStat> {
        self.count_stat();
        self.paths
            .get(path)
            .copied()
            .ok_or_else(|| not_found(&path.to_string_lossy()))
    }

    fn read_file(&self, pid: i32, name: &str) -> io::Result<Vec<u8>> {
        self.reads.borrow_mut().push((pid, name.to_string()));
        self.get(pid)?
            .files
            .get(name)
            .map(|content| content.as_bytes().to_vec())
            .ok_or_else(|| not_found(name))
    }

    fn read_system_file(&self, name: &str) -> io::Result<String> {
        self.system_files
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    fn socket_protocol(&self, pid: i32, name: &str) -> Option<String> {
        self.processes.get(&pid)?.protocols.get(name).cloned()
    }

    fn compare(&self, pid1: i32, pid2: i32, kind: ShareKind) -> Sharing {
        self.sharing
            .iter()
            .find(|(a, b, k, _)| *a == pid1 && *b == pid2 && *k == kind)
            .map(|(_, _, _, s)| *s)
            .or(self.default_sharing)
            .unwrap_or(Sharing::Unknown)
    }
}
