//! Per-process resource collection.
//!
//! Each operation appends to the process's resource sequence. Before a
//! resource is stat'ed it is compared with the process's previous resource:
//! kernel-ordered lists tend to repeat a target back to back (standard
//! streams on one tty, consecutive segments of one library), and a match is
//! cloned instead of stat'ed again.

use nix::sys::stat::makedev;
use tracing::trace;

use super::maps::parse_maps_line;
use super::procfs::{split_lines, ProcSource};
use crate::file::{self, Association, ContentContext, NsKind, Resource};
use crate::state::{Collection, ProcessId, ResourceId};

const USER_MODE_BITS: u32 = libc::S_IRUSR | libc::S_IWUSR | libc::S_IXUSR;

/// Runs the first `initialize_content` hook of the resource's chain and
/// appends the resource to its process.
fn attach(
    coll: &mut Collection,
    source: &dyn ProcSource,
    mut resource: Resource,
    link: Option<&str>,
) -> ResourceId {
    let pid = coll.processes[resource.process].pid;
    let mut ctx = ContentContext {
        source,
        pid,
        link,
        tables: &mut coll.tables,
    };
    file::initialize_content(coll.registry.chain(resource.class), &mut resource, &mut ctx);
    coll.push_resource(resource)
}

/// Offers every `key: value` line of `fdinfo/<fd>` to the class chain.
fn read_fdinfo(coll: &Collection, source: &dyn ProcSource, pid: i32, resource: &mut Resource) {
    let Some(fd) = resource.association.fd() else {
        return;
    };
    let content = match source.read_file(pid, &format!("fdinfo/{}", fd)) {
        Ok(content) => content,
        Err(e) => {
            trace!("pid {}: no fdinfo for fd {}: {}", pid, fd, e);
            return;
        }
    };

    let chain = coll.registry.chain(resource.class);
    for line in split_lines(&content) {
        let Some((key, value)) = std::str::from_utf8(line)
            .ok()
            .and_then(|line| line.split_once(':'))
        else {
            continue;
        };
        file::dispatch_fdinfo(chain, resource, key, value.trim());
    }
}

/// Resolves one link below the process directory into a resource.
///
/// Returns `None` when the link or its target vanished.
pub fn collect_file_symlink(
    coll: &mut Collection,
    source: &dyn ProcSource,
    process: ProcessId,
    link: &str,
    association: Association,
) -> Option<ResourceId> {
    let pid = coll.processes[process].pid;
    let name = match source.read_link(pid, link) {
        Ok(name) => name,
        Err(e) => {
            trace!("pid {}: readlink {} failed: {}", pid, link, e);
            return None;
        }
    };

    // Targets are compared byte for byte.
    let mut resource = match coll.last_resource(process) {
        Some(prev) if prev.name.as_os_str() == name.as_os_str() => prev.clone_for(association),
        _ => match source.stat(pid, link) {
            Ok(stat) => Resource::new(process, stat, name, association),
            Err(e) => {
                trace!("pid {}: stat {} failed: {}", pid, link, e);
                return None;
            }
        },
    };

    match association {
        Association::Exe => coll.processes[process].uid = resource.stat.uid,
        Association::Ns(NsKind::Mnt) => coll.processes[process].ns_mnt = resource.stat.ino,
        Association::Fd(_) => {
            if let Ok(lstat) = source.lstat(pid, link) {
                resource.mode = lstat.mode & USER_MODE_BITS;
            }
            read_fdinfo(coll, source, pid, &mut resource);
        }
        _ => {}
    }

    Some(attach(coll, source, resource, Some(link)))
}

/// Descriptor table, ascending by descriptor number.
pub fn collect_fd_files(coll: &mut Collection, source: &dyn ProcSource, process: ProcessId) {
    let pid = coll.processes[process].pid;
    for fd in source.fds(pid) {
        collect_file_symlink(coll, source, process, &format!("fd/{}", fd), Association::Fd(fd));
    }
}

/// File-backed memory mappings, in kernel order.
pub fn collect_mem_files(coll: &mut Collection, source: &dyn ProcSource, process: ProcessId) {
    let pid = coll.processes[process].pid;
    let content = match source.read_file(pid, "maps") {
        Ok(content) => content,
        Err(e) => {
            trace!("pid {}: cannot read maps: {}", pid, e);
            return;
        }
    };

    for line in split_lines(&content) {
        let Some(entry) = parse_maps_line(line) else {
            continue;
        };
        let dev = makedev(entry.major, entry.minor);
        let association = if entry.shared {
            Association::Shm
        } else {
            Association::Mem
        };

        let mut resource = match coll.last_resource(process) {
            Some(prev) if prev.stat.dev == dev && prev.stat.ino == entry.inode => {
                prev.clone_for(association)
            }
            _ => match source.stat_path(&entry.path) {
                Ok(stat) => Resource::new(process, stat, entry.path.clone(), association),
                Err(e) => {
                    trace!("pid {}: stat {} failed: {}", pid, entry.path.display(), e);
                    continue;
                }
            },
        };

        resource.mode = entry.mode();
        resource.map_start = entry.start;
        resource.map_end = entry.end;
        resource.pos = entry.offset;
        attach(coll, source, resource, None);
    }
}

/// The execution image.
pub fn collect_execve_file(coll: &mut Collection, source: &dyn ProcSource, process: ProcessId) {
    collect_file_symlink(coll, source, process, "exe", Association::Exe);
}

/// Working directory and root directory.
pub fn collect_fs_files(coll: &mut Collection, source: &dyn ProcSource, process: ProcessId) {
    collect_file_symlink(coll, source, process, "cwd", Association::Cwd);
    collect_file_symlink(coll, source, process, "root", Association::Root);
}

pub fn collect_namespace_files(
    coll: &mut Collection,
    source: &dyn ProcSource,
    process: ProcessId,
) {
    for kind in NsKind::ALL {
        collect_file_symlink(coll, source, process, kind.link_name(), Association::Ns(kind));
    }
}

/// Parses the process's mount table into the nodev table unless its mount
/// namespace was already handled.
pub fn add_nodevs_for(coll: &mut Collection, source: &dyn ProcSource, process: ProcessId) {
    let proc = &coll.processes[process];
    let (pid, ns) = (proc.pid, proc.ns_mnt);
    if ns != 0 && coll.mnt_namespaces.contains(&ns) {
        return;
    }

    match source.read_file(pid, "mountinfo") {
        Ok(content) => {
            coll.nodevs.add_from_mount_table(&content);
            if ns != 0 {
                coll.mnt_namespaces.insert(ns);
            }
            trace!(
                "pid {}: mount namespace {} parsed, {} nodev filesystems known",
                pid,
                ns,
                coll.nodevs.len()
            );
        }
        Err(e) => trace!("pid {}: cannot read mountinfo: {}", pid, e),
    }
}
