//! Process discovery.
//!
//! Walks the process list of a [`ProcSource`] and collects every process,
//! and with thread-level collection every thread, into a [`Collection`].
//! Threads are queued right after their leader so that their nodes follow
//! it. Before a thread's fs, memory-map or descriptor resources are
//! collected, the kernel is asked whether the thread shares that category
//! with its leader; shared categories are skipped for the thread.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::collector::{
    add_nodevs_for, collect_execve_file, collect_fd_files, collect_fs_files, collect_mem_files,
    collect_namespace_files,
};
use super::procfs::{ProcSource, ShareKind, Sharing};
use crate::error::Result;
use crate::state::{Collection, ProcessId, UNKNOWN_COMMAND};

/// Walks every process of `source`.
///
/// Only the process list itself is required; a process that cannot be read
/// is left out.
pub fn collect_processes(coll: &mut Collection, source: &dyn ProcSource) -> Result<()> {
    let pids = source.pids()?;
    debug!("{} processes listed", pids.len());

    let mut queue: VecDeque<(i32, Option<ProcessId>)> =
        pids.into_iter().map(|pid| (pid, None)).collect();
    let mut leaders = 0usize;

    while let Some((pid, leader)) = queue.pop_front() {
        if leader.is_none() && coll.max_processes.is_some_and(|max| leaders >= max) {
            debug!("process limit of {} reached", leaders);
            break;
        }

        let Some(id) = read_process(coll, source, pid, leader) else {
            continue;
        };

        if leader.is_none() {
            leaders += 1;
            if coll.threads {
                let mut tids = source.tids(pid);
                tids.retain(|&tid| tid != pid);
                for tid in tids.into_iter().rev() {
                    queue.push_front((tid, Some(id)));
                }
            }
        }
    }

    Ok(())
}

/// Whether a thread must collect `kind` itself. Leaders always do.
fn needs_collection(
    coll: &Collection,
    source: &dyn ProcSource,
    id: ProcessId,
    kind: ShareKind,
) -> bool {
    let proc = &coll.processes[id];
    if proc.is_leader(id) {
        return true;
    }
    let leader_pid = coll.processes[proc.leader].pid;
    match source.compare(leader_pid, proc.pid, kind) {
        Sharing::Shared => {
            trace!("tid {} shares {:?} with {}", proc.pid, kind, leader_pid);
            false
        }
        Sharing::NotShared | Sharing::Unknown => true,
    }
}

/// Collects one process or thread. Returns `None` when it vanished before
/// it could be read.
pub fn read_process(
    coll: &mut Collection,
    source: &dyn ProcSource,
    pid: i32,
    leader: Option<ProcessId>,
) -> Option<ProcessId> {
    if !source.exists(pid) {
        trace!("pid {} vanished", pid);
        return None;
    }

    let command = source
        .command(pid)
        .unwrap_or_else(|| UNKNOWN_COMMAND.to_string());
    let id = coll.add_process(pid, leader, command);

    collect_execve_file(coll, source, id);

    if needs_collection(coll, source, id, ShareKind::Fs) {
        collect_fs_files(coll, source, id);
    }

    collect_namespace_files(coll, source, id);
    add_nodevs_for(coll, source, id);

    if needs_collection(coll, source, id, ShareKind::Vm) {
        collect_mem_files(coll, source, id);
    }

    if needs_collection(coll, source, id, ShareKind::Files) {
        collect_fd_files(coll, source, id);
    }

    Some(id)
}
