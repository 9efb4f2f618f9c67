//! Collection state for one run.
//!
//! Processes and resources live in flat arenas. A resource stores the index
//! of its process and a process stores the index of its thread-group leader,
//! so no node owns another. The caches consulted while collecting (the
//! nodev table, the set of mount namespaces already parsed, the class
//! tables) are owned here as well and dropped with the run.

use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use nix::unistd::{Uid, User};
use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::column::{fill_row, CellValue, Column, RowContext};
use crate::error::Result;
use crate::file::{self, ClassRegistry, ClassTables, Resource};
use crate::nodev::NodevTable;
use crate::process::{collect_processes, ProcSource};

pub type ProcessId = usize;
pub type ResourceId = usize;

/// Shown when neither `comm` nor `cmdline` could be read.
pub const UNKNOWN_COMMAND: &str = "(unknown)";

fn get_page_size() -> u64 {
    // SAFETY: sysconf has no preconditions; failure is reported as -1.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

pub static PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);

/// A process or, with thread-level collection, a thread.
#[derive(Debug, Clone)]
pub struct Process {
    pub pid: i32,
    /// Index of the thread-group leader; a leader points at itself.
    pub leader: ProcessId,
    pub command: String,
    /// Owner, taken from the execution image.
    pub uid: u32,
    /// Mount namespace inode, 0 when unknown.
    pub ns_mnt: u64,
    /// Resources in discovery order.
    pub files: Vec<ResourceId>,
}

impl Process {
    pub fn is_leader(&self, id: ProcessId) -> bool {
        self.leader == id
    }
}

/// Everything gathered by one collection pass.
#[derive(Debug)]
pub struct Collection {
    pub processes: Vec<Process>,
    pub resources: Vec<Resource>,
    pub nodevs: NodevTable,
    /// Mount namespaces whose mount table was already parsed.
    pub mnt_namespaces: HashSet<u64>,
    pub tables: ClassTables,
    pub registry: ClassRegistry,
    pub threads: bool,
    /// Cap on the number of thread-group leaders scanned.
    pub max_processes: Option<usize>,
    pub page_size: u64,
}

impl Collection {
    pub fn new(threads: bool) -> Self {
        Self {
            processes: Vec::new(),
            resources: Vec::new(),
            nodevs: NodevTable::new(),
            mnt_namespaces: HashSet::new(),
            tables: ClassTables::default(),
            registry: ClassRegistry::new(),
            threads,
            max_processes: None,
            page_size: *PAGE_SIZE,
        }
    }

    pub fn with_max_processes(mut self, max: Option<usize>) -> Self {
        self.max_processes = max;
        self
    }

    /// Loads the class tables and walks every process of `source`.
    pub fn run(&mut self, source: &dyn ProcSource) -> Result<()> {
        self.registry.initialize_classes(&mut self.tables, source);
        collect_processes(self, source)?;
        info!(
            "collected {} resources from {} processes",
            self.resources.len(),
            self.processes.len()
        );
        Ok(())
    }

    /// Adds a process node. Without a leader the node is its own leader.
    pub fn add_process(
        &mut self,
        pid: i32,
        leader: Option<ProcessId>,
        command: String,
    ) -> ProcessId {
        let id = self.processes.len();
        self.processes.push(Process {
            pid,
            leader: leader.unwrap_or(id),
            command,
            uid: 0,
            ns_mnt: 0,
            files: Vec::new(),
        });
        id
    }

    /// Appends a resource to the arena and to its process's sequence.
    pub fn push_resource(&mut self, resource: Resource) -> ResourceId {
        let id = self.resources.len();
        let owner = resource.process;
        self.resources.push(resource);
        self.processes[owner].files.push(id);
        id
    }

    /// The most recently appended resource of `process`.
    pub fn last_resource(&self, process: ProcessId) -> Option<&Resource> {
        let id = *self.processes.get(process)?.files.last()?;
        self.resources.get(id)
    }

    pub fn resources_of(&self, process: ProcessId) -> impl Iterator<Item = &Resource> + '_ {
        self.processes
            .get(process)
            .into_iter()
            .flat_map(|p| p.files.iter())
            .map(move |&id| &self.resources[id])
    }

    /// Login names of every owner seen, for the USER column.
    pub fn user_names(&self) -> HashMap<u32, String> {
        let mut users = HashMap::new();
        for proc in &self.processes {
            if users.contains_key(&proc.uid) {
                continue;
            }
            match User::from_uid(Uid::from_raw(proc.uid)) {
                Ok(Some(user)) => {
                    users.insert(proc.uid, user.name);
                }
                Ok(None) => {}
                Err(e) => debug!("passwd lookup for uid {} failed: {}", proc.uid, e),
            }
        }
        users
    }

    /// Fills `columns` for every resource, processes in discovery order.
    pub fn rows(&self, columns: &[Column]) -> Vec<Vec<Option<CellValue>>> {
        let users = self.user_names();
        let ctx = RowContext {
            processes: &self.processes,
            tables: &self.tables,
            nodevs: &self.nodevs,
            users: &users,
            page_size: self.page_size,
        };

        self.processes
            .iter()
            .flat_map(|proc| {
                proc.files.iter().map(|&id| {
                    fill_row(&self.registry, &ctx, proc, &self.resources[id], columns)
                })
            })
            .collect()
    }

    /// Runs the content teardown of every resource, then the class
    /// finalizers.
    pub fn finish(&mut self) {
        for resource in &mut self.resources {
            file::free_content(self.registry.chain(resource.class), resource);
        }
        self.registry.finalize_classes(&mut self.tables);
    }
}
