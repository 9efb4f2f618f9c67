//! Classified file resources and the class registry.
//!
//! Every resource is tagged with one of six classes selected from its stat
//! mode. A class is a table of optional behaviors plus an optional parent;
//! a behavior request walks the chain from the most specific class toward
//! the root and stops at the first class that handles it. The chains are
//! resolved once into per-tag lists by [`ClassRegistry`].

pub mod bdev;
pub mod cdev;
pub mod fifo;
pub mod generic;
pub mod sock;
pub mod unkn;

use crate::column::{CellValue, Column, RowContext};
use crate::names::NameManager;
use crate::process::ProcSource;
use crate::state::{Process, ProcessId};
use ahash::AHashMap as HashMap;
use std::fmt;
use std::path::PathBuf;

pub use bdev::BDEV_CLASS;
pub use cdev::CDEV_CLASS;
pub use fifo::FIFO_CLASS;
pub use generic::FILE_CLASS;
pub use sock::SOCK_CLASS;
pub use unkn::UNKN_CLASS;

/// Snapshot of stat(2) attributes taken at discovery time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStat {
    pub dev: u64,
    pub ino: u64,
    pub size: u64,
    pub nlink: u64,
    pub mode: u32,
    pub rdev: u64,
    pub uid: u32,
}

/// Classification tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassTag {
    File,
    Cdev,
    Bdev,
    Sock,
    Fifo,
    Unkn,
}

impl ClassTag {
    pub const ALL: [ClassTag; 6] = [
        ClassTag::File,
        ClassTag::Cdev,
        ClassTag::Bdev,
        ClassTag::Sock,
        ClassTag::Fifo,
        ClassTag::Unkn,
    ];

    pub fn from_mode(mode: u32) -> Self {
        match mode & libc::S_IFMT {
            libc::S_IFCHR => ClassTag::Cdev,
            libc::S_IFBLK => ClassTag::Bdev,
            libc::S_IFSOCK => ClassTag::Sock,
            libc::S_IFIFO => ClassTag::Fifo,
            libc::S_IFLNK | libc::S_IFREG | libc::S_IFDIR => ClassTag::File,
            _ => ClassTag::Unkn,
        }
    }

    pub fn class(self) -> &'static FileClass {
        match self {
            ClassTag::File => &FILE_CLASS,
            ClassTag::Cdev => &CDEV_CLASS,
            ClassTag::Bdev => &BDEV_CLASS,
            ClassTag::Sock => &SOCK_CLASS,
            ClassTag::Fifo => &FIFO_CLASS,
            ClassTag::Unkn => &UNKN_CLASS,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Namespace links below `/proc/<pid>/ns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NsKind {
    Cgroup,
    Ipc,
    Mnt,
    Net,
    Pid,
    PidForChildren,
    Time,
    TimeForChildren,
    User,
    Uts,
}

impl NsKind {
    pub const ALL: [NsKind; 10] = [
        NsKind::Cgroup,
        NsKind::Ipc,
        NsKind::Mnt,
        NsKind::Net,
        NsKind::Pid,
        NsKind::PidForChildren,
        NsKind::Time,
        NsKind::TimeForChildren,
        NsKind::User,
        NsKind::Uts,
    ];

    pub fn link_name(self) -> &'static str {
        match self {
            NsKind::Cgroup => "ns/cgroup",
            NsKind::Ipc => "ns/ipc",
            NsKind::Mnt => "ns/mnt",
            NsKind::Net => "ns/net",
            NsKind::Pid => "ns/pid",
            NsKind::PidForChildren => "ns/pid_for_children",
            NsKind::Time => "ns/time",
            NsKind::TimeForChildren => "ns/time_for_children",
            NsKind::User => "ns/user",
            NsKind::Uts => "ns/uts",
        }
    }

    pub fn assoc_name(self) -> &'static str {
        match self {
            NsKind::Cgroup => "cgroup",
            NsKind::Ipc => "ipc",
            NsKind::Mnt => "mnt",
            NsKind::Net => "net",
            NsKind::Pid => "pid",
            NsKind::PidForChildren => "pid4c",
            NsKind::Time => "time",
            NsKind::TimeForChildren => "time4c",
            NsKind::User => "user",
            NsKind::Uts => "uts",
        }
    }
}

/// The role a resource plays for its process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Association {
    Fd(u64),
    Exe,
    Cwd,
    Root,
    /// Private file mapping.
    Mem,
    /// Shared file mapping.
    Shm,
    Ns(NsKind),
}

impl Association {
    pub fn fd(self) -> Option<u64> {
        match self {
            Association::Fd(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_mapping(self) -> bool {
        matches!(self, Association::Mem | Association::Shm)
    }
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Association::Fd(n) => write!(f, "{}", n),
            Association::Exe => f.write_str("exe"),
            Association::Cwd => f.write_str("cwd"),
            Association::Root => f.write_str("rtd"),
            Association::Mem => f.write_str("mem"),
            Association::Shm => f.write_str("shm"),
            Association::Ns(ns) => f.write_str(ns.assoc_name()),
        }
    }
}

/// Class specific payload filled by `initialize_content`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassContent {
    #[default]
    None,
    Socket {
        /// Id in [`ClassTables::protonames`].
        protoname: u64,
    },
}

/// A file-like resource held by a process.
#[derive(Debug, Clone)]
pub struct Resource {
    pub process: ProcessId,
    pub class: ClassTag,
    pub association: Association,
    /// Link target or mapped path, as the kernel reported it.
    pub name: PathBuf,
    pub stat: FileStat,
    /// Access mode override (user rwx bits).
    pub mode: u32,
    pub pos: u64,
    /// Open flags from fdinfo.
    pub flags: Option<u32>,
    pub mnt_id: Option<u64>,
    pub map_start: u64,
    pub map_end: u64,
    pub content: ClassContent,
}

impl Resource {
    /// Classifies a freshly stat'ed resource.
    pub fn new(process: ProcessId, stat: FileStat, name: PathBuf, association: Association) -> Self {
        Self {
            process,
            class: ClassTag::from_mode(stat.mode),
            association,
            name,
            stat,
            mode: 0,
            pos: 0,
            flags: None,
            mnt_id: None,
            map_start: 0,
            map_end: 0,
            content: ClassContent::None,
        }
    }

    /// Copy sharing class, name and stat snapshot, with its own association.
    pub fn clone_for(&self, association: Association) -> Self {
        Self {
            process: self.process,
            class: self.class,
            association,
            name: self.name.clone(),
            stat: self.stat,
            mode: 0,
            pos: 0,
            flags: None,
            mnt_id: None,
            map_start: 0,
            map_end: 0,
            content: ClassContent::None,
        }
    }
}

/// System tables owned by the classes, loaded by `initialize_class`.
#[derive(Debug, Default)]
pub struct ClassTables {
    pub chrdrv: HashMap<u64, String>,
    pub miscdev: HashMap<u64, String>,
    pub partitions: HashMap<u64, String>,
    pub protonames: NameManager,
}

/// Inputs available to `initialize_content`.
pub struct ContentContext<'a> {
    pub source: &'a dyn ProcSource,
    pub pid: i32,
    /// Link below the process directory the resource was read from.
    pub link: Option<&'a str>,
    pub tables: &'a mut ClassTables,
}

pub type FillColumnFn = fn(&RowContext<'_>, &Process, &Resource, Column) -> Option<CellValue>;
pub type HandleFdinfoFn = fn(&mut Resource, &str, &str) -> bool;
pub type InitializeContentFn = fn(&mut Resource, &mut ContentContext<'_>);
pub type FreeContentFn = fn(&mut Resource);
pub type InitializeClassFn = fn(&mut ClassTables, &dyn ProcSource);
pub type FinalizeClassFn = fn(&mut ClassTables);

/// Behavior table of a file class.
pub struct FileClass {
    pub name: &'static str,
    pub parent: Option<&'static FileClass>,
    /// Returns `None` to decline a column.
    pub fill_column: Option<FillColumnFn>,
    /// Returns `true` when the key was consumed.
    pub handle_fdinfo: Option<HandleFdinfoFn>,
    pub initialize_content: Option<InitializeContentFn>,
    pub free_content: Option<FreeContentFn>,
    pub initialize_class: Option<InitializeClassFn>,
    pub finalize_class: Option<FinalizeClassFn>,
}

impl fmt::Debug for FileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileClass")
            .field("name", &self.name)
            .field("parent", &self.parent.map(|p| p.name))
            .finish()
    }
}

/// Flattens a class and its ancestors, most specific first.
pub fn resolve_chain(class: &'static FileClass) -> Vec<&'static FileClass> {
    let mut chain = Vec::new();
    let mut next = Some(class);
    while let Some(c) = next {
        chain.push(c);
        next = c.parent;
    }
    chain
}

pub fn fill_column(
    chain: &[&'static FileClass],
    ctx: &RowContext<'_>,
    proc: &Process,
    file: &Resource,
    column: Column,
) -> Option<CellValue> {
    chain
        .iter()
        .filter_map(|c| c.fill_column)
        .find_map(|fill| fill(ctx, proc, file, column))
}

/// Offers one fdinfo pair to the chain. An exhausted chain leaves the pair
/// unconsumed.
pub fn dispatch_fdinfo(
    chain: &[&'static FileClass],
    file: &mut Resource,
    key: &str,
    value: &str,
) -> bool {
    chain
        .iter()
        .filter_map(|c| c.handle_fdinfo)
        .any(|handle| handle(file, key, value))
}

pub fn initialize_content(
    chain: &[&'static FileClass],
    file: &mut Resource,
    ctx: &mut ContentContext<'_>,
) {
    if let Some(init) = chain.iter().find_map(|c| c.initialize_content) {
        init(file, ctx);
    }
}

/// Runs every teardown hook of the chain.
pub fn free_content(chain: &[&'static FileClass], file: &mut Resource) {
    for free in chain.iter().filter_map(|c| c.free_content) {
        free(file);
    }
}

/// Per-tag behavior chains, resolved once at startup.
#[derive(Debug)]
pub struct ClassRegistry {
    chains: [Vec<&'static FileClass>; 6],
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            chains: ClassTag::ALL.map(|tag| resolve_chain(tag.class())),
        }
    }

    pub fn chain(&self, tag: ClassTag) -> &[&'static FileClass] {
        &self.chains[tag.index()]
    }

    pub fn initialize_classes(&self, tables: &mut ClassTables, source: &dyn ProcSource) {
        for tag in ClassTag::ALL {
            if let Some(init) = tag.class().initialize_class {
                init(tables, source);
            }
        }
    }

    pub fn finalize_classes(&self, tables: &mut ClassTables) {
        for tag in ClassTag::ALL {
            if let Some(finalize) = tag.class().finalize_class {
                finalize(tables);
            }
        }
    }
}
