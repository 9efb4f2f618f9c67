//! Output column catalogue and per-row filling.
//!
//! This module exposes what the filter and rendering collaborators need from
//! the core: name to column lookup, a callback that materializes additional
//! columns, and the fill operation that turns a resource into cell values by
//! walking its class chain.

use crate::error::{LsfdError, Result};
use crate::file::{self, ClassRegistry, ClassTables, Resource};
use crate::nodev::NodevTable;
use crate::state::Process;
use ahash::AHashMap as HashMap;
use serde_json::Value;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Assoc,
    Chrdrv,
    Command,
    Deleted,
    Dev,
    Devtype,
    Flags,
    Fd,
    Inode,
    MajMin,
    Maplen,
    Miscdev,
    MntId,
    Mode,
    Name,
    Nlink,
    Pid,
    Partition,
    Pos,
    Protoname,
    Rdev,
    Size,
    Source,
    Tid,
    Type,
    Uid,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Boolean,
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JsonType::String => "<string>",
            JsonType::Number => "<number>",
            JsonType::Boolean => "<boolean>",
        })
    }
}

/// Static description of a column.
#[derive(Debug)]
pub struct ColumnInfo {
    pub name: &'static str,
    pub json_type: JsonType,
    /// Long free-form text that the table sink may truncate.
    pub truncate: bool,
    pub help: &'static str,
}

const fn info(
    name: &'static str,
    json_type: JsonType,
    truncate: bool,
    help: &'static str,
) -> ColumnInfo {
    ColumnInfo {
        name,
        json_type,
        truncate,
        help,
    }
}

// Indexed by `Column as usize`.
static COLUMN_INFOS: [ColumnInfo; 27] = [
    info("ASSOC", JsonType::String, false, "association between file and process"),
    info("CHRDRV", JsonType::String, false, "character device driver name resolved by /proc/devices"),
    info("COMMAND", JsonType::String, true, "command of the process opening the file"),
    info("DELETED", JsonType::Boolean, false, "reachability from the file system"),
    info("DEV", JsonType::String, false, "ID of device containing file"),
    info("DEVTYPE", JsonType::String, false, "device type (blk, char, or nodev)"),
    info("FLAGS", JsonType::String, false, "flags specified when opening the file"),
    info("FD", JsonType::Number, false, "file descriptor for the file"),
    info("INODE", JsonType::Number, false, "inode number"),
    info("MAJ:MIN", JsonType::String, false, "device ID for special, or ID of device containing file"),
    info("MAPLEN", JsonType::Number, false, "length of file mapping (in page)"),
    info("MISCDEV", JsonType::String, false, "misc character device name resolved by /proc/misc"),
    info("MNTID", JsonType::Number, false, "mount id"),
    info("MODE", JsonType::String, false, "access mode (rwx)"),
    info("NAME", JsonType::String, true, "name of the file"),
    info("NLINK", JsonType::Number, false, "link count"),
    info("PID", JsonType::Number, false, "PID of the process opening the file"),
    info("PARTITION", JsonType::String, false, "block device name resolved by /proc/partition"),
    info("POS", JsonType::Number, false, "file position"),
    info("PROTONAME", JsonType::String, false, "protocol name"),
    info("RDEV", JsonType::String, false, "device ID (if special file)"),
    info("SIZE", JsonType::Number, false, "file size"),
    info("SOURCE", JsonType::String, false, "file system, partition, or device containing file"),
    info("TID", JsonType::Number, false, "thread ID of the process opening the file"),
    info("TYPE", JsonType::String, false, "file type"),
    info("UID", JsonType::Number, false, "user ID number"),
    info("USER", JsonType::String, false, "user of the process"),
];

impl Column {
    pub const ALL: [Column; 27] = [
        Column::Assoc,
        Column::Chrdrv,
        Column::Command,
        Column::Deleted,
        Column::Dev,
        Column::Devtype,
        Column::Flags,
        Column::Fd,
        Column::Inode,
        Column::MajMin,
        Column::Maplen,
        Column::Miscdev,
        Column::MntId,
        Column::Mode,
        Column::Name,
        Column::Nlink,
        Column::Pid,
        Column::Partition,
        Column::Pos,
        Column::Protoname,
        Column::Rdev,
        Column::Size,
        Column::Source,
        Column::Tid,
        Column::Type,
        Column::Uid,
        Column::User,
    ];

    pub fn info(self) -> &'static ColumnInfo {
        &COLUMN_INFOS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn json_type(self) -> JsonType {
        self.info().json_type
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

/// Name to column lookup for the filter collaborator. Unknown names are
/// reported and yield `None`.
pub fn column_name_to_id(name: &str) -> Option<Column> {
    let col = Column::from_name(name);
    if col.is_none() {
        warn!("unknown column: {}", name);
    }
    col
}

pub const DEFAULT_COLUMNS: &[Column] = &[
    Column::Command,
    Column::Pid,
    Column::User,
    Column::Assoc,
    Column::Mode,
    Column::Type,
    Column::Source,
    Column::MntId,
    Column::Inode,
    Column::Name,
];

pub const DEFAULT_THREADS_COLUMNS: &[Column] = &[
    Column::Command,
    Column::Pid,
    Column::Tid,
    Column::User,
    Column::Assoc,
    Column::Mode,
    Column::Type,
    Column::Source,
    Column::MntId,
    Column::Inode,
    Column::Name,
];

/// Maximum number of materialized columns, duplicates included.
pub const MAX_COLUMNS: usize = Column::ALL.len() * 2;

/// A filled cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Str(String),
    Num(u64),
    Bool(bool),
}

impl CellValue {
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Str(s) => Value::String(s.clone()),
            CellValue::Num(n) => Value::from(*n),
            CellValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Str(s) => f.write_str(s),
            CellValue::Num(n) => write!(f, "{}", n),
            CellValue::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Str(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Str(s.to_string())
    }
}

impl From<u64> for CellValue {
    fn from(n: u64) -> Self {
        CellValue::Num(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// The columns to materialize for one run.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    columns: Vec<Column>,
    threads: bool,
}

impl ColumnSet {
    pub fn defaults(threads: bool) -> Self {
        let columns = if threads {
            DEFAULT_THREADS_COLUMNS
        } else {
            DEFAULT_COLUMNS
        };
        Self {
            columns: columns.to_vec(),
            threads,
        }
    }

    /// Builds a set from a comma separated list. A leading `+` appends the
    /// list to the defaults.
    pub fn from_list(list: &str, threads: bool) -> Result<Self> {
        let (mut set, list) = match list.strip_prefix('+') {
            Some(rest) => (Self::defaults(threads), rest),
            None => (
                Self {
                    columns: Vec::new(),
                    threads,
                },
                list,
            ),
        };

        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let col =
                column_name_to_id(name).ok_or_else(|| LsfdError::UnknownColumn(name.into()))?;
            set.add_column_by_id(col)?;
        }
        Ok(set)
    }

    /// Materializes one more column, e.g. one referenced only by a filter
    /// expression. Asking for TID switches thread-level collection on.
    pub fn add_column_by_id(&mut self, column: Column) -> Result<usize> {
        if self.columns.len() >= MAX_COLUMNS {
            return Err(LsfdError::TooManyColumns);
        }
        self.columns.push(column);
        if column == Column::Tid {
            self.threads = true;
        }
        Ok(self.columns.len() - 1)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn threads(&self) -> bool {
        self.threads
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Read-only state the fill behaviors may consult.
pub struct RowContext<'a> {
    pub processes: &'a [Process],
    pub tables: &'a ClassTables,
    pub nodevs: &'a NodevTable,
    pub users: &'a HashMap<u32, String>,
    pub page_size: u64,
}

impl RowContext<'_> {
    pub fn leader_pid(&self, proc: &Process) -> i32 {
        self.processes
            .get(proc.leader)
            .map(|l| l.pid)
            .unwrap_or(proc.pid)
    }
}

/// Fills every requested column of one resource. Columns declined by the
/// whole class chain stay empty.
pub fn fill_row(
    registry: &ClassRegistry,
    ctx: &RowContext<'_>,
    proc: &Process,
    resource: &Resource,
    columns: &[Column],
) -> Vec<Option<CellValue>> {
    let chain = registry.chain(resource.class);
    columns
        .iter()
        .map(|&col| file::fill_column(chain, ctx, proc, resource, col))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_is_indexed_by_column() {
        for col in Column::ALL {
            assert_eq!(Column::from_name(col.name()), Some(col));
        }
        assert_eq!(Column::MajMin.name(), "MAJ:MIN");
        assert_eq!(Column::Deleted.json_type(), JsonType::Boolean);
        assert_eq!(Column::Fd.json_type(), JsonType::Number);
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        assert_eq!(Column::from_name("inode"), Some(Column::Inode));
        assert_eq!(Column::from_name("Maj:Min"), Some(Column::MajMin));
        assert_eq!(column_name_to_id("nosuch"), None);
        assert_eq!(Column::from_name("INOD"), None);
    }

    #[test]
    fn test_adding_tid_enables_threads() {
        let mut set = ColumnSet::defaults(false);
        assert!(!set.threads());
        let idx = set.add_column_by_id(Column::Tid).expect("room for a column");
        assert_eq!(idx, DEFAULT_COLUMNS.len());
        assert!(set.threads());
    }

    #[test]
    fn test_too_many_columns() {
        let mut set = ColumnSet::from_list("FD", false).expect("valid list");
        for _ in 1..MAX_COLUMNS {
            set.add_column_by_id(Column::Name).expect("below the limit");
        }
        assert!(matches!(
            set.add_column_by_id(Column::Name),
            Err(LsfdError::TooManyColumns)
        ));
    }

    #[test]
    fn test_from_list() {
        let set = ColumnSet::from_list("pid, fd,NAME", false).expect("valid list");
        assert_eq!(set.columns(), &[Column::Pid, Column::Fd, Column::Name]);

        let set = ColumnSet::from_list("+POS", false).expect("valid list");
        assert_eq!(set.len(), DEFAULT_COLUMNS.len() + 1);
        assert_eq!(set.columns().last(), Some(&Column::Pos));

        assert!(matches!(
            ColumnSet::from_list("PID,BOGUS", false),
            Err(LsfdError::UnknownColumn(name)) if name == "BOGUS"
        ));
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(CellValue::from(42u64).to_string(), "42");
        assert_eq!(CellValue::from(true).to_string(), "1");
        assert_eq!(CellValue::from("x").to_json(), Value::String("x".into()));
        assert_eq!(CellValue::from(7u64).to_json(), Value::from(7u64));
    }
}
