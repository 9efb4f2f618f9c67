//! The root class: regular files, directories and symlinks.
//!
//! Every other class falls back to this one, so it answers all columns that
//! only need the process, the association and the stat snapshot.

use super::{FileClass, Resource};
use crate::column::{CellValue, Column, RowContext};
use crate::state::Process;
use nix::sys::stat::{major, minor};

pub static FILE_CLASS: FileClass = FileClass {
    name: "file",
    parent: None,
    fill_column: Some(file_fill_column),
    handle_fdinfo: Some(file_handle_fdinfo),
    initialize_content: None,
    free_content: None,
    initialize_class: None,
    finalize_class: None,
};

// Some 64-bit targets define O_LARGEFILE as 0 although the kernel still
// sets its asm-generic bit on every open.
const O_LARGEFILE: u32 = if libc::O_LARGEFILE == 0 {
    0o100000
} else {
    libc::O_LARGEFILE as u32
};
const O_DSYNC: u32 = libc::O_DSYNC as u32;
const O_DIRECTORY: u32 = libc::O_DIRECTORY as u32;
const O_SYNC: u32 = libc::O_SYNC as u32;
const O_TMPFILE: u32 = libc::O_TMPFILE as u32;

/// Open flags as reported in fdinfo, in the order they are printed. The
/// access mode bits are shown by MODE and skipped here.
const OPEN_FLAGS: &[(u32, &str)] = &[
    (libc::O_CREAT as u32, "creat"),
    (libc::O_EXCL as u32, "excl"),
    (libc::O_NOCTTY as u32, "noctty"),
    (libc::O_TRUNC as u32, "trunc"),
    (libc::O_APPEND as u32, "append"),
    (libc::O_NONBLOCK as u32, "nonblock"),
    (O_DSYNC, "dsync"),
    (libc::O_ASYNC as u32, "async"),
    (libc::O_DIRECT as u32, "direct"),
    (O_LARGEFILE, "largefile"),
    (O_DIRECTORY, "directory"),
    (libc::O_NOFOLLOW as u32, "nofollow"),
    (libc::O_NOATIME as u32, "noatime"),
    (libc::O_CLOEXEC as u32, "cloexec"),
    (O_SYNC, "sync"),
    (libc::O_PATH as u32, "path"),
    (O_TMPFILE, "tmpfile"),
];

/// Decodes fdinfo `flags` into comma separated names. `sync` carries the
/// `dsync` bit and `tmpfile` the `directory` bit; the implied names are
/// elided.
pub fn decode_flags(flags: u32) -> String {
    let sync = flags & O_SYNC == O_SYNC;
    let tmpfile = flags & O_TMPFILE == O_TMPFILE;

    OPEN_FLAGS
        .iter()
        .filter(|&&(bit, _)| flags & bit == bit)
        .filter(|&&(bit, _)| !(sync && bit == O_DSYNC) && !(tmpfile && bit == O_DIRECTORY))
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn format_majmin(dev: u64) -> String {
    format!("{}:{}", major(dev), minor(dev))
}

/// `rwx` view of the user permission bits.
pub fn format_mode(mode: u32) -> String {
    let bit = |mask: u32, c: char| if mode & mask != 0 { c } else { '-' };
    [
        bit(libc::S_IRUSR, 'r'),
        bit(libc::S_IWUSR, 'w'),
        bit(libc::S_IXUSR, 'x'),
    ]
    .iter()
    .collect()
}

pub fn type_name(mode: u32) -> &'static str {
    match mode & libc::S_IFMT {
        libc::S_IFREG => "REG",
        libc::S_IFDIR => "DIR",
        libc::S_IFLNK => "LINK",
        libc::S_IFCHR => "CHR",
        libc::S_IFBLK => "BLK",
        libc::S_IFIFO => "FIFO",
        libc::S_IFSOCK => "SOCK",
        _ => "UNKN",
    }
}

/// Filesystem, partition or device number holding `dev`.
pub fn source_of(ctx: &RowContext<'_>, dev: u64) -> String {
    if major(dev) == 0 {
        if let Some(fs) = ctx.nodevs.lookup(minor(dev)) {
            return fs.to_string();
        }
    }
    partition_of(ctx, dev)
}

pub fn partition_of(ctx: &RowContext<'_>, dev: u64) -> String {
    ctx.tables
        .partitions
        .get(&dev)
        .cloned()
        .unwrap_or_else(|| format_majmin(dev))
}

fn file_fill_column(
    ctx: &RowContext<'_>,
    proc: &Process,
    file: &Resource,
    column: Column,
) -> Option<CellValue> {
    let value = match column {
        Column::Command => proc.command.as_str().into(),
        Column::Pid => (ctx.leader_pid(proc) as u64).into(),
        Column::Tid => (proc.pid as u64).into(),
        Column::Uid => u64::from(proc.uid).into(),
        Column::User => ctx
            .users
            .get(&proc.uid)
            .cloned()
            .unwrap_or_else(|| proc.uid.to_string())
            .into(),
        Column::Assoc => file.association.to_string().into(),
        Column::Fd => file.association.fd()?.into(),
        Column::Name => file.name.to_string_lossy().into_owned().into(),
        Column::Type => type_name(file.stat.mode).into(),
        Column::Deleted => (file.stat.nlink == 0).into(),
        Column::Dev | Column::MajMin => format_majmin(file.stat.dev).into(),
        Column::Rdev => format_majmin(file.stat.rdev).into(),
        Column::Devtype if major(file.stat.dev) == 0 => "nodev".into(),
        Column::Inode => file.stat.ino.into(),
        Column::Nlink => file.stat.nlink.into(),
        Column::Size => file.stat.size.into(),
        Column::Mode => format_mode(file.mode).into(),
        Column::Flags => decode_flags(file.flags?).into(),
        Column::MntId => file.mnt_id?.into(),
        Column::Pos if file.association.fd().is_some() || file.association.is_mapping() => {
            file.pos.into()
        }
        Column::Maplen if file.association.is_mapping() => {
            (file.map_end.saturating_sub(file.map_start) / ctx.page_size.max(1)).into()
        }
        Column::Source => source_of(ctx, file.stat.dev).into(),
        Column::Partition => partition_of(ctx, file.stat.dev).into(),
        _ => return None,
    };
    Some(value)
}

fn file_handle_fdinfo(file: &mut Resource, key: &str, value: &str) -> bool {
    match key {
        "pos" => {
            if let Ok(pos) = value.parse() {
                file.pos = pos;
            }
            true
        }
        "flags" => {
            file.flags = u32::from_str_radix(value, 8).ok();
            true
        }
        "mnt_id" => {
            file.mnt_id = value.parse().ok();
            true
        }
        _ => false,
    }
}
