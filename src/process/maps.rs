//! Parser for `/proc/<pid>/maps`.
//!
//! Line format: `start-end perms offset major:minor inode path`, with
//! start, end, offset, major and minor in hex and inode in decimal.
//! Anonymous mappings (no path) carry no file and are skipped.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// One file-backed mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub start: u64,
    pub end: u64,
    pub read: bool,
    pub write: bool,
    pub exec: bool,
    pub shared: bool,
    pub offset: u64,
    pub major: u64,
    pub minor: u64,
    pub inode: u64,
    pub path: PathBuf,
}

impl MapEntry {
    /// User rwx bits for the mode override.
    pub fn mode(&self) -> u32 {
        let mut mode = 0;
        if self.read {
            mode |= libc::S_IRUSR;
        }
        if self.write {
            mode |= libc::S_IWUSR;
        }
        if self.exec {
            mode |= libc::S_IXUSR;
        }
        mode
    }
}

/// Parses one maps line. Returns `None` for anonymous mappings and for
/// lines that do not follow the grammar.
///
/// The numeric fields are ASCII; the path is kept byte for byte.
pub fn parse_maps_line(line: &[u8]) -> Option<MapEntry> {
    // Paths may contain spaces, so the path is everything from the first
    // slash on.
    let slash = line.iter().position(|&b| b == b'/')?;
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(slash, |i| i + 1);
    let path = &line[slash..end];
    let mut fields = std::str::from_utf8(&line[..slash]).ok()?.split_whitespace();

    let (start, end) = fields.next()?.split_once('-')?;
    let perms = fields.next()?.as_bytes();
    let offset = fields.next()?;
    let (major, minor) = fields.next()?.split_once(':')?;
    let inode = fields.next()?;
    if perms.len() != 4 || fields.next().is_some() {
        return None;
    }

    Some(MapEntry {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        read: perms[0] == b'r',
        write: perms[1] == b'w',
        exec: perms[2] == b'x',
        shared: perms[3] == b's',
        offset: u64::from_str_radix(offset, 16).ok()?,
        major: u64::from_str_radix(major, 16).ok()?,
        minor: u64::from_str_radix(minor, 16).ok()?,
        inode: inode.parse().ok()?,
        path: PathBuf::from(OsStr::from_bytes(path)),
    })
}
