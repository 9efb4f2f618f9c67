//! Minor device number to pseudo filesystem name table.
//!
//! Filesystems without a backing block device (proc, sysfs, tmpfs, overlay,
//! ...) report a device id with major 0. The table maps the minor number to
//! the filesystem type found in `/proc/<pid>/mountinfo`.

use ahash::AHashMap as HashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::process::split_lines;

/// `23 61 0:22 / /sys rw,nosuid shared:2 - sysfs sysfs rw`
static MOUNTINFO_WITH_OPTIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d+\s+\d+\s+(\d+):(\d+)\s+\S+\s+\S+\s+\S+\s+[^-\s][^-]*-\s+(\S+)")
        .expect("mountinfo regex")
});

/// `1600 1458 0:55 / / rw,nodev,relatime - overlay overlay rw`
static MOUNTINFO_PLAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d+\s+\d+\s+(\d+):(\d+)\s+\S+\s+\S+\s+\S+\s+-\s+(\S+)")
        .expect("mountinfo regex")
});

#[derive(Debug, Default, Clone)]
pub struct NodevTable {
    filesystems: HashMap<u64, String>,
}

/// Extracts `(major, minor, fstype)` from one mountinfo line.
pub fn parse_mountinfo_line(line: &str) -> Option<(u64, u64, &str)> {
    let caps = MOUNTINFO_WITH_OPTIONAL
        .captures(line)
        .or_else(|| MOUNTINFO_PLAIN.captures(line))?;

    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let fstype = caps.get(3)?.as_str();
    Some((major, minor, fstype))
}

impl NodevTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every major-0 mount of a mount table. Lines that match
    /// neither mountinfo layout are skipped; the first name seen for a minor
    /// is kept. Mount points are raw bytes; each line is decoded on its own.
    pub fn add_from_mount_table(&mut self, content: &[u8]) {
        for line in split_lines(content) {
            let line = String::from_utf8_lossy(line);
            let Some((major, minor, fstype)) = parse_mountinfo_line(&line) else {
                continue;
            };
            if major != 0 {
                continue;
            }
            self.filesystems
                .entry(minor)
                .or_insert_with(|| fstype.to_string());
        }
    }

    pub fn lookup(&self, minor: u64) -> Option<&str> {
        self.filesystems.get(&minor).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.filesystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filesystems.is_empty()
    }

    pub fn clear(&mut self) {
        self.filesystems.clear();
    }
}
