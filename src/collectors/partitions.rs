//! Block partition table.
//!
//! This module reads `/proc/partitions` and maps device numbers to partition
//! names. It backs the PARTITION and SOURCE columns of block devices and of
//! regular files living on a block device.

use ahash::AHashMap as HashMap;
use nix::sys::stat::makedev;

/// Parses `/proc/partitions`.
///
/// Format: "major minor  #blocks  name", one header line, blank separator.
pub fn parse_partitions(content: &str) -> HashMap<u64, String> {
    let mut partitions = HashMap::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue; // header, blank or malformed
        }

        let (Ok(major), Ok(minor)) = (parts[0].parse::<u64>(), parts[1].parse::<u64>()) else {
            continue;
        };

        partitions.insert(makedev(major, minor), parts[3].to_string());
    }

    partitions
}
