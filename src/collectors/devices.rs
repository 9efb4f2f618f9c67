//! Character device driver tables.
//!
//! This module parses `/proc/devices` (character section, major → driver
//! name) and `/proc/misc` (misc minor → device name). Both tables are loaded
//! once per run by the character device class.

use ahash::AHashMap as HashMap;

/// Major number shared by every misc character device.
pub const MISC_MAJOR: u64 = 10;

/// Parses the "Character devices:" section of `/proc/devices`.
///
/// Format: "Character devices:\n  1 mem\n  4 tty\n\nBlock devices:\n..."
/// When several drivers share a major the first one listed is kept.
pub fn parse_chrdrv(content: &str) -> HashMap<u64, String> {
    let mut drivers = HashMap::new();
    let mut in_char_section = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.ends_with(':') {
            in_char_section = trimmed == "Character devices:";
            continue;
        }
        if !in_char_section {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let (Some(major), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(major) = major.parse::<u64>() else {
            continue;
        };
        drivers.entry(major).or_insert_with(|| name.to_string());
    }

    drivers
}

/// Parses `/proc/misc`. Format: " 62 rfkill"
pub fn parse_miscdev(content: &str) -> HashMap<u64, String> {
    let mut devices = HashMap::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(minor), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        if let Ok(minor) = minor.parse::<u64>() {
            devices.entry(minor).or_insert_with(|| name.to_string());
        }
    }

    devices
}
