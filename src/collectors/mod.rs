//! Collectors module for system-wide device tables.
//!
//! These tables are read once per run by the file class initialization hooks
//! and resolve device numbers into human readable names.

pub mod devices;
pub mod partitions;

pub use devices::{parse_chrdrv, parse_miscdev, MISC_MAJOR};
pub use partitions::parse_partitions;
