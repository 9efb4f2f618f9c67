//! Process walking and resource collection.
//!
//! This module provides:
//! - `procfs`: the kernel access seam and its `/proc` implementation
//! - `scanner`: process and thread discovery
//! - `collector`: per-process resource collection
//! - `maps`: memory map parsing

pub mod collector;
pub mod maps;
pub mod procfs;
pub mod scanner;

pub use collector::{
    add_nodevs_for, collect_execve_file, collect_fd_files, collect_file_symlink,
    collect_fs_files, collect_mem_files, collect_namespace_files,
};
pub use maps::{parse_maps_line, MapEntry};
pub use procfs::{read_process_name, split_lines, ProcSource, ShareKind, Sharing, SysProcFs};
pub use scanner::{collect_processes, read_process};
