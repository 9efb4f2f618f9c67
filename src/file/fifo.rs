//! Pipes and named FIFOs.

use super::generic::FILE_CLASS;
use super::{FileClass, Resource};
use crate::column::{CellValue, Column, RowContext};
use crate::state::Process;
use nix::sys::stat::{major, minor};

pub static FIFO_CLASS: FileClass = FileClass {
    name: "fifo",
    parent: Some(&FILE_CLASS),
    fill_column: Some(fifo_fill_column),
    handle_fdinfo: None,
    initialize_content: None,
    free_content: None,
    initialize_class: None,
    finalize_class: None,
};

fn fifo_fill_column(
    ctx: &RowContext<'_>,
    _proc: &Process,
    file: &Resource,
    column: Column,
) -> Option<CellValue> {
    let dev = file.stat.dev;
    // Anonymous pipes live on the internal pipefs mount, which never shows
    // up in mountinfo.
    if column == Column::Source && major(dev) == 0 && ctx.nodevs.lookup(minor(dev)).is_none() {
        return Some("pipefs".into());
    }
    None
}
