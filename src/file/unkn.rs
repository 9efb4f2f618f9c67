//! Files whose type matches no other class, typically anonymous inodes
//! such as eventfd, epoll or signalfd descriptors.

use super::generic::FILE_CLASS;
use super::{FileClass, Resource};
use crate::column::{CellValue, Column, RowContext};
use crate::state::Process;
use std::os::unix::ffi::OsStrExt;

pub static UNKN_CLASS: FileClass = FileClass {
    name: "unkn",
    parent: Some(&FILE_CLASS),
    fill_column: Some(unkn_fill_column),
    handle_fdinfo: None,
    initialize_content: None,
    free_content: None,
    initialize_class: None,
    finalize_class: None,
};

fn unkn_fill_column(
    _ctx: &RowContext<'_>,
    _proc: &Process,
    file: &Resource,
    column: Column,
) -> Option<CellValue> {
    match column {
        Column::Type => Some("UNKN".into()),
        Column::Source if file.name.as_os_str().as_bytes().starts_with(b"anon_inode:") => {
            Some("anon_inodefs".into())
        }
        _ => None,
    }
}
