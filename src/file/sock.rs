//! Sockets.
//!
//! The protocol name comes from the `system.sockprotoname` attribute of the
//! descriptor link and is interned in [`ClassTables::protonames`], so rows
//! of the same protocol share one string.

use super::generic::FILE_CLASS;
use super::{ClassContent, ClassTables, ContentContext, FileClass, Resource};
use crate::column::{CellValue, Column, RowContext};
use crate::names::NameManager;
use crate::process::ProcSource;
use crate::state::Process;

pub static SOCK_CLASS: FileClass = FileClass {
    name: "sock",
    parent: Some(&FILE_CLASS),
    fill_column: Some(sock_fill_column),
    handle_fdinfo: None,
    initialize_content: Some(sock_initialize_content),
    free_content: Some(sock_free_content),
    initialize_class: Some(sock_initialize_class),
    finalize_class: Some(sock_finalize_class),
};

fn sock_fill_column(
    ctx: &RowContext<'_>,
    _proc: &Process,
    file: &Resource,
    column: Column,
) -> Option<CellValue> {
    match (column, file.content) {
        (Column::Protoname, ClassContent::Socket { protoname }) => {
            ctx.tables.protonames.get(protoname).map(CellValue::from)
        }
        _ => None,
    }
}

fn sock_initialize_content(file: &mut Resource, ctx: &mut ContentContext<'_>) {
    let Some(link) = ctx.link else {
        return;
    };
    if let Some(proto) = ctx.source.socket_protocol(ctx.pid, link) {
        let id = ctx.tables.protonames.add(&proto);
        file.content = ClassContent::Socket { protoname: id };
    }
}

fn sock_free_content(file: &mut Resource) {
    file.content = ClassContent::None;
}

fn sock_initialize_class(tables: &mut ClassTables, _source: &dyn ProcSource) {
    tables.protonames = NameManager::new();
}

fn sock_finalize_class(tables: &mut ClassTables) {
    tables.protonames = NameManager::new();
}
