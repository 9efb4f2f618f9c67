//! Block devices.

use super::generic::{format_majmin, partition_of, FILE_CLASS};
use super::{ClassTables, FileClass, Resource};
use crate::collectors::parse_partitions;
use crate::column::{CellValue, Column, RowContext};
use crate::process::ProcSource;
use crate::state::Process;
use tracing::debug;

pub static BDEV_CLASS: FileClass = FileClass {
    name: "bdev",
    parent: Some(&FILE_CLASS),
    fill_column: Some(bdev_fill_column),
    handle_fdinfo: None,
    initialize_content: None,
    free_content: None,
    initialize_class: Some(bdev_initialize_class),
    finalize_class: Some(bdev_finalize_class),
};

fn bdev_fill_column(
    ctx: &RowContext<'_>,
    _proc: &Process,
    file: &Resource,
    column: Column,
) -> Option<CellValue> {
    let rdev = file.stat.rdev;
    let value = match column {
        Column::Partition | Column::Source => partition_of(ctx, rdev).into(),
        Column::MajMin => format_majmin(rdev).into(),
        Column::Devtype => "blk".into(),
        _ => return None,
    };
    Some(value)
}

fn bdev_initialize_class(tables: &mut ClassTables, source: &dyn ProcSource) {
    match source.read_system_file("partitions") {
        Ok(text) => {
            tables.partitions = parse_partitions(&text);
            debug!("loaded {} partitions", tables.partitions.len());
        }
        Err(e) => debug!("cannot read partitions table: {}", e),
    }
}

fn bdev_finalize_class(tables: &mut ClassTables) {
    tables.partitions.clear();
}
