//! Character devices.

use super::generic::{format_majmin, FILE_CLASS};
use super::{ClassTables, FileClass, Resource};
use crate::collectors::{parse_chrdrv, parse_miscdev, MISC_MAJOR};
use crate::column::{CellValue, Column, RowContext};
use crate::process::ProcSource;
use crate::state::Process;
use nix::sys::stat::{major, minor};
use tracing::debug;

pub static CDEV_CLASS: FileClass = FileClass {
    name: "cdev",
    parent: Some(&FILE_CLASS),
    fill_column: Some(cdev_fill_column),
    handle_fdinfo: None,
    initialize_content: None,
    free_content: None,
    initialize_class: Some(cdev_initialize_class),
    finalize_class: Some(cdev_finalize_class),
};

fn miscdev_name<'a>(ctx: &'a RowContext<'_>, rdev: u64) -> Option<&'a str> {
    if major(rdev) != MISC_MAJOR {
        return None;
    }
    ctx.tables.miscdev.get(&minor(rdev)).map(String::as_str)
}

fn cdev_fill_column(
    ctx: &RowContext<'_>,
    _proc: &Process,
    file: &Resource,
    column: Column,
) -> Option<CellValue> {
    let rdev = file.stat.rdev;
    let value = match column {
        Column::Chrdrv => ctx
            .tables
            .chrdrv
            .get(&major(rdev))
            .cloned()
            .unwrap_or_else(|| major(rdev).to_string())
            .into(),
        Column::Miscdev => miscdev_name(ctx, rdev)?.into(),
        Column::Source => {
            if let Some(misc) = miscdev_name(ctx, rdev) {
                format!("misc:{}", misc).into()
            } else if let Some(drv) = ctx.tables.chrdrv.get(&major(rdev)) {
                format!("{}:{}", drv, minor(rdev)).into()
            } else {
                format_majmin(rdev).into()
            }
        }
        Column::MajMin => format_majmin(rdev).into(),
        Column::Devtype => "char".into(),
        _ => return None,
    };
    Some(value)
}

fn cdev_initialize_class(tables: &mut ClassTables, source: &dyn ProcSource) {
    match source.read_system_file("devices") {
        Ok(text) => tables.chrdrv = parse_chrdrv(&text),
        Err(e) => debug!("cannot read devices table: {}", e),
    }
    match source.read_system_file("misc") {
        Ok(text) => tables.miscdev = parse_miscdev(&text),
        Err(e) => debug!("cannot read misc table: {}", e),
    }
    debug!(
        "loaded {} character drivers, {} misc devices",
        tables.chrdrv.len(),
        tables.miscdev.len()
    );
}

fn cdev_finalize_class(tables: &mut ClassTables) {
    tables.chrdrv.clear();
    tables.miscdev.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{Association, FileStat};
    use crate::nodev::NodevTable;
    use ahash::AHashMap as HashMap;
    use nix::sys::stat::makedev;

    fn process() -> Process {
        Process {
            pid: 1,
            leader: 0,
            command: "init".into(),
            uid: 0,
            ns_mnt: 0,
            files: Vec::new(),
        }
    }

    fn tables() -> ClassTables {
        let mut tables = ClassTables::default();
        tables.chrdrv.insert(1, "mem".into());
        tables.chrdrv.insert(MISC_MAJOR, "misc".into());
        tables.miscdev.insert(229, "fuse".into());
        tables
    }

    fn fill(tables: &ClassTables, rdev: u64, column: Column) -> Option<CellValue> {
        let nodevs = NodevTable::new();
        let users = HashMap::new();
        let procs = [process()];
        let ctx = RowContext {
            processes: &procs,
            tables,
            nodevs: &nodevs,
            users: &users,
            page_size: 4096,
        };
        let stat = FileStat {
            mode: libc::S_IFCHR | 0o666,
            rdev,
            ..Default::default()
        };
        let file = Resource::new(0, stat, "/dev/x".into(), Association::Fd(0));
        cdev_fill_column(&ctx, &procs[0], &file, column)
    }

    #[test]
    fn test_source_prefers_misc_name() {
        let tables = tables();
        assert_eq!(
            fill(&tables, makedev(10, 229), Column::Source),
            Some("misc:fuse".into())
        );
        assert_eq!(
            fill(&tables, makedev(1, 3), Column::Source),
            Some("mem:3".into())
        );
        assert_eq!(
            fill(&tables, makedev(240, 0), Column::Source),
            Some("240:0".into())
        );
    }

    #[test]
    fn test_chrdrv_and_miscdev() {
        let tables = tables();
        assert_eq!(
            fill(&tables, makedev(1, 3), Column::Chrdrv),
            Some("mem".into())
        );
        assert_eq!(
            fill(&tables, makedev(240, 0), Column::Chrdrv),
            Some("240".into())
        );
        assert_eq!(fill(&tables, makedev(1, 3), Column::Miscdev), None);
        assert_eq!(
            fill(&tables, makedev(10, 229), Column::Miscdev),
            Some("fuse".into())
        );
    }

    #[test]
    fn test_device_columns_use_rdev() {
        let tables = tables();
        assert_eq!(
            fill(&tables, makedev(1, 3), Column::MajMin),
            Some("1:3".into())
        );
        assert_eq!(
            fill(&tables, makedev(1, 3), Column::Devtype),
            Some("char".into())
        );
        assert_eq!(fill(&tables, makedev(1, 3), Column::Name), None);
    }
}
