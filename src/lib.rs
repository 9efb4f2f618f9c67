//! lsfd library
//!
//! Lists the open file-like resources of every process (optionally every
//! thread) on a Linux system: descriptors, file-backed memory mappings, the
//! execution image, working and root directories and namespace handles.
//!
//! # Features
//!
//! - **Classification**: every resource is tagged with a file class (regular
//!   file, character device, block device, socket, fifo, unknown) whose
//!   behaviors fall back to a parent class
//! - **Deduplication**: a resource repeating the previous one is cloned
//!   instead of stat'ed again
//! - **Thread sharing**: thread categories shared with the leader (descriptor
//!   table, address space, fs information) are skipped
//! - **Pseudo filesystems**: device numbers with major 0 are resolved to the
//!   filesystem name found in `mountinfo`
//!
//! # Usage
//!
//! ```no_run
//! use lsfd::{Collection, ColumnSet, SysProcFs};
//!
//! let source = SysProcFs::default();
//! let columns = ColumnSet::defaults(false);
//! let mut collection = Collection::new(columns.threads());
//! collection.run(&source).expect("process list");
//!
//! for row in collection.rows(columns.columns()) {
//!     let cells: Vec<String> = row
//!         .iter()
//!         .map(|c| c.as_ref().map(ToString::to_string).unwrap_or_default())
//!         .collect();
//!     println!("{}", cells.join(" "));
//! }
//! collection.finish();
//! ```

pub mod collectors;
pub mod column;
pub mod error;
pub mod file;
pub mod names;
pub mod nodev;
pub mod output;
pub mod process;
pub mod state;

// Re-export main types for convenience
pub use column::{column_name_to_id, CellValue, Column, ColumnSet};
pub use error::{LsfdError, Result};
pub use file::{Association, ClassTag, FileStat, NsKind, Resource};
pub use names::NameManager;
pub use nodev::NodevTable;
pub use output::{OutputFormat, Renderer};
pub use process::{ProcSource, ShareKind, Sharing, SysProcFs};
pub use state::{Collection, Process, ProcessId, ResourceId};
