//! Fatal error types.
//!
//! Only unrecoverable conditions are represented here. A resource that
//! vanishes mid-scan or a malformed line in a kernel text file never becomes
//! an `LsfdError`; the collector logs it and moves on.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LsfdError {
    #[error("failed to open {}: {source}", path.display())]
    ProcessList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("too many columns are added via filter expression")]
    TooManyColumns,

    #[error("unknown column: {0}")]
    UnknownColumn(String),
}

pub type Result<T> = std::result::Result<T, LsfdError>;
