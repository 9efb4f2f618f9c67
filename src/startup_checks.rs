//! Runtime requirement validation for lsfd.
//!
//! This module checks that lsfd can see what it is asked to list: the
//! process list, other users' descriptor tables and the kernel's resource
//! comparison syscall used to skip threads sharing their leader's files.

use nix::unistd::geteuid;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use lsfd::{ProcSource, ShareKind, Sharing, SysProcFs};

/// Validate all runtime requirements
pub fn validate_requirements(sysroot: Option<&Path>) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    let source = SysProcFs::new(sysroot);
    check_user_privileges();
    check_proc_access(&source)?;
    check_fd_access(&source);
    check_kcmp(&source);

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - descriptors of other users' processes will be missing");
        warn!("   Recommendation: run as root or grant cap_sys_ptrace,cap_dac_read_search");
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

/// Check that the process list can be read
fn check_proc_access(source: &SysProcFs) -> Result<(), ValidationError> {
    match source.pids() {
        Ok(pids) if pids.is_empty() => {
            error!("❌ {} lists no processes", source.proc_root().display());
            Err(ValidationError::NoProcesses(source.proc_root().display().to_string()))
        }
        Ok(pids) => {
            info!("✅ Process list readable ({} processes)", pids.len());
            Ok(())
        }
        Err(e) => {
            error!("❌ {}", e);
            Err(ValidationError::ProcUnreadable(e.to_string()))
        }
    }
}

/// Check descriptor table access for init
fn check_fd_access(source: &SysProcFs) {
    let test_dir = source.proc_root().join("1").join("fd");
    match fs::read_dir(&test_dir) {
        Ok(_) => info!("✅ Descriptor tables of other users are readable"),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            warn!("⚠️  Cannot read {} - insufficient permissions", test_dir.display());
            warn!("   Only processes owned by the current user will be listed");
        }
        Err(e) => warn!("⚠️  Could not test descriptor access: {}", e),
    }
}

/// Check that thread sharing can be detected
fn check_kcmp(source: &SysProcFs) {
    let pid = std::process::id() as i32;
    match source.compare(pid, pid, ShareKind::Files) {
        Sharing::Shared => info!("✅ kcmp available"),
        _ => {
            warn!("⚠️  kcmp unavailable - every thread's resources will be collected");
            warn!("   Thread listings (-l) may be slower and contain repeated rows");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Cannot read the process list: {0}")]
    ProcUnreadable(String),

    #[error("No processes found below {0}")]
    NoProcesses(String),
}
