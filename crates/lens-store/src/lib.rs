//! # lens-store
//!
//! Persistence for the ViralLens workspace.
//!
//! Both repositories store the whole [`StoreSnapshot`](lens_core::StoreSnapshot)
//! as one document and replace it on every save:
//! - [`JsonFileRepository`]: a JSON file on disk, written atomically
//! - [`MemoryRepository`]: an in-process copy for tests and ephemeral sessions
//!
//! Either can be given a byte quota; a save that would exceed it fails with
//! `Error::QuotaExceeded` and leaves the previous snapshot in place.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileRepository;
pub use memory::MemoryRepository;

/// Serialized size of a snapshot checked against an optional quota.
pub(crate) fn check_quota(len: usize, quota_bytes: Option<u64>) -> lens_core::Result<()> {
    match quota_bytes {
        Some(quota) if len as u64 > quota => Err(lens_core::Error::QuotaExceeded(format!(
            "Snapshot needs {} bytes but the store allows {}",
            len, quota
        ))),
        _ => Ok(()),
    }
}
