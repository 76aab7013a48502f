//! Atomic document writes
//!
//! A write is two steps:
//! 1. stage: write `<id>.<nonce>.tmp` under an exclusive advisory lock, fsync
//! 2. publish: rename the temp file over `<id>`, fsync the directory
//!
//! Readers never observe a partial document: until the rename the final
//! path holds the previous content (or nothing). Every stage creates its
//! own temp file, so concurrent writers of one id never share an inode and
//! each rename publishes a complete document.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::Document;
use crate::crash_point::{maybe_crash, CrashPoint};

/// Suffix of in-progress write files
pub const TEMP_SUFFIX: &str = ".tmp";

/// A fully written temp file waiting to be published
#[derive(Debug)]
#[must_use = "a staged write does nothing until published"]
pub struct StagedWrite {
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl StagedWrite {
    /// Path of the temp file holding the new content
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Path the document will be published to
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Atomically replaces the final file with the staged content
    pub fn publish(self) -> StoreResult<()> {
        fs::rename(&self.temp_path, &self.final_path)
            .map_err(|e| StoreError::io(&self.final_path, e))?;

        maybe_crash(CrashPoint::AfterRename);

        // fsync the directory so the rename itself is durable
        if let Some(parent) = self.final_path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}

/// Writes `doc` to the temp sibling of `final_path`
pub(crate) fn stage(final_path: &Path, id: &str, doc: &Document) -> StoreResult<StagedWrite> {
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let content = serde_json::to_string_pretty(doc).map_err(|e| StoreError::Encode {
        id: id.to_string(),
        reason: e.to_string(),
    })?;

    let temp_path = temp_path_for(final_path);

    maybe_crash(CrashPoint::BeforeStage);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| StoreError::io(&temp_path, e))?;

    if let Err(e) = fill_locked(&mut file, &temp_path, content.as_bytes()) {
        drop(file);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    maybe_crash(CrashPoint::AfterStage);

    Ok(StagedWrite {
        temp_path,
        final_path: final_path.to_path_buf(),
    })
}

/// Writes and syncs `bytes` while holding the file's exclusive lock
fn fill_locked(file: &mut File, temp_path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let lock_error = |e: std::io::Error| StoreError::Lock {
        path: temp_path.to_path_buf(),
        source: e,
    };
    file.lock().map_err(lock_error)?;

    let written = file
        .write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| StoreError::io(temp_path, e));
    let unlocked = file.unlock().map_err(lock_error);
    written.and(unlocked)
}

/// A fresh `<name>.<nonce>.tmp` sibling of `final_path`
pub(crate) fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}{}", Uuid::new_v4().simple(), TEMP_SUFFIX));
    final_path.with_file_name(name)
}

pub(crate) fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(TEMP_SUFFIX))
}
