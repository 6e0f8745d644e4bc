// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The filesystem half of the Run Lock. The database half
//! (`run_lock` row, transactionally tied to a `RunJob` status flip) lives
//! in `oiat_storage::lock`/`oiat_storage::runjobs`.
//!
//! Acquisition sequencing: open-or-create without truncating, take the
//! exclusive lock, *then* truncate and write the PID, so a process that
//! loses the race never clobbers the PID the current holder just wrote.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("run lock held by pid {0:?}")]
    Held(Option<u32>),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// A held exclusive lock on `runtime/global_run.lock`. Dropping it unlocks
/// and unlinks the file, matching a `Release(owner_id)` call.
pub struct RunLock {
    path: PathBuf,
    file: Option<File>,
}

impl RunLock {
    /// `TryAcquire`: exclusive-open the lock file and stamp it with the
    /// current process's PID.
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(LockError::Held(read_pid(&path)));
        }

        let mut lock_file = lock_file;
        lock_file.set_len(0)?;
        writeln!(lock_file, "{}", std::process::id())?;
        lock_file.flush()?;

        Ok(Self {
            path,
            file: Some(lock_file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// `ReapIfStale`'s liveness probe: sends signal 0, which fails without side
/// effects if the PID does not exist or belongs to another user. Racey
/// only against PID reuse, tolerated since the reaper
/// only fires after a stale-threshold age check.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    true
}

/// Force-clears a lock file left behind by a crashed process, without
/// going through `try_lock_exclusive` (which would fail if another live
/// process still holds it — callers must confirm staleness first via
/// [`is_process_alive`]).
pub fn force_clear(path: &Path) -> Result<(), LockError> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
