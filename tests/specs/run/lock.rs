//! Run Lock contention specs: a second
//! invocation against a state dir whose filesystem lock is already held
//! must exit with code 2 and a "blocked" reason, never interleave.

use crate::prelude::*;
use oiat_core::exit_code;
use oiat_daemon::RunLock;

#[test]
fn run_blocked_by_existing_lock_exits_2() {
    let state = StateDir::new();
    state.write_company("acme");

    let lock_path = state.path().join("runtime/global_run.lock");
    let _held = RunLock::try_acquire(&lock_path).expect("acquire lock for test");

    cli()
        .state_dir(state.path())
        .args(&["run", "--tenant", "acme", "--date", "2025-12-27"])
        .fails()
        .exit_code_is(exit_code::BLOCKED_OR_BAD_USAGE)
        .stderr_has("blocked by existing run lock");
}

#[test]
fn run_all_blocked_by_existing_lock_exits_2() {
    let state = StateDir::new();
    state.write_company("acme");

    let lock_path = state.path().join("runtime/global_run.lock");
    let _held = RunLock::try_acquire(&lock_path).expect("acquire lock for test");

    cli()
        .state_dir(state.path())
        .args(&["run-all", "--date", "2025-12-27"])
        .fails()
        .exit_code_is(exit_code::BLOCKED_OR_BAD_USAGE)
        .stderr_has("blocked by existing run lock");
}

#[test]
fn lock_released_after_drop_allows_next_caller() {
    let state = StateDir::new();
    let lock_path = state.path().join("runtime/global_run.lock");

    {
        let _held = RunLock::try_acquire(&lock_path).expect("first acquire");
    }

    let second = RunLock::try_acquire(&lock_path);
    assert!(second.is_ok(), "lock should be free once the first holder dropped");
}
