//! CLI argument validation specs for `oiat run`/`run-all`,
//! exercising the exit-code-2 "blocked or bad usage" contract without
//! needing a real pipeline to execute.

use crate::prelude::*;
use oiat_core::exit_code;

#[test]
fn run_without_date_or_range_is_bad_usage() {
    cli()
        .args(&["run", "--tenant", "acme"])
        .fails()
        .exit_code_is(exit_code::BLOCKED_OR_BAD_USAGE)
        .stderr_has("one of --date or --from/--to is required");
}

#[test]
fn run_with_date_and_range_together_is_bad_usage() {
    cli()
        .args(&["run", "--tenant", "acme", "--date", "2025-12-27", "--from", "2025-12-26", "--to", "2025-12-28"])
        .fails()
        .exit_code_is(exit_code::BLOCKED_OR_BAD_USAGE)
        .stderr_has("mutually exclusive");
}

#[test]
fn run_with_from_after_to_is_bad_usage() {
    cli()
        .args(&["run", "--tenant", "acme", "--from", "2025-12-28", "--to", "2025-12-26"])
        .fails()
        .exit_code_is(exit_code::BLOCKED_OR_BAD_USAGE)
        .stderr_has("--from must not be after --to");
}

#[test]
fn run_with_unknown_tenant_is_bad_usage() {
    cli()
        .args(&["run", "--tenant", "does-not-exist", "--date", "2025-12-27"])
        .fails()
        .exit_code_is(exit_code::BLOCKED_OR_BAD_USAGE)
        .stderr_has("does-not-exist");
}

#[test]
fn run_all_without_date_or_range_is_bad_usage() {
    cli()
        .args(&["run-all"])
        .fails()
        .exit_code_is(exit_code::BLOCKED_OR_BAD_USAGE)
        .stderr_has("one of --date or --from/--to is required");
}

#[test]
fn run_all_with_unknown_tenant_is_bad_usage() {
    cli()
        .args(&["run-all", "--date", "2025-12-27", "--tenants", "ghost"])
        .fails()
        .exit_code_is(exit_code::BLOCKED_OR_BAD_USAGE)
        .stderr_has("ghost");
}

#[test]
fn run_job_without_job_id_is_clap_usage_error() {
    cli().args(&["run-job"]).fails().stderr_has("Usage:");
}
