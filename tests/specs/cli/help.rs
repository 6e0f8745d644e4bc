//! CLI help output specs.
//!
//! Verify help text displays for every top-level subcommand.

use crate::prelude::*;

#[test]
fn oiat_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn oiat_no_args_shows_usage_and_exits_nonzero() {
    cli().args(&[]).fails().stderr_has("Usage:");
}

#[test]
fn oiat_run_help_shows_usage() {
    cli().args(&["run", "--help"]).passes().stdout_has("Usage:").stdout_has("--tenant");
}

#[test]
fn oiat_run_all_help_shows_usage() {
    cli().args(&["run-all", "--help"]).passes().stdout_has("Usage:").stdout_has("--tenants");
}

#[test]
fn oiat_schedule_help_shows_subcommands() {
    cli()
        .args(&["schedule", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("create")
        .stdout_has("toggle");
}

#[test]
fn oiat_company_help_shows_subcommands() {
    cli()
        .args(&["company", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("create")
        .stdout_has("edit");
}

#[test]
fn oiat_token_help_shows_subcommands() {
    cli()
        .args(&["token", "--help"])
        .passes()
        .stdout_has("bootstrap")
        .stdout_has("show");
}

#[test]
fn oiat_portal_settings_help_shows_subcommands() {
    cli()
        .args(&["portal-settings", "--help"])
        .passes()
        .stdout_has("show")
        .stdout_has("edit");
}

#[test]
fn oiat_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has(env!("CARGO_PKG_VERSION"));
}
