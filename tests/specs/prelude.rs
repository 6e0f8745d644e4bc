//! Test helpers for the orchestrator CLI's behavioral specifications.
//!
//! Provides a high-level CliBuilder/RunAssert DSL for testing `oiat`
//! CLI behavior end to end.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn oiat_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("oiat")
}

/// Creates a fresh, isolated `OIAT_STATE_DIR` for one test. Dropping it
/// removes the directory.
pub struct StateDir {
    dir: TempDir,
}

impl StateDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn companies_dir(&self) -> PathBuf {
        self.dir.path().join("companies")
    }

    /// Writes a minimal valid `CompanyConfig` JSON file for `tenant_key`.
    pub fn write_company(&self, tenant_key: &str) -> PathBuf {
        let dir = self.companies_dir();
        std::fs::create_dir_all(&dir).expect("create companies dir");
        let staging = self.dir.path().join("staging").join(tenant_key);
        let spill = self.dir.path().join("spill").join(tenant_key);
        let archive = self.dir.path().join("archive").join(tenant_key);
        let ledger = self.dir.path().join("ledger").join(format!("{tenant_key}.json"));
        let config = serde_json::json!({
            "tenant_key": tenant_key,
            "display_name": format!("{tenant_key} Inc"),
            "remote_realm_id": "9999",
            "business_timezone": "UTC",
            "receipt_prefix": "BK",
            "paths": {
                "staging_dir": staging,
                "spill_dir": spill,
                "archive_dir": archive,
                "ledger_path": ledger,
            },
            "credentials": {
                "epos_username_env": format!("EPOS_USERNAME_{}", tenant_key.to_uppercase()),
                "epos_password_env": format!("EPOS_PASSWORD_{}", tenant_key.to_uppercase()),
            },
        });
        let path = dir.join(format!("{tenant_key}.json"));
        std::fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).expect("write company config");
        path
    }
}

/// Create a CLI builder for `oiat` commands, scoped to a fresh state dir
/// unless `.state_dir()` overrides it.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
    _owned_state: Option<StateDir>,
}

impl CliBuilder {
    fn new() -> Self {
        let state = StateDir::new();
        let state_dir = state.path().to_path_buf();
        Self {
            args: Vec::new(),
            envs: vec![("OIAT_STATE_DIR".into(), state_dir.to_string_lossy().into_owned())],
            _owned_state: Some(state),
        }
    }

    /// Add CLI arguments.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Point this invocation at an already-built `StateDir` instead of
    /// the builder's own ephemeral one (needed to share state across
    /// multiple invocations, e.g. lock contention specs).
    pub fn state_dir(mut self, dir: &Path) -> Self {
        self._owned_state = None;
        self.envs.retain(|(k, _)| k != "OIAT_STATE_DIR");
        self.envs.push(("OIAT_STATE_DIR".into(), dir.to_string_lossy().into_owned()));
        self
    }

    /// Set an environment variable for this invocation.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// Build the command without running it.
    pub fn command(self) -> Command {
        let mut cmd = Command::new(oiat_binary());
        cmd.args(&self.args);
        cmd.env_remove("RUST_LOG");
        // Keep credential resolution hermetic: don't let the operator's
        // own shell environment leak OAuth secrets into a spec run.
        for var in ["QBO_CLIENT_ID", "QBO_CLIENT_SECRET", "QBO_TOKEN_URL", "QBO_API_BASE_URL"] {
            cmd.env_remove(var);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0).
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code).
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and return the raw output without asserting on exit status.
    pub fn run(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    pub fn exit_code_is(self, expected: i32) -> Self {
        assert_eq!(
            self.output.status.code(),
            Some(expected),
            "stdout: {}\nstderr: {}",
            self.stdout(),
            self.stderr()
        );
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain '{expected}'\nstderr: {stderr}");
        self
    }
}
