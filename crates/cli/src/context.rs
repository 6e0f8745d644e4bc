// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared startup wiring for every orchestrator CLI subcommand: state
//! directory layout, the shared sqlite `Db`, and per-tenant dependency
//! construction for the Pipeline Orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use oiat_config::{CompanyConfig, PortalSettings};
use oiat_core::{exit_code, Clock, SystemClock};
use oiat_pipeline::{
    ExternalDownloader, ExternalTransformer, HttpRemoteClient, Orchestrator, OrchestratorDeps,
    TokenRefresher, TokenStoreRefresher,
};
use oiat_storage::Db;
use oiat_tokenstore::{ProviderEndpoint, RealmId, RefreshClient, TokenDb, TokenKey, TokenStore};

use crate::exit_error::ExitError;

/// Directory layout under `oiat_config::env::state_dir()`, mirroring the
/// paths `oiatd` itself constructs at startup.
pub struct Paths {
    pub companies_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub db_path: PathBuf,
    pub token_db_path: PathBuf,
    pub settings_path: PathBuf,
    pub lock_path: PathBuf,
    pub socket_path: PathBuf,
}

impl Paths {
    pub fn resolve() -> Result<Self> {
        let state_dir = oiat_config::env::state_dir().context("resolving state directory")?;
        Ok(Self {
            companies_dir: state_dir.join("companies"),
            runs_dir: state_dir.join("runs"),
            db_path: state_dir.join("oiat.sqlite3"),
            token_db_path: state_dir.join("qbo_tokens.sqlite"),
            settings_path: state_dir.join("portal_settings.toml"),
            lock_path: state_dir.join(oiat_daemon::env::lock_file_name()),
            socket_path: state_dir.join(oiat_daemon::env::socket_file_name()),
        })
    }
}

pub struct Context {
    pub paths: Paths,
    pub db: Db,
    pub settings: PortalSettings,
    pub clock: SystemClock,
}

impl Context {
    pub fn open() -> Result<Self> {
        let paths = Paths::resolve()?;
        std::fs::create_dir_all(&paths.companies_dir)
            .and_then(|_| std::fs::create_dir_all(&paths.runs_dir))
            .context("preparing state directory")?;
        let db = Db::open(&paths.db_path).context("opening database")?;
        let settings =
            oiat_config::load_portal_settings(&paths.settings_path).context("loading portal settings")?;
        Ok(Self {
            paths,
            db,
            settings,
            clock: SystemClock,
        })
    }

    /// Loads one tenant's config; a missing or malformed `--tenant` value
    /// is invalid CLI usage (exit code 2), not a generic failure.
    pub fn load_tenant(&self, tenant_key: &str) -> Result<CompanyConfig> {
        let path = self.paths.companies_dir.join(format!("{tenant_key}.json"));
        oiat_config::load_company_config(&path)
            .map_err(|e| ExitError::new(exit_code::BLOCKED_OR_BAD_USAGE, format!("{tenant_key}: {e}")).into())
    }

    pub fn load_all_tenants(&self) -> Result<Vec<CompanyConfig>> {
        Ok(oiat_config::load_all_company_configs(&self.paths.companies_dir)
            .context("loading company configs")?)
    }

    /// The webhook to notify for this tenant's run: its own configured
    /// webhook env var, falling back to the portal-wide default
    ///.
    pub fn webhook_url(&self, config: &CompanyConfig) -> Option<String> {
        config
            .credentials
            .slack_webhook_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .or_else(|| self.settings.notification_webhook_url.clone())
    }
}

/// Checks that an external collaborator command is present and
/// executable before handing it to the orchestrator, so a missing or
/// unusable command surfaces as exit code 127/126 rather than a generic
/// pipeline failure. A bare command name with no path
/// separator is resolved against `PATH` at spawn time instead; we don't
/// replicate that search here.
pub fn check_external_command(path: &std::path::Path) -> std::result::Result<(), ExitError> {
    if path.components().count() <= 1 {
        return Ok(());
    }
    match std::fs::metadata(path) {
        Err(_) => Err(ExitError::new(
            exit_code::COMMAND_NOT_FOUND,
            format!("command not found: {}", path.display()),
        )),
        Ok(meta) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if meta.permissions().mode() & 0o111 == 0 {
                    return Err(ExitError::new(
                        exit_code::COMMAND_UNUSABLE,
                        format!("command is not executable: {}", path.display()),
                    ));
                }
            }
            #[cfg(not(unix))]
            let _ = meta;
            Ok(())
        }
    }
}

type ProductionOrchestrator =
    Orchestrator<SystemClock, ExternalDownloader, ExternalTransformer, HttpRemoteClient>;

/// Builds the Pipeline Orchestrator and its one-shot token refresher for
/// `config`, wiring the production adapters the same way `oiatd` wires
/// the dispatcher's sibling subprocess.
pub fn build_orchestrator(
    ctx: &Context,
    config: &CompanyConfig,
) -> Result<(ProductionOrchestrator, Arc<dyn TokenRefresher>)> {
    let download_command = oiat_config::env::download_command_path().context("resolving download command")?;
    let transform_command = oiat_config::env::transform_command_path().context("resolving transform command")?;
    check_external_command(&download_command)?;
    check_external_command(&transform_command)?;

    let base_url = oiat_config::env::remote_api_base_url().context("resolving remote API base URL")?;
    let token_url = oiat_config::env::qbo_token_url().context("resolving OAuth token URL")?;
    let (client_id, client_secret) =
        oiat_config::env::qbo_client_credentials().context("resolving OAuth client credentials")?;

    let http = reqwest::Client::new();
    let downloader = ExternalDownloader::new(download_command, config.paths.staging_dir.clone());
    let transformer = ExternalTransformer::new(transform_command, config.paths.staging_dir.clone());
    let remote_client = HttpRemoteClient::new(http.clone(), base_url);

    let token_db = TokenDb::open(&ctx.paths.token_db_path).context("opening token store")?;
    let token_store = Arc::new(TokenStore::new(token_db, RefreshClient::new(http), ctx.clock.clone()));
    let token_key = TokenKey::new(config.tenant_key.clone(), RealmId::new(config.remote_realm_id.clone()));
    let endpoint = ProviderEndpoint {
        token_url,
        client_id,
        client_secret,
    };
    let refresher: Arc<dyn TokenRefresher> =
        Arc::new(TokenStoreRefresher::new(token_store, token_key, endpoint));

    let deps = OrchestratorDeps {
        db: ctx.db.clone(),
        clock: ctx.clock.clone(),
    };
    let orchestrator = Orchestrator::new(deps, downloader, transformer, remote_client);
    Ok((orchestrator, refresher))
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
