// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oiat portal-settings edit`: a thin client over the Operator API's
//! portal settings surface, replacing the daemon's
//! `PortalSettings` with a `--file` JSON document.

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::Args;
use oiat_config::PortalSettings;
use oiat_wire::{Query, Request, Response};

use crate::context::Paths;

#[derive(Debug, Args)]
pub struct PortalSettingsEditArgs {
    #[arg(long)]
    pub file: PathBuf,
}

fn print_settings(settings_json: &str) {
    println!("{settings_json}");
}

fn read_settings_json(path: &std::path::Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let _: PortalSettings = serde_json::from_str(&raw).context("file is not a valid PortalSettings document")?;
    Ok(raw)
}

pub async fn show() -> Result<i32> {
    let paths = Paths::resolve()?;
    let response = crate::socket_client::call_checked(
        &paths.socket_path,
        &Request::Query { query: Query::GetPortalSettings },
    )
    .await?;
    match response {
        Response::PortalSettings { settings } => {
            print_settings(&serde_json::to_string_pretty(&settings)?);
        }
        other => bail!("unexpected operator api response: {other:?}"),
    }
    Ok(oiat_core::exit_code::SUCCESS)
}

pub async fn edit(args: PortalSettingsEditArgs) -> Result<i32> {
    let paths = Paths::resolve()?;
    let raw = read_settings_json(&args.file)?;

    let response = crate::socket_client::call_checked(
        &paths.socket_path,
        &Request::PortalSettingsEdit { settings_json: raw },
    )
    .await?;
    match response {
        Response::PortalSettings { settings } => {
            print_settings(&serde_json::to_string_pretty(&settings)?);
        }
        other => bail!("unexpected operator api response: {other:?}"),
    }
    Ok(oiat_core::exit_code::SUCCESS)
}

#[cfg(test)]
#[path = "portal_settings_tests.rs"]
mod tests;
