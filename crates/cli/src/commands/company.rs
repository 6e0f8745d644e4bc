// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oiat company list|create|edit`: a thin client over the Operator API's
//! company management surface. `create`/`edit` both carry
//! a full `CompanyConfig` JSON document read from `--file`, matching the
//! daemon's own atomic write-then-rename of `companies/<key>.json`.

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use oiat_config::CompanyConfig;
use oiat_wire::{CompanySummary, Query, Request, Response};

use crate::context::Paths;

#[derive(Debug, Subcommand)]
pub enum CompanyCommand {
    /// List every configured tenant.
    List,
    /// Create a new tenant from a `CompanyConfig` JSON file.
    Create(CompanyFileArgs),
    /// Replace an existing tenant's config from a `CompanyConfig` JSON file.
    Edit(CompanyFileArgs),
}

#[derive(Debug, Args)]
pub struct CompanyFileArgs {
    #[arg(long)]
    pub file: PathBuf,
}

fn print_company(c: &CompanySummary) {
    println!("{}\t{}\t{}\t{}", c.tenant_key, c.display_name, c.remote_realm_id, c.business_timezone);
}

fn read_config_json(path: &std::path::Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let _: CompanyConfig = serde_json::from_str(&raw).context("config file is not a valid CompanyConfig")?;
    Ok(raw)
}

pub async fn run(command: CompanyCommand) -> Result<i32> {
    let paths = Paths::resolve()?;

    let request = match &command {
        CompanyCommand::List => Request::Query { query: Query::ListCompanies },
        CompanyCommand::Create(args) => Request::CompanyCreate {
            config_json: read_config_json(&args.file)?,
        },
        CompanyCommand::Edit(args) => {
            let config_json = read_config_json(&args.file)?;
            let config: CompanyConfig = serde_json::from_str(&config_json)?;
            Request::CompanyEdit {
                tenant_key: config.tenant_key.to_string(),
                config_json,
            }
        }
    };

    let response = crate::socket_client::call_checked(&paths.socket_path, &request).await?;
    match response {
        Response::Companies { companies } => {
            for c in &companies {
                print_company(c);
            }
        }
        Response::Company { company } => match company {
            Some(c) => print_company(&c),
            None => println!("(no such company)"),
        },
        other => bail!("unexpected operator api response: {other:?}"),
    }
    Ok(oiat_core::exit_code::SUCCESS)
}

#[cfg(test)]
#[path = "company_tests.rs"]
mod tests;
