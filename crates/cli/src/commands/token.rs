// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oiat token bootstrap|show`: direct Token Store access,
//! not routed through the Operator API — an operator runs `bootstrap`
//! once per tenant after completing the provider's OAuth consent screen
//! out of band, pasting back the authorization code it redirected with.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use oiat_core::Clock;
use oiat_tokenstore::{ProviderEndpoint, RealmId, RefreshClient, TokenDb, TokenKey, TokenStore};

use crate::context::Context;

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Exchange an authorization code for the tenant's first token pair.
    Bootstrap(TokenBootstrapArgs),
    /// Show a tenant's stored token record, with secrets redacted.
    Show(TokenTenantArgs),
}

#[derive(Debug, Args)]
pub struct TokenBootstrapArgs {
    #[arg(long)]
    pub tenant: String,
    #[arg(long)]
    pub realm: String,
    #[arg(long)]
    pub authorization_code: String,
    #[arg(long)]
    pub redirect_uri: String,
    #[arg(long, default_value = "production")]
    pub environment: String,
}

#[derive(Debug, Args)]
pub struct TokenTenantArgs {
    #[arg(long)]
    pub tenant: String,
    #[arg(long)]
    pub realm: String,
}

fn redact(secret: &str) -> String {
    if secret.len() <= 8 {
        "*".repeat(secret.len())
    } else {
        format!("{}...{}", &secret[..4], &secret[secret.len() - 4..])
    }
}

pub async fn bootstrap(args: TokenBootstrapArgs) -> Result<i32> {
    let ctx = Context::open()?;
    let token_url = oiat_config::env::qbo_token_url().context("resolving OAuth token URL")?;
    let (client_id, client_secret) =
        oiat_config::env::qbo_client_credentials().context("resolving OAuth client credentials")?;
    let endpoint = ProviderEndpoint { token_url, client_id, client_secret };

    let http = reqwest::Client::new();
    let refresh_client = RefreshClient::new(http);
    let now_ms = ctx.clock.epoch_ms();
    let record = refresh_client
        .exchange_code(&endpoint, &args.authorization_code, &args.redirect_uri, now_ms)
        .await
        .context("exchanging authorization code")?;

    let token_db = TokenDb::open(&ctx.paths.token_db_path).context("opening token store")?;
    let key = TokenKey::new(args.tenant.as_str(), RealmId::new(args.realm.as_str()));
    let mut record = record;
    record.environment = args.environment.clone();
    token_db.save(&key, &record, now_ms).context("saving bootstrapped token")?;

    println!("bootstrapped token for {}/{} ({})", args.tenant, args.realm, args.environment);
    Ok(oiat_core::exit_code::SUCCESS)
}

pub async fn show(args: TokenTenantArgs) -> Result<i32> {
    let ctx = Context::open()?;
    let token_db = TokenDb::open(&ctx.paths.token_db_path).context("opening token store")?;
    let http = reqwest::Client::new();
    let store = TokenStore::new(token_db, RefreshClient::new(http), ctx.clock.clone());
    let key = TokenKey::new(args.tenant.as_str(), RealmId::new(args.realm.as_str()));
    let record = store.load(&key).context("loading token record")?;

    println!("tenant: {}", args.tenant);
    println!("realm: {}", args.realm);
    println!("environment: {}", record.environment);
    println!("access_token: {}", redact(&record.access_token));
    println!("refresh_token: {}", redact(&record.refresh_token));
    println!("access_expiry_ms: {}", record.access_expiry_ms);
    println!("valid_now: {}", record.is_valid_at(ctx.clock.epoch_ms()));
    Ok(oiat_core::exit_code::SUCCESS)
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
