// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client over `oiatd`'s Operator API unix socket,
//! used by the schedule/company/portal-settings subcommands that mutate
//! or read daemon-owned state rather than running a pipeline directly.

use anyhow::{bail, Context as _, Result};
use oiat_wire::{read_message, write_message, Request, Response};
use tokio::net::UnixStream;

use crate::exit_error::ExitError;

/// Connects to the daemon's socket and sends one request, returning its
/// response. A connection failure means the daemon isn't running.
pub async fn call(socket_path: &std::path::Path, request: &Request) -> Result<Response> {
    let mut stream = UnixStream::connect(socket_path).await.map_err(|e| {
        ExitError::new(
            oiat_core::exit_code::GENERIC_FAILURE,
            format!("could not reach oiatd at {}: {e}", socket_path.display()),
        )
    })?;
    write_message(&mut stream, request)
        .await
        .context("writing operator api request")?;
    let response: Response = read_message(&mut stream)
        .await
        .context("reading operator api response")?;
    Ok(response)
}

/// Sends a request and maps the daemon's `Error`/`Forbidden` responses to
/// a command-level error, leaving the caller to pattern-match only the
/// responses it actually expects back.
pub async fn call_checked(socket_path: &std::path::Path, request: &Request) -> Result<Response> {
    let response = call(socket_path, request).await?;
    match &response {
        Response::Error { message } => bail!("oiatd: {message}"),
        Response::Forbidden { permission } => bail!("blocked: missing permission `{permission}`"),
        _ => Ok(response),
    }
}
