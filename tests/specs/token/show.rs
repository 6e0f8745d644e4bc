//! `oiat token show` specs: a tenant/realm with no stored
//! record is a generic failure, not "blocked or bad usage" — the Token
//! Store itself doesn't know whether the caller just has the wrong
//! tenant key or genuinely hasn't bootstrapped yet.

use crate::prelude::*;
use oiat_core::exit_code;

#[test]
fn token_show_missing_record_fails() {
    cli()
        .args(&["token", "show", "--tenant", "acme", "--realm", "9999"])
        .fails()
        .exit_code_is(exit_code::GENERIC_FAILURE)
        .stderr_has("oiat:");
}

#[test]
fn token_bootstrap_without_provider_env_fails() {
    // No QBO_TOKEN_URL/QBO_CLIENT_ID/QBO_CLIENT_SECRET set (the builder
    // strips them): resolving the OAuth endpoint must fail before any
    // network call is attempted.
    cli()
        .args(&[
            "token",
            "bootstrap",
            "--tenant",
            "acme",
            "--realm",
            "9999",
            "--authorization-code",
            "fake-code",
            "--redirect-uri",
            "https://example.test/callback",
        ])
        .fails()
        .exit_code_is(exit_code::GENERIC_FAILURE);
}
