// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory: $HOME is not set")]
    NoStateDir,

    #[error("required credential not set: {0}")]
    CredentialMissing(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config in {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed portal settings in {path}: {source}")]
    ParseToml {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown timezone name: {0}")]
    UnknownTimezone(String),
}

impl From<ConfigError> for oiat_core::PipelineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::CredentialMissing(key) => oiat_core::PipelineError::CredentialMissing(key),
            other => oiat_core::PipelineError::Config(other.to_string()),
        }
    }
}
