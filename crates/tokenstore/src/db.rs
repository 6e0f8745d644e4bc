// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sqlite-backed persistence for `TokenRecord`s, one row per (tenant, realm).
//!
//! File permissions are restricted to owner read/write on open, for the
//! Token Store's on-disk state.

use crate::error::TokenStoreError;
use crate::types::{TokenKey, TokenRecord};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS token (
    tenant TEXT NOT NULL,
    realm TEXT NOT NULL,
    access_token TEXT NOT NULL,
    refresh_token TEXT NOT NULL,
    access_expiry_ms INTEGER NOT NULL,
    refresh_expiry_ms INTEGER,
    environment TEXT NOT NULL,
    updated_at_ms INTEGER NOT NULL,
    PRIMARY KEY (tenant, realm)
);";

#[derive(Clone)]
pub struct TokenDb {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl TokenDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TokenStoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        restrict_permissions(&path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn in_memory() -> Result<Self, TokenStoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, key: &TokenKey) -> Result<Option<TokenRecord>, TokenStoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT access_token, refresh_token, access_expiry_ms, refresh_expiry_ms, environment \
             FROM token WHERE tenant = ?1 AND realm = ?2",
            params![key.tenant.as_str(), key.realm.as_str()],
            |row| {
                Ok(TokenRecord {
                    access_token: row.get(0)?,
                    refresh_token: row.get(1)?,
                    access_expiry_ms: row.get::<_, i64>(2)? as u64,
                    refresh_expiry_ms: row.get::<_, Option<i64>>(3)?.map(|v| v as u64),
                    environment: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(TokenStoreError::from)
    }

    pub fn load_batch(
        &self,
        keys: &[TokenKey],
    ) -> Result<std::collections::HashMap<TokenKey, TokenRecord>, TokenStoreError> {
        let mut out = std::collections::HashMap::new();
        for key in keys {
            if let Some(record) = self.load(key)? {
                out.insert(key.clone(), record);
            }
        }
        Ok(out)
    }

    pub fn save(
        &self,
        key: &TokenKey,
        record: &TokenRecord,
        now_ms: u64,
    ) -> Result<(), TokenStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO token (tenant, realm, access_token, refresh_token, access_expiry_ms, refresh_expiry_ms, environment, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(tenant, realm) DO UPDATE SET \
                access_token = excluded.access_token, \
                refresh_token = excluded.refresh_token, \
                access_expiry_ms = excluded.access_expiry_ms, \
                refresh_expiry_ms = excluded.refresh_expiry_ms, \
                environment = excluded.environment, \
                updated_at_ms = excluded.updated_at_ms",
            params![
                key.tenant.as_str(),
                key.realm.as_str(),
                record.access_token,
                record.refresh_token,
                record.access_expiry_ms as i64,
                record.refresh_expiry_ms.map(|v| v as i64),
                record.environment,
                now_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &TokenKey) -> Result<(), TokenStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM token WHERE tenant = ?1 AND realm = ?2",
            params![key.tenant.as_str(), key.realm.as_str()],
        )?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), TokenStoreError> {
    use std::os::unix::fs::PermissionsExt;
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), TokenStoreError> {
    Ok(())
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
