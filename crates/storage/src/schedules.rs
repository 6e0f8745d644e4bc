// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunSchedule` persistence, evaluated by the Schedule Worker.

use crate::db::Db;
use crate::error::StorageError;
use oiat_core::{RunSchedule, RunScheduleId, TenantScope};
use rusqlite::{params, OptionalExtension, Row};

impl Db {
    pub fn insert_run_schedule(&self, schedule: &RunSchedule) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO run_schedule (
                    id, cron_expression, timezone, tenant_scope, enabled,
                    last_evaluated_ms, next_fire_ms
                ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    schedule.id.to_string(),
                    schedule.cron_expression,
                    schedule.timezone,
                    serde_json::to_string(&schedule.tenant_scope)?,
                    schedule.enabled as i64,
                    schedule.last_evaluated_ms.map(|v| v as i64),
                    schedule.next_fire_ms.map(|v| v as i64),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_run_schedule(&self, id: &RunScheduleId) -> Result<Option<RunSchedule>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, cron_expression, timezone, tenant_scope, enabled,
                        last_evaluated_ms, next_fire_ms FROM run_schedule WHERE id = ?1",
                params![id.to_string()],
                row_to_schedule,
            )
            .optional()
            .map_err(StorageError::from)
        })
    }

    pub fn list_enabled_run_schedules(&self) -> Result<Vec<RunSchedule>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, cron_expression, timezone, tenant_scope, enabled,
                        last_evaluated_ms, next_fire_ms FROM run_schedule WHERE enabled = 1",
            )?;
            let rows = stmt
                .query_map([], row_to_schedule)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_run_schedules(&self) -> Result<Vec<RunSchedule>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, cron_expression, timezone, tenant_scope, enabled,
                        last_evaluated_ms, next_fire_ms FROM run_schedule",
            )?;
            let rows = stmt
                .query_map([], row_to_schedule)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_run_schedule_enabled(
        &self,
        id: &RunScheduleId,
        enabled: bool,
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE run_schedule SET enabled = ?2 WHERE id = ?1",
                params![id.to_string(), enabled as i64],
            )?;
            Ok(())
        })
    }

    pub fn update_run_schedule(
        &self,
        id: &RunScheduleId,
        cron_expression: &str,
        timezone: &str,
        tenant_scope: &TenantScope,
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE run_schedule SET cron_expression = ?2, timezone = ?3, tenant_scope = ?4
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    cron_expression,
                    timezone,
                    serde_json::to_string(tenant_scope)?,
                ],
            )?;
            Ok(())
        })
    }

    /// Called once per evaluated tick, whether or not it fired, per §4.9.
    pub fn mark_run_schedule_evaluated(
        &self,
        id: &RunScheduleId,
        last_evaluated_ms: u64,
        next_fire_ms: Option<u64>,
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE run_schedule SET last_evaluated_ms = ?2, next_fire_ms = ?3 WHERE id = ?1",
                params![
                    id.to_string(),
                    last_evaluated_ms as i64,
                    next_fire_ms.map(|v| v as i64),
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_run_schedule(&self, id: &RunScheduleId) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM run_schedule WHERE id = ?1", params![id.to_string()])?;
            Ok(())
        })
    }
}

fn row_to_schedule(row: &Row) -> rusqlite::Result<RunSchedule> {
    let id: String = row.get(0)?;
    let cron_expression: String = row.get(1)?;
    let timezone: String = row.get(2)?;
    let tenant_scope: String = row.get(3)?;
    let enabled: i64 = row.get(4)?;
    let last_evaluated_ms: Option<i64> = row.get(5)?;
    let next_fire_ms: Option<i64> = row.get(6)?;

    let tenant_scope: TenantScope = serde_json::from_str(&tenant_scope)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(RunSchedule {
        id: RunScheduleId::from_string(id),
        cron_expression,
        timezone,
        tenant_scope,
        enabled: enabled != 0,
        last_evaluated_ms: last_evaluated_ms.map(|v| v as u64),
        next_fire_ms: next_fire_ms.map(|v| v as u64),
    })
}

#[cfg(test)]
#[path = "schedules_tests.rs"]
mod tests;
