// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Operator API: a Unix-domain-socket request/response
//! server. `Listener::run` spawns one task per connection against a
//! shared `ListenCtx`, dispatching `oiat-wire`'s `Request`/`Response`/`Query`.
//!
//! Session auth and CSRF validation are stubbed at the
//! [`OperatorSession`] trait boundary, since the web UI that would
//! originate real sessions is out of scope here; the listener evaluates
//! every request against the daemon-wide [`PortalSettings`] permission
//! flags rather than a per-session grant.

use std::path::PathBuf;
use std::sync::Arc;

use oiat_config::{CompanyConfig, PortalSettings};
use oiat_core::Clock;
use oiat_storage::Db;
use oiat_wire::{
    read_request, write_response, CompanySummary, PhaseRecordDetail, PortalSettingsDetail,
    ProtocolError, Query, Request, Response, RunDetail, RunSummary, ScheduleSummary,
};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::dispatcher::Dispatcher;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The four mutation permission flags a request may require.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub can_trigger_runs: bool,
    pub can_manage_schedules: bool,
    pub can_edit_companies: bool,
    pub can_manage_portal_settings: bool,
}

impl From<&PortalSettings> for Permissions {
    fn from(s: &PortalSettings) -> Self {
        Self {
            can_trigger_runs: s.can_trigger_runs,
            can_manage_schedules: s.can_manage_schedules,
            can_edit_companies: s.can_edit_companies,
            can_manage_portal_settings: s.can_manage_portal_settings,
        }
    }
}

/// Seam for a future session layer; today every connection is granted
/// the daemon-wide [`Permissions`] snapshot.
pub trait OperatorSession: Send + Sync {
    fn permissions(&self) -> Permissions;
}

pub struct LocalSession(pub Permissions);

impl OperatorSession for LocalSession {
    fn permissions(&self) -> Permissions {
        self.0
    }
}

pub struct ListenerCtx<C: Clock> {
    pub db: Db,
    pub dispatcher: Arc<Dispatcher<C>>,
    pub settings_path: PathBuf,
    pub companies_dir: PathBuf,
    pub settings: Mutex<PortalSettings>,
    pub shutdown: CancellationToken,
}

impl<C: Clock> ListenerCtx<C> {
    pub fn new(
        db: Db,
        dispatcher: Arc<Dispatcher<C>>,
        settings_path: PathBuf,
        companies_dir: PathBuf,
        settings: PortalSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            db,
            dispatcher,
            settings_path,
            companies_dir,
            settings: Mutex::new(settings),
            shutdown,
        }
    }

    fn permissions(&self) -> Permissions {
        Permissions::from(&*self.settings.lock())
    }
}

pub struct Listener<C: Clock> {
    unix: UnixListener,
    ctx: Arc<ListenerCtx<C>>,
}

impl<C: Clock + 'static> Listener<C> {
    pub fn bind(socket_path: &std::path::Path, ctx: Arc<ListenerCtx<C>>) -> Result<Self, ListenerError> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }
        let unix = UnixListener::bind(socket_path)?;
        Ok(Self { unix, ctx })
    }

    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => {
                    info!("operator api listener shutting down");
                    return;
                }
                accepted = self.unix.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let ctx = Arc::clone(&self.ctx);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, &ctx).await {
                                    warn!(error = %e, "operator api connection ended with an error");
                                }
                            });
                        }
                        Err(e) => error!(error = %e, "operator api accept error"),
                    }
                }
            }
        }
    }
}

async fn handle_connection<C: Clock>(
    mut stream: UnixStream,
    ctx: &ListenerCtx<C>,
) -> Result<(), ProtocolError> {
    let session = LocalSession(ctx.permissions());
    loop {
        let (reader, writer) = stream.split();
        let mut reader = reader;
        let mut writer = writer;
        let request: Request = match read_request(&mut reader).await {
            Ok(r) => r,
            Err(ProtocolError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };
        let shutting_down = matches!(request, Request::Shutdown);
        let response = handle_request(ctx, &session, request).await;
        write_response(&mut writer, &response).await?;
        if shutting_down {
            ctx.shutdown.cancel();
            return Ok(());
        }
    }
}

async fn handle_request<C: Clock>(
    ctx: &ListenerCtx<C>,
    session: &dyn OperatorSession,
    request: Request,
) -> Response {
    let perms = session.permissions();
    match request {
        Request::Ping => Response::Pong,
        Request::Hello { .. } => Response::Hello {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        Request::Shutdown => Response::ShuttingDown,
        Request::Query { query } => handle_query(ctx, query),

        Request::TriggerRun {
            tenant_scope,
            window,
            requested_by,
            skip_download,
            dry_run,
        } => {
            if !perms.can_trigger_runs {
                return Response::Forbidden {
                    permission: "can_trigger_runs".to_string(),
                };
            }
            let scope = parse_tenant_scope(&tenant_scope);
            let options = oiat_core::RunOptions {
                skip_download,
                dry_run,
                ..Default::default()
            };
            match ctx.dispatcher.enqueue(scope, window, requested_by, options) {
                Ok(job_id) => match ctx.db.current_lock_holder() {
                    Ok(Some(holder)) if holder.job_id != job_id => Response::RunBlocked {
                        held_by_job_id: Some(holder.job_id.to_string()),
                    },
                    Ok(_) => Response::RunQueued {
                        job_id: job_id.to_string(),
                    },
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::CancelRun { id } => {
            if !perms.can_trigger_runs {
                return Response::Forbidden {
                    permission: "can_trigger_runs".to_string(),
                };
            }
            let job_id = id.as_str().into();
            match ctx.db.set_run_job_cancel_requested(&job_id) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::ScheduleCreate {
            cron_expression,
            timezone,
            tenant_scope,
            enabled,
        } => {
            if !perms.can_manage_schedules {
                return Response::Forbidden {
                    permission: "can_manage_schedules".to_string(),
                };
            }
            let schedule = oiat_core::RunSchedule {
                id: oiat_core::RunScheduleId::new(),
                cron_expression,
                timezone,
                tenant_scope: parse_tenant_scope(&tenant_scope),
                enabled,
                last_evaluated_ms: None,
                next_fire_ms: None,
            };
            match ctx.db.insert_run_schedule(&schedule) {
                Ok(()) => Response::Schedule {
                    schedule: Some(Box::new(schedule_to_summary(&schedule))),
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::ScheduleUpdate {
            id,
            cron_expression,
            timezone,
            tenant_scope,
        } => {
            if !perms.can_manage_schedules {
                return Response::Forbidden {
                    permission: "can_manage_schedules".to_string(),
                };
            }
            let id = id.as_str().into();
            let scope = parse_tenant_scope(&tenant_scope);
            match ctx
                .db
                .update_run_schedule(&id, &cron_expression, &timezone, &scope)
            {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::ScheduleToggle { id, enabled } => {
            if !perms.can_manage_schedules {
                return Response::Forbidden {
                    permission: "can_manage_schedules".to_string(),
                };
            }
            match ctx.db.set_run_schedule_enabled(&id.as_str().into(), enabled) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::ScheduleDelete { id } => {
            if !perms.can_manage_schedules {
                return Response::Forbidden {
                    permission: "can_manage_schedules".to_string(),
                };
            }
            match ctx.db.delete_run_schedule(&id.as_str().into()) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::ScheduleRunNow { id } => {
            if !perms.can_manage_schedules {
                return Response::Forbidden {
                    permission: "can_manage_schedules".to_string(),
                };
            }
            let schedule_id = id.as_str().into();
            match ctx.db.get_run_schedule(&schedule_id) {
                Ok(Some(schedule)) => {
                    let window = oiat_core::DateWindow::Single(chrono::Utc::now().date_naive());
                    match ctx.dispatcher.enqueue(
                        schedule.tenant_scope,
                        window,
                        format!("schedule:{}:run-now", schedule.id),
                        oiat_core::RunOptions::default(),
                    ) {
                        Ok(job_id) => Response::RunQueued {
                            job_id: job_id.to_string(),
                        },
                        Err(e) => Response::Error {
                            message: e.to_string(),
                        },
                    }
                }
                Ok(None) => Response::Error {
                    message: format!("schedule {id} not found"),
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::CompanyCreate { config_json } | Request::CompanyEdit { config_json, .. } => {
            if !perms.can_edit_companies {
                return Response::Forbidden {
                    permission: "can_edit_companies".to_string(),
                };
            }
            match save_company_config(&ctx.companies_dir, &config_json) {
                Ok(summary) => Response::Company {
                    company: Some(Box::new(summary)),
                },
                Err(e) => Response::Error { message: e },
            }
        }

        Request::PortalSettingsEdit { settings_json } => {
            if !perms.can_manage_portal_settings {
                return Response::Forbidden {
                    permission: "can_manage_portal_settings".to_string(),
                };
            }
            match save_portal_settings(ctx, &settings_json) {
                Ok(detail) => Response::PortalSettings {
                    settings: Box::new(detail),
                },
                Err(e) => Response::Error { message: e },
            }
        }
    }
}

fn handle_query<C: Clock>(ctx: &ListenerCtx<C>, query: Query) -> Response {
    match query {
        Query::ListRuns { tenant } => match ctx.db.list_run_jobs(tenant.as_deref()) {
            Ok(jobs) => Response::Runs {
                runs: jobs.iter().map(run_job_to_summary).collect(),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Query::GetRun { id } => match ctx.db.get_run_job(&id.as_str().into()) {
            Ok(job) => Response::Run {
                run: job.as_ref().map(run_job_to_detail).map(Box::new),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Query::GetRunLogs { id, offset } => match ctx.db.get_run_job(&id.as_str().into()) {
            Ok(Some(job)) => match read_log_tail(&job.log_path, offset) {
                Ok((content, new_offset)) => Response::RunLogs {
                    content,
                    offset: new_offset,
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            },
            Ok(None) => Response::Error {
                message: format!("run {id} not found"),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Query::ListSchedules => match ctx.db.list_run_schedules() {
            Ok(schedules) => Response::Schedules {
                schedules: schedules.iter().map(schedule_to_summary).collect(),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Query::GetSchedule { id } => match ctx.db.get_run_schedule(&id.as_str().into()) {
            Ok(schedule) => Response::Schedule {
                schedule: schedule.as_ref().map(schedule_to_summary).map(Box::new),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Query::ListCompanies => match oiat_config::load_all_company_configs(&ctx.companies_dir) {
            Ok(configs) => Response::Companies {
                companies: configs.iter().map(company_to_summary).collect(),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Query::GetCompany { tenant_key } => {
            match oiat_config::load_all_company_configs(&ctx.companies_dir) {
                Ok(configs) => Response::Company {
                    company: configs
                        .iter()
                        .find(|c| c.tenant_key.as_str() == tenant_key)
                        .map(company_to_summary)
                        .map(Box::new),
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }
        Query::GetPortalSettings => {
            let settings = ctx.settings.lock().clone();
            Response::PortalSettings {
                settings: Box::new(settings_to_detail(&settings)),
            }
        }
    }
}

fn parse_tenant_scope(raw: &str) -> oiat_core::TenantScope {
    if raw.eq_ignore_ascii_case("all") {
        oiat_core::TenantScope::All
    } else {
        oiat_core::TenantScope::One(raw.into())
    }
}

fn run_job_to_summary(job: &oiat_core::RunJob) -> RunSummary {
    RunSummary {
        id: job.id.to_string(),
        tenant_scope: job.tenant_scope.to_string(),
        window: job.window,
        status: job.status,
        requested_by: job.requested_by.clone(),
        created_at_ms: job.created_at_ms,
        started_at_ms: job.started_at_ms,
        finished_at_ms: job.finished_at_ms,
        failure_reason: job.failure_reason.clone(),
    }
}

fn run_job_to_detail(job: &oiat_core::RunJob) -> RunDetail {
    RunDetail {
        summary: run_job_to_summary(job),
        pid: job.pid,
        exit_code: job.exit_code,
        log_path: job.log_path.to_string_lossy().to_string(),
        cancel_requested: job.cancel_requested,
        phase_history: job
            .phase_history
            .iter()
            .map(|r| PhaseRecordDetail {
                phase: r.phase.to_string(),
                started_at_ms: r.started_at_ms,
                finished_at_ms: Some(r.finished_at_ms),
                outcome: Some(match &r.outcome {
                    oiat_core::PhaseOutcome::Success => "success".to_string(),
                    oiat_core::PhaseOutcome::Skipped { reason } => format!("skipped: {reason}"),
                    oiat_core::PhaseOutcome::Failed { reason } => format!("failed: {reason}"),
                }),
            })
            .collect(),
    }
}

fn schedule_to_summary(schedule: &oiat_core::RunSchedule) -> ScheduleSummary {
    ScheduleSummary {
        id: schedule.id.to_string(),
        cron_expression: schedule.cron_expression.clone(),
        timezone: schedule.timezone.clone(),
        tenant_scope: schedule.tenant_scope.to_string(),
        enabled: schedule.enabled,
        last_evaluated_ms: schedule.last_evaluated_ms,
        next_fire_ms: schedule.next_fire_ms,
    }
}

fn company_to_summary(config: &CompanyConfig) -> CompanySummary {
    CompanySummary {
        tenant_key: config.tenant_key.to_string(),
        display_name: config.display_name.clone(),
        remote_realm_id: config.remote_realm_id.clone(),
        business_timezone: config.business_timezone.clone(),
    }
}

fn settings_to_detail(settings: &PortalSettings) -> PortalSettingsDetail {
    PortalSettingsDetail {
        can_trigger_runs: settings.can_trigger_runs,
        can_manage_schedules: settings.can_manage_schedules,
        can_edit_companies: settings.can_edit_companies,
        can_manage_portal_settings: settings.can_manage_portal_settings,
        dashboard_stale_run_minutes: settings.dashboard_stale_run_minutes,
        notification_webhook_url: settings.notification_webhook_url.clone(),
    }
}

fn save_company_config(companies_dir: &std::path::Path, config_json: &str) -> Result<CompanySummary, String> {
    let config: CompanyConfig = serde_json::from_str(config_json).map_err(|e| e.to_string())?;
    std::fs::create_dir_all(companies_dir).map_err(|e| e.to_string())?;
    let path = companies_dir.join(format!("{}.json", config.tenant_key));
    let tmp_path = companies_dir.join(format!("{}.json.tmp", config.tenant_key));
    std::fs::write(&tmp_path, config_json).map_err(|e| e.to_string())?;
    std::fs::rename(&tmp_path, &path).map_err(|e| e.to_string())?;
    Ok(company_to_summary(&config))
}

fn save_portal_settings<C: Clock>(ctx: &ListenerCtx<C>, settings_json: &str) -> Result<PortalSettingsDetail, String> {
    let settings: PortalSettings = serde_json::from_str(settings_json).map_err(|e| e.to_string())?;
    let rendered = toml::to_string_pretty(&settings).map_err(|e| e.to_string())?;
    if let Some(parent) = ctx.settings_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let tmp_path = ctx.settings_path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, rendered).map_err(|e| e.to_string())?;
    std::fs::rename(&tmp_path, &ctx.settings_path).map_err(|e| e.to_string())?;
    *ctx.settings.lock() = settings.clone();
    Ok(settings_to_detail(&settings))
}

fn read_log_tail(log_path: &std::path::Path, offset: u64) -> Result<(String, u64), std::io::Error> {
    use std::io::{Read, Seek, SeekFrom};
    let mut file = match std::fs::File::open(log_path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((String::new(), offset)),
        Err(e) => return Err(e),
    };
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    let new_offset = offset + buf.len() as u64;
    Ok((buf, new_offset))
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
