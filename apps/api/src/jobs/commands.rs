use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::jobs::store;
use crate::models::job::ApplicationStatus;
use crate::session::Session;

/// Date format accepted for follow-up dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw form body of a mutating request. Every field is optional at this
/// stage; `Command::from_form` decides what is required for each action.
#[derive(Debug, Default, Deserialize)]
pub struct CommandForm {
    pub action: Option<String>,
    pub csrf: Option<String>,
    pub id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub salary: Option<String>,
    pub next_action_date: Option<String>,
    pub notes: Option<String>,
}

/// Validated mutable fields of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFields {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub url: Option<String>,
    pub status: ApplicationStatus,
    pub salary: Option<String>,
    pub next_action_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Validation failures. The `Display` text is what the user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Fill in at least Title and Company.")]
    MissingRequired,

    #[error("Invalid status.")]
    InvalidStatus,

    #[error("Invalid follow-up date (use YYYY-MM-DD).")]
    InvalidDate,

    #[error("Invalid ID.")]
    InvalidId,

    #[error("Invalid status data.")]
    InvalidStatusData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Ok,
    Error,
}

/// One-shot notice describing the outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn ok(message: impl Into<String>) -> Self {
        Flash {
            kind: FlashKind::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Flash {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(JobFields),
    Update { id: i64, fields: JobFields },
    UpdateStatus { id: i64, status: ApplicationStatus },
    Delete { id: i64 },
}

impl Command {
    /// Decodes and validates a form. `None` means the action is unknown and
    /// nothing should happen.
    pub fn from_form(form: &CommandForm) -> Option<Result<Command, CommandError>> {
        let command = match form.action.as_deref()? {
            "create" => validate_fields(form).map(Command::Create),
            "update" => parse_id(form.id.as_deref())
                .and_then(|id| validate_fields(form).map(|fields| Command::Update { id, fields })),
            "update_status" => parse_id(form.id.as_deref())
                .and_then(|id| parse_status(form.status.as_deref()).map(|status| (id, status)))
                .map(|(id, status)| Command::UpdateStatus { id, status })
                .map_err(|_| CommandError::InvalidStatusData),
            "delete" => parse_id(form.id.as_deref()).map(|id| Command::Delete { id }),
            _ => return None,
        };
        Some(command)
    }

    /// Writes the command to the store and returns the success notice.
    /// Unknown ids are a silent no-op, reported as success.
    pub async fn apply(self, pool: &SqlitePool) -> Result<Flash, sqlx::Error> {
        match self {
            Command::Create(fields) => {
                let id = store::insert_job(pool, &fields, Utc::now()).await?;
                info!(id, company = %fields.company, "created job application");
                Ok(Flash::ok("Application added!"))
            }
            Command::Update { id, fields } => {
                let rows = store::update_job(pool, id, &fields).await?;
                info!(id, rows, "updated job application");
                Ok(Flash::ok("Application updated!"))
            }
            Command::UpdateStatus { id, status } => {
                let rows = store::update_status(pool, id, status).await?;
                info!(id, rows, %status, "updated job application status");
                Ok(Flash::ok("Status updated."))
            }
            Command::Delete { id } => {
                let rows = store::delete_job(pool, id).await?;
                info!(id, rows, "deleted job application");
                Ok(Flash::ok("Application removed."))
            }
        }
    }
}

/// Entry point for every mutating request: verifies the session's
/// anti-forgery token, then validates and applies the command.
///
/// Validation failures come back as an error flash; only authorization and
/// storage failures abort the request.
pub async fn handle_command(
    pool: &SqlitePool,
    session: &Session,
    form: &CommandForm,
) -> Result<Option<Flash>, AppError> {
    session.verify_csrf(form.csrf.as_deref())?;

    match Command::from_form(form) {
        None => {
            debug!(action = ?form.action, "ignoring unknown action");
            Ok(None)
        }
        Some(Err(e)) => {
            debug!(action = ?form.action, error = %e, "command rejected");
            Ok(Some(Flash::error(e.to_string())))
        }
        Some(Ok(command)) => Ok(Some(command.apply(pool).await?)),
    }
}

fn validate_fields(form: &CommandForm) -> Result<JobFields, CommandError> {
    let title = trimmed(form.title.as_deref());
    let company = trimmed(form.company.as_deref());
    if title.is_empty() || company.is_empty() {
        return Err(CommandError::MissingRequired);
    }

    let status = parse_status(form.status.as_deref())?;
    let next_action_date = parse_follow_up_date(form.next_action_date.as_deref())?;

    Ok(JobFields {
        title: title.to_string(),
        company: company.to_string(),
        location: optional(form.location.as_deref()),
        url: optional(form.url.as_deref()),
        status,
        salary: optional(form.salary.as_deref()),
        next_action_date,
        notes: optional(form.notes.as_deref()),
    })
}

/// Ids must be positive integers.
fn parse_id(raw: Option<&str>) -> Result<i64, CommandError> {
    raw.map(str::trim)
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or(CommandError::InvalidId)
}

/// An omitted status means the default; an explicit one must be exact.
fn parse_status(raw: Option<&str>) -> Result<ApplicationStatus, CommandError> {
    match raw {
        None => Ok(ApplicationStatus::default()),
        Some(s) => s.parse().map_err(|_| CommandError::InvalidStatus),
    }
}

/// Blank means "no follow-up". Anything else must be a real date written
/// exactly as `YYYY-MM-DD`.
pub fn parse_follow_up_date(raw: Option<&str>) -> Result<Option<NaiveDate>, CommandError> {
    let raw = trimmed(raw);
    if raw.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| CommandError::InvalidDate)?;
    // Reject forms chrono tolerates but that do not round-trip, such as 2024-1-5.
    if date.format(DATE_FORMAT).to_string() != raw {
        return Err(CommandError::InvalidDate);
    }
    Ok(Some(date))
}

fn trimmed(raw: Option<&str>) -> &str {
    raw.map(str::trim).unwrap_or_default()
}

fn optional(raw: Option<&str>) -> Option<String> {
    Some(trimmed(raw)).filter(|s| !s.is_empty()).map(str::to_string)
}
