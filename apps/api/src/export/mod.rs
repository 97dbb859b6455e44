pub mod csv_export;
pub mod ics;

use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::jobs::store;

/// `<prefix>_<YYYYmmdd_HHMMSS>.<ext>`, stamped in the display zone.
pub fn export_filename(
    prefix: &str,
    extension: &str,
    now: DateTime<Utc>,
    tz: Tz,
) -> String {
    format!(
        "{prefix}_{}.{extension}",
        now.with_timezone(&tz).format("%Y%m%d_%H%M%S")
    )
}

/// Wraps an export body in a download response.
pub fn attachment(content_type: &'static str, filename: &str, body: impl Into<Body>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body.into(),
    )
        .into_response()
}

/// GET /?export=csv
pub async fn csv_response(pool: &SqlitePool, tz: Tz) -> Result<Response, AppError> {
    let jobs = store::all_jobs(pool).await?;
    let body = csv_export::write_csv(&jobs, tz)?;
    tracing::info!(rows = jobs.len(), "exported CSV");

    let filename = export_filename("jobtrackr_export", "csv", Utc::now(), tz);
    Ok(attachment("text/csv; charset=utf-8", &filename, body))
}

/// GET /?export=ics
pub async fn ics_response(pool: &SqlitePool, tz: Tz) -> Result<Response, AppError> {
    let jobs = store::jobs_with_follow_up(pool).await?;
    let now = Utc::now();
    let body = ics::write_calendar(&jobs, now);
    tracing::info!(events = jobs.len(), "exported calendar");

    let filename = export_filename("jobtrackr_followups", "ics", now, tz);
    Ok(attachment("text/calendar; charset=utf-8", &filename, body))
}
