use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::export;
use crate::jobs::commands::{handle_command, CommandForm, Flash};
use crate::jobs::query::{list_jobs, ListFilter};
use crate::models::job::{ApplicationStatus, JobApplication};
use crate::session::Session;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub status: Option<String>,
    pub q: Option<String>,
    pub export: Option<String>,
}

/// Everything a page renderer needs: the outcome of the last command, the
/// active filters, the status vocabulary and the matching applications.
#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub flash: Option<Flash>,
    pub filter_status: &'static str,
    pub q: String,
    pub statuses: Vec<&'static str>,
    pub csrf_token: String,
    pub jobs: Vec<JobApplication>,
}

/// GET /
pub async fn handle_index(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<PageQuery>,
) -> Result<Response, AppError> {
    match params.export.as_deref() {
        Some("csv") => return export::csv_response(&state.db, state.config.display_tz).await,
        Some("ics") => return export::ics_response(&state.db, state.config.display_tz).await,
        _ => {}
    }

    let (jar, session) = state.sessions.load_or_start(jar);
    let page = build_page(&state, &session, &params, None).await?;
    Ok((jar, Json(page)).into_response())
}

/// POST /
pub async fn handle_command_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<PageQuery>,
    Form(form): Form<CommandForm>,
) -> Result<Response, AppError> {
    let session = state.sessions.find(&jar).ok_or_else(|| {
        tracing::warn!("rejected command without a known session");
        AppError::Forbidden
    })?;

    let flash = handle_command(&state.db, &session, &form).await?;
    let page = build_page(&state, &session, &params, flash).await?;
    Ok(Json(page).into_response())
}

async fn build_page(
    state: &AppState,
    session: &Session,
    params: &PageQuery,
    flash: Option<Flash>,
) -> Result<PageResponse, AppError> {
    let filter = ListFilter::from_params(params.status.as_deref(), params.q.as_deref());
    let jobs = list_jobs(&state.db, &filter).await?;

    Ok(PageResponse {
        flash,
        filter_status: filter.status_param(),
        q: filter.search.unwrap_or_default(),
        statuses: ApplicationStatus::ALL.iter().map(|s| s.as_str()).collect(),
        csrf_token: session.csrf_token().to_string(),
        jobs,
    })
}
