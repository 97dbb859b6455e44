use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::job::{ApplicationStatus, JobApplication};

/// Sentinel accepted by the `status` filter meaning "no status restriction".
pub const ALL_STATUSES: &str = "all";

/// Listing filter decoded from the `status` and `q` request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
}

impl ListFilter {
    /// Unknown status values fall back to "all" instead of erroring, and a
    /// blank search is treated as no search.
    pub fn from_params(status: Option<&str>, search: Option<&str>) -> Self {
        let status = status
            .filter(|s| *s != ALL_STATUSES)
            .and_then(|s| s.parse::<ApplicationStatus>().ok());
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        ListFilter { status, search }
    }

    /// The effective `status` parameter, as echoed back to the page.
    pub fn status_param(&self) -> &'static str {
        self.status.map_or(ALL_STATUSES, |s| s.as_str())
    }

    /// Builds the listing query for the status restriction. User input only
    /// ever reaches SQLite as a bound parameter.
    pub fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT * FROM jobs WHERE 1=1");

        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }

        qb.push(" ORDER BY created_at DESC, id DESC");
        qb
    }

    /// Substring search over title, company and location. Case folding is
    /// full Unicode, which SQLite's `LIKE` does not do.
    pub fn matches(&self, job: &JobApplication) -> bool {
        let Some(search) = &self.search else {
            return true;
        };
        let needle = search.to_lowercase();
        [Some(&job.title), Some(&job.company), job.location.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Returns every application matching the filter, newest first.
pub async fn list_jobs(
    pool: &SqlitePool,
    filter: &ListFilter,
) -> Result<Vec<JobApplication>, sqlx::Error> {
    let mut qb = filter.build();
    let mut jobs = qb.build_query_as::<JobApplication>().fetch_all(pool).await?;
    jobs.retain(|job| filter.matches(job));
    Ok(jobs)
}
