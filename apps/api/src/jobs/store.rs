use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::jobs::commands::JobFields;
use crate::models::job::{ApplicationStatus, JobApplication};

/// Inserts a new application and returns its generated id.
pub async fn insert_job(
    pool: &SqlitePool,
    fields: &JobFields,
    created_at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO jobs
            (title, company, location, url, status, salary, next_action_date, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&fields.title)
    .bind(&fields.company)
    .bind(&fields.location)
    .bind(&fields.url)
    .bind(fields.status.as_str())
    .bind(&fields.salary)
    .bind(fields.next_action_date)
    .bind(&fields.notes)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Overwrites every mutable column. `id` and `created_at` are left alone.
/// Returns the number of rows touched, which is zero for an unknown id.
pub async fn update_job(pool: &SqlitePool, id: i64, fields: &JobFields) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET title = ?, company = ?, location = ?, url = ?, status = ?,
            salary = ?, next_action_date = ?, notes = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.title)
    .bind(&fields.company)
    .bind(&fields.location)
    .bind(&fields.url)
    .bind(fields.status.as_str())
    .bind(&fields.salary)
    .bind(fields.next_action_date)
    .bind(&fields.notes)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    status: ApplicationStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE jobs SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_job(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
pub async fn get_job(pool: &SqlitePool, id: i64) -> Result<Option<JobApplication>, sqlx::Error> {
    sqlx::query_as::<_, JobApplication>("SELECT * FROM jobs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// The whole store, newest first. Feeds the CSV export.
pub async fn all_jobs(pool: &SqlitePool) -> Result<Vec<JobApplication>, sqlx::Error> {
    sqlx::query_as::<_, JobApplication>("SELECT * FROM jobs ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await
}

/// Applications with a follow-up date, soonest first. Feeds the calendar export.
pub async fn jobs_with_follow_up(pool: &SqlitePool) -> Result<Vec<JobApplication>, sqlx::Error> {
    sqlx::query_as::<_, JobApplication>(
        r#"
        SELECT * FROM jobs
        WHERE next_action_date IS NOT NULL AND next_action_date <> ''
        ORDER BY next_action_date ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}
