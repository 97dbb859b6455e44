use chrono::SecondsFormat;
use chrono_tz::Tz;
use serde::Serialize;

use crate::jobs::commands::DATE_FORMAT;
use crate::models::job::JobApplication;

pub const CSV_HEADER: [&str; 10] = [
    "id",
    "title",
    "company",
    "location",
    "url",
    "status",
    "salary",
    "next_action_date",
    "notes",
    "created_at",
];

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: i64,
    title: &'a str,
    company: &'a str,
    location: Option<&'a str>,
    url: Option<&'a str>,
    status: &'static str,
    salary: Option<&'a str>,
    next_action_date: Option<String>,
    notes: Option<&'a str>,
    created_at: String,
}

impl<'a> CsvRow<'a> {
    fn new(job: &'a JobApplication, tz: Tz) -> Self {
        CsvRow {
            id: job.id,
            title: &job.title,
            company: &job.company,
            location: job.location.as_deref(),
            url: job.url.as_deref(),
            status: job.status.as_str(),
            salary: job.salary.as_deref(),
            next_action_date: job
                .next_action_date
                .map(|d| d.format(DATE_FORMAT).to_string()),
            notes: job.notes.as_deref(),
            created_at: job
                .created_at
                .with_timezone(&tz)
                .fixed_offset()
                .to_rfc3339_opts(SecondsFormat::AutoSi, false),
        }
    }
}

/// Serializes applications as CSV in the order given. The header row is
/// always written, even for an empty store.
pub fn write_csv(jobs: &[JobApplication], tz: Tz) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for job in jobs {
        writer.serialize(CsvRow::new(job, tz))?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
