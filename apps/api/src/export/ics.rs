use chrono::{DateTime, Utc};

use crate::models::job::JobApplication;

pub const PRODID: &str = "-//JobTrackr//EN";

/// Content lines longer than this many octets are folded.
const MAX_LINE_OCTETS: usize = 75;

/// Stable per-record identifier, so re-importing an export updates events
/// instead of duplicating them.
pub fn event_uid(id: i64) -> String {
    format!("jobtrackr-{id}@localhost")
}

/// Builds an iCalendar document with one all-day event per application that
/// has a follow-up date, soonest first. Undated applications are skipped.
pub fn write_calendar(jobs: &[JobApplication], stamp: DateTime<Utc>) -> String {
    let mut dated: Vec<_> = jobs
        .iter()
        .filter_map(|job| job.next_action_date.map(|date| (date, job)))
        .collect();
    dated.sort_by_key(|(date, job)| (*date, job.id));

    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{PRODID}"));
    push_line(&mut out, "CALSCALE:GREGORIAN");

    for (date, job) in dated {
        let summary = format!("Follow-up: {} @ {}", job.title, job.company);
        push_line(&mut out, "BEGIN:VEVENT");
        push_line(&mut out, &format!("UID:{}", event_uid(job.id)));
        push_line(&mut out, &format!("DTSTAMP:{dtstamp}"));
        push_line(&mut out, &format!("DTSTART;VALUE=DATE:{}", date.format("%Y%m%d")));
        push_line(&mut out, &format!("SUMMARY:{}", escape_text(&summary)));
        push_line(&mut out, "END:VEVENT");
    }

    push_line(&mut out, "END:VCALENDAR");
    out
}

/// TEXT value escaping. Line breaks become spaces so the summary stays on one line.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\r' | '\n' => escaped.push(' '),
            '\\' | ';' | ',' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Appends a CRLF-terminated content line, folding on character boundaries.
fn push_line(out: &mut String, line: &str) {
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out.push_str("\r\n");
}
