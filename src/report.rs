use chrono::{Datelike, Duration, NaiveDate};
use std::fmt::Write;

use crate::models::{source_label, Application, Status, WeekBucket};

/// The Sunday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// Group applications into Sunday-to-Saturday weeks, most recent week first.
/// Within a week, applications are ordered by applied date descending; equal
/// dates keep their input order.
pub fn build_weekly_report(applications: &[Application]) -> Vec<WeekBucket<'_>> {
    let mut sorted: Vec<&Application> = applications.iter().collect();
    sorted.sort_by(|a, b| b.details.applied_date.cmp(&a.details.applied_date));

    let mut buckets = Vec::new();
    let mut current: Option<(NaiveDate, Vec<&Application>)> = None;

    for app in sorted {
        let start = week_start(app.details.applied_date);
        if let Some((open, apps)) = current.as_mut() {
            if *open == start {
                apps.push(app);
                continue;
            }
        }
        if let Some((open, apps)) = current.replace((start, vec![app])) {
            buckets.push(close_bucket(open, apps));
        }
    }
    if let Some((open, apps)) = current {
        buckets.push(close_bucket(open, apps));
    }

    buckets
}

fn close_bucket(start_date: NaiveDate, applications: Vec<&Application>) -> WeekBucket<'_> {
    WeekBucket {
        start_date,
        end_date: start_date + Duration::days(6),
        applications,
    }
}

impl WeekBucket<'_> {
    /// Applications per status, in status order, omitting statuses with none.
    pub fn status_counts(&self) -> Vec<(Status, usize)> {
        Status::ALL
            .iter()
            .map(|status| {
                let n = self
                    .applications
                    .iter()
                    .filter(|a| a.details.status == *status)
                    .count();
                (*status, n)
            })
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Plain-text rendering of the report for the terminal.
pub fn render_report(buckets: &[WeekBucket<'_>]) -> String {
    let mut out = String::new();
    let total: usize = buckets.iter().map(|b| b.applications.len()).sum();
    let _ = writeln!(
        out,
        "Weekly Application Report ({} applications over {} weeks)",
        total,
        buckets.len()
    );

    for bucket in buckets {
        let n = bucket.applications.len();
        let counts = bucket
            .status_counts()
            .iter()
            .map(|(status, n)| format!("{status} {n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} - {}  {} application{}  [{}]",
            format_date(bucket.start_date),
            format_date(bucket.end_date),
            n,
            if n == 1 { "" } else { "s" },
            counts
        );
        let _ = writeln!(
            out,
            "  {:<12} {:<20} {:<24} {:<16} {:<12}",
            "DATE", "COMPANY", "POSITION", "SOURCE", "STATUS"
        );
        for app in &bucket.applications {
            let d = &app.details;
            let _ = writeln!(
                out,
                "  {:<12} {:<20} {:<24} {:<16} {:<12}",
                d.applied_date.format("%Y-%m-%d"),
                truncate(&d.company, 20),
                truncate(&d.position, 24),
                truncate(source_label(&d.source), 16),
                d.status
            );
        }
    }
    out
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
