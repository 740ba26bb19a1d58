//! Derived statistics over synced history records.
//!
//! Pure functions over records read back from the record store. Counts are
//! visit-weighted unless noted; all time bucketing is UTC. Records with a
//! malformed visit time are skipped by the time-based breakdowns.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Timelike, Weekday};
use url::Url;

use crate::models::StoredRecord;
use crate::util::div_round;

const DAY_MS: i64 = 86_400_000;

/// Headline numbers for a record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStats {
    /// Sum of visit counts across all records
    pub total_visits: i64,
    /// Distinct URLs
    pub unique_sites: usize,
    /// Distinct users, keyed by install id with email fallback
    pub active_users: usize,
    /// Days spanned by the oldest and newest visit, at least 1
    pub date_range_days: i64,
    /// Total visits averaged over the date range, rounded
    pub avg_daily_visits: i64,
}

/// A short human-readable observation about the record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub title: String,
    pub description: String,
}

pub fn compute_stats(records: &[StoredRecord]) -> HistoryStats {
    let total_visits: i64 = records
        .iter()
        .map(StoredRecord::effective_visit_count)
        .sum();
    let unique_sites = records
        .iter()
        .map(|record| record.url.as_str())
        .collect::<HashSet<_>>()
        .len();
    let active_users = records
        .iter()
        .map(|record| {
            if record.user_id.is_empty() {
                record.user_email.as_str()
            } else {
                record.user_id.as_str()
            }
        })
        .collect::<HashSet<_>>()
        .len();

    let date_range_days = date_range_days(records);
    let avg_daily_visits = div_round(total_visits, date_range_days.max(1));

    HistoryStats {
        total_visits,
        unique_sites,
        active_users,
        date_range_days,
        avg_daily_visits,
    }
}

/// Visit counts per UTC calendar day, keyed `YYYY-MM-DD`.
pub fn visits_by_day(records: &[StoredRecord]) -> BTreeMap<String, i64> {
    let mut daily = BTreeMap::new();
    for record in records {
        let Some(timestamp) = record.visit_timestamp() else {
            continue;
        };
        let day = timestamp.format("%Y-%m-%d").to_string();
        *daily.entry(day).or_insert(0) += record.effective_visit_count();
    }
    daily
}

/// Visit counts per UTC hour of day.
pub fn visits_by_hour(records: &[StoredRecord]) -> [i64; 24] {
    let mut hourly = [0i64; 24];
    for record in records {
        if let Some(timestamp) = record.visit_timestamp() {
            hourly[timestamp.hour() as usize] += record.effective_visit_count();
        }
    }
    hourly
}

/// Visit counts per domain, busiest first. URLs that do not parse fall
/// into an `Unknown` bucket.
pub fn visits_by_domain(records: &[StoredRecord]) -> Vec<(String, i64)> {
    let mut domains: HashMap<String, i64> = HashMap::new();
    for record in records {
        let domain = Url::parse(&record.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string());
        *domains.entry(domain).or_insert(0) += record.effective_visit_count();
    }
    sorted_desc(domains)
}

/// Visit counts per user, busiest first. Users are keyed by email, then
/// install id, then `Unknown`.
pub fn visits_by_user(records: &[StoredRecord]) -> Vec<(String, i64)> {
    let mut users: HashMap<String, i64> = HashMap::new();
    for record in records {
        let user = if !record.user_email.is_empty() {
            record.user_email.clone()
        } else if !record.user_id.is_empty() {
            record.user_id.clone()
        } else {
            "Unknown".to_string()
        };
        *users.entry(user).or_insert(0) += record.effective_visit_count();
    }
    sorted_desc(users)
}

/// The `limit` most-visited URLs with their visit counts.
pub fn top_sites(records: &[StoredRecord], limit: usize) -> Vec<(String, i64)> {
    let mut sites: HashMap<String, i64> = HashMap::new();
    for record in records {
        *sites.entry(record.url.clone()).or_insert(0) += record.effective_visit_count();
    }
    let mut ranked = sorted_desc(sites);
    ranked.truncate(limit);
    ranked
}

/// Observations over the record set; empty when there are no records.
///
/// The domain share intentionally divides weighted domain visits by the raw
/// record count, so it can exceed 100% when visit counts are high. The
/// weekday ratio counts records, not visits.
pub fn generate_insights(records: &[StoredRecord]) -> Vec<Insight> {
    if records.is_empty() {
        return Vec::new();
    }
    let mut insights = Vec::new();

    let hourly = visits_by_hour(records);
    let mut peak_hour = 0usize;
    for (hour, &count) in hourly.iter().enumerate() {
        // Strict comparison: a tie keeps the earlier hour.
        if count > hourly[peak_hour] {
            peak_hour = hour;
        }
    }
    insights.push(Insight {
        title: "Peak Usage Time".to_string(),
        description: format!(
            "Most active at {peak_hour}:00 with {} visits",
            hourly[peak_hour]
        ),
    });

    let daily = visits_by_day(records);
    let mut top_day: Option<(&String, i64)> = None;
    for (day, &count) in &daily {
        if top_day.is_none_or(|(_, top_count)| count > top_count) {
            top_day = Some((day, count));
        }
    }
    if let Some((day, count)) = top_day {
        insights.push(Insight {
            title: "Most Active Day".to_string(),
            description: format!("{day} with {count} visits"),
        });
    }

    let domains = visits_by_domain(records);
    if let Some((domain, count)) = domains.first() {
        let percentage = div_round(count * 100, to_i64(records.len()));
        insights.push(Insight {
            title: "Browse Diversity".to_string(),
            description: format!("Top domain ({domain}) represents {percentage}% of all visits"),
        });
    }

    let weekend = records
        .iter()
        .filter(|record| {
            record
                .visit_timestamp()
                .is_some_and(|timestamp| {
                    matches!(timestamp.weekday(), Weekday::Sat | Weekday::Sun)
                })
        })
        .count();
    let weekday = records.len() - weekend;
    let ratio = div_round(to_i64(weekday), to_i64(weekend).max(1));
    insights.push(Insight {
        title: "Work-Life Pattern".to_string(),
        description: format!("{ratio}x more active on weekdays vs weekends"),
    });

    insights
}

/// Render records as CSV with the export columns of the web dashboard.
/// Cells are double-quoted with embedded quotes doubled.
pub fn render_csv(records: &[StoredRecord]) -> String {
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(csv_row(&[
        "URL",
        "Title",
        "Visit Time",
        "Visit Count",
        "User Email",
        "User ID",
    ]));
    for record in records {
        let visit_count = record.effective_visit_count().to_string();
        rows.push(csv_row(&[
            record.url.as_str(),
            record.title.as_str(),
            record.visit_time.as_str(),
            visit_count.as_str(),
            record.user_email.as_str(),
            record.user_id.as_str(),
        ]));
    }
    rows.join("\n")
}

fn csv_row(cells: &[&str]) -> String {
    cells
        .iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

fn date_range_days(records: &[StoredRecord]) -> i64 {
    let times: Vec<i64> = records
        .iter()
        .filter_map(StoredRecord::visit_timestamp)
        .map(|timestamp| timestamp.timestamp_millis())
        .collect();
    let (Some(min), Some(max)) = (times.iter().min(), times.iter().max()) else {
        return 1;
    };
    let days = (max - min + DAY_MS - 1) / DAY_MS;
    if days == 0 {
        1
    } else {
        days
    }
}

fn sorted_desc(counts: HashMap<String, i64>) -> Vec<(String, i64)> {
    let mut entries: Vec<(String, i64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
