use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local};
use serde::Serialize;

use crate::models::{Entry, JawRest, PainLevel};

pub const RECENT_LEN: usize = 5;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub pain_count: usize,
    pub jaw_rest_count: usize,
    pub last_week_count: usize,
    /// Rounded percentages, 0 without entries.
    pub pain_ratio: u32,
    pub jaw_rest_ratio: u32,
    pub activity_counts: BTreeMap<String, usize>,
    pub recent: Vec<Entry>,
}

/// `entries` are newest first, as stored.
pub fn compute_stats(entries: &[Entry], now: DateTime<Local>) -> Stats {
    let total = entries.len();
    let pain_count = entries.iter().filter(|e| e.pain_level != PainLevel::Aucune).count();
    let jaw_rest_count = entries.iter().filter(|e| e.jaw_rest == JawRest::Oui).count();
    let week_ago = now - Duration::days(7);
    let last_week_count = entries
        .iter()
        .filter(|e| {
            DateTime::parse_from_rfc3339(&e.timestamp)
                .map(|at| at.with_timezone(&Local) >= week_ago)
                .unwrap_or(false)
        })
        .count();

    let mut activity_counts = BTreeMap::new();
    for entry in entries {
        *activity_counts.entry(entry.activity.label().to_string()).or_insert(0) += 1;
    }

    Stats {
        total,
        pain_count,
        jaw_rest_count,
        last_week_count,
        pain_ratio: percent(pain_count, total),
        jaw_rest_ratio: percent(jaw_rest_count, total),
        activity_counts,
        recent: entries.iter().take(RECENT_LEN).cloned().collect(),
    }
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 * 100.0 / total as f64).round() as u32
}
