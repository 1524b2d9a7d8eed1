//! Timeline log: immutable historical records of progress updates.
//!
//! The log consumed by the engine is ordered descending by date. Entries are
//! append-mostly and never mutated here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One historical progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: String,
    pub requirement_id: String,
    pub cohort: String,
    pub date: DateTime<Utc>,
    pub previous_count: i32,
    pub new_count: i32,
    pub minutes_spent: i32,
    pub dojo_points: f32,
}

impl TimelineEntry {
    pub fn new(
        id: impl Into<String>,
        requirement_id: impl Into<String>,
        cohort: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            requirement_id: requirement_id.into(),
            cohort: cohort.into(),
            date,
            previous_count: 0,
            new_count: 0,
            minutes_spent: 0,
            dojo_points: 0.0,
        }
    }

    pub fn with_counts(mut self, previous: i32, new: i32) -> Self {
        self.previous_count = previous;
        self.new_count = new;
        self
    }

    pub fn with_minutes_spent(mut self, minutes: i32) -> Self {
        self.minutes_spent = minutes;
        self
    }

    pub fn with_dojo_points(mut self, points: f32) -> Self {
        self.dojo_points = points;
        self
    }
}

/// Total minutes recorded in `[start, end)`, across all tasks.
pub fn minutes_spent_between(
    timeline: &[TimelineEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> i32 {
    timeline
        .iter()
        .filter(|e| e.date >= start && e.date < end)
        .map(|e| e.minutes_spent)
        .sum()
}

/// Total minutes recorded for one task in the given cohort.
pub fn minutes_spent_on(timeline: &[TimelineEntry], requirement_id: &str, cohort: &str) -> i32 {
    timeline
        .iter()
        .filter(|e| e.requirement_id == requirement_id && e.cohort == cohort)
        .map(|e| e.minutes_spent)
        .sum()
}
