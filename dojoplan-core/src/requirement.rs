//! Requirement catalog types and the completion/score helpers that the
//! suggestion algorithm is built on.
//!
//! Requirements are administrator-authored training task templates with
//! per-cohort targets. Everything in this module is pure over its inputs:
//! missing progress reads as "no work done yet", never as an error.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::timeline::TimelineEntry;
use crate::user::User;

/// Cohort key for progress shared across all cohorts.
pub const ALL_COHORTS: &str = "ALL_COHORTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementCategory {
    Welcome,
    Games,
    Tactics,
    Middlegames,
    Endgame,
    Opening,
    NonDojo,
}

/// How progress on a task is displayed and therefore measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreboardDisplay {
    #[default]
    ProgressBar,
    Checkbox,
    /// Progress is measured in minutes worked rather than repetitions.
    Minutes,
    NonDojo,
    Hidden,
}

/// An administrator-defined training task template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    pub name: String,
    pub category: RequirementCategory,

    /// Cohort -> target count. A requirement with no entry for a cohort
    /// (and no ALL_COHORTS entry) is not applicable to that cohort.
    pub counts: HashMap<String, i32>,

    /// The count progress starts from (e.g. chapter 3 of a book).
    pub start_count: i32,

    /// 0/1: progress is shared across cohorts; -1: progress resets per
    /// cohort; N: the task must be repeated in N cohorts.
    pub number_of_cohorts: i32,

    /// Dojo points per completed unit.
    pub unit_score: f32,

    /// Per-cohort overrides for the unit score.
    pub unit_score_override: HashMap<String, f32>,

    /// If non-zero, the task awards this score all-or-nothing on completion.
    pub total_score: f32,

    pub scoreboard_display: ScoreboardDisplay,

    /// Days before recorded progress lapses. -1 never expires.
    pub expiration_days: i32,

    /// Requirements that must be complete before this one is available.
    pub blockers: Vec<String>,

    /// Visible to free-tier users.
    pub is_free: bool,

    /// Atomic tasks rank with their full score remaining until finished,
    /// so partial progress never deprioritizes them.
    pub atomic: bool,

    /// Minutes one sitting is expected to take. Funds Welcome tasks.
    pub expected_minutes: i32,
}

impl Requirement {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: RequirementCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            counts: HashMap::new(),
            start_count: 0,
            number_of_cohorts: 0,
            unit_score: 1.0,
            unit_score_override: HashMap::new(),
            total_score: 0.0,
            scoreboard_display: ScoreboardDisplay::ProgressBar,
            expiration_days: -1,
            blockers: Vec::new(),
            is_free: false,
            atomic: false,
            expected_minutes: 0,
        }
    }

    pub fn with_count(mut self, cohort: impl Into<String>, count: i32) -> Self {
        self.counts.insert(cohort.into(), count);
        self
    }

    pub fn with_start_count(mut self, start_count: i32) -> Self {
        self.start_count = start_count;
        self
    }

    pub fn with_number_of_cohorts(mut self, n: i32) -> Self {
        self.number_of_cohorts = n;
        self
    }

    pub fn with_unit_score(mut self, unit_score: f32) -> Self {
        self.unit_score = unit_score;
        self
    }

    pub fn with_total_score(mut self, total_score: f32) -> Self {
        self.total_score = total_score;
        self
    }

    pub fn with_scoreboard_display(mut self, display: ScoreboardDisplay) -> Self {
        self.scoreboard_display = display;
        self
    }

    pub fn with_expiration_days(mut self, days: i32) -> Self {
        self.expiration_days = days;
        self
    }

    pub fn with_blockers(mut self, blockers: Vec<String>) -> Self {
        self.blockers = blockers;
        self
    }

    pub fn with_is_free(mut self, is_free: bool) -> Self {
        self.is_free = is_free;
        self
    }

    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn with_expected_minutes(mut self, minutes: i32) -> Self {
        self.expected_minutes = minutes;
        self
    }
}

/// A user-authored analog of [`Requirement`], owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTask {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub category: RequirementCategory,
    pub counts: HashMap<String, i32>,
    pub scoreboard_display: ScoreboardDisplay,
}

impl CustomTask {
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
        category: RequirementCategory,
    ) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            name: name.into(),
            category,
            counts: HashMap::new(),
            scoreboard_display: ScoreboardDisplay::ProgressBar,
        }
    }

    pub fn with_count(mut self, cohort: impl Into<String>, count: i32) -> Self {
        self.counts.insert(cohort.into(), count);
        self
    }
}

/// A user's accumulated state for one requirement or custom task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementProgress {
    pub requirement_id: String,
    /// Cohort-keyed (or ALL_COHORTS-keyed) current counts.
    pub counts: HashMap<String, i32>,
    pub minutes_spent: HashMap<String, i32>,
    pub updated_at: DateTime<Utc>,
}

impl RequirementProgress {
    pub fn new(requirement_id: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            requirement_id: requirement_id.into(),
            counts: HashMap::new(),
            minutes_spent: HashMap::new(),
            updated_at,
        }
    }

    pub fn with_count(mut self, cohort: impl Into<String>, count: i32) -> Self {
        self.counts.insert(cohort.into(), count);
        self
    }

    pub fn with_minutes(mut self, cohort: impl Into<String>, minutes: i32) -> Self {
        self.minutes_spent.insert(cohort.into(), minutes);
        self
    }
}

/// Common surface of [`Requirement`] and [`CustomTask`], so the
/// completion helpers work on either.
pub trait TrainingTask {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn category(&self) -> RequirementCategory;
    fn counts(&self) -> &HashMap<String, i32>;
    fn scoreboard_display(&self) -> ScoreboardDisplay;
    fn number_of_cohorts(&self) -> i32;
    fn start_count(&self) -> i32 {
        0
    }
    fn blockers(&self) -> &[String] {
        &[]
    }
}

impl TrainingTask for Requirement {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn category(&self) -> RequirementCategory {
        self.category
    }
    fn counts(&self) -> &HashMap<String, i32> {
        &self.counts
    }
    fn scoreboard_display(&self) -> ScoreboardDisplay {
        self.scoreboard_display
    }
    fn number_of_cohorts(&self) -> i32 {
        self.number_of_cohorts
    }
    fn start_count(&self) -> i32 {
        self.start_count
    }
    fn blockers(&self) -> &[String] {
        &self.blockers
    }
}

impl TrainingTask for CustomTask {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn category(&self) -> RequirementCategory {
        self.category
    }
    fn counts(&self) -> &HashMap<String, i32> {
        &self.counts
    }
    fn scoreboard_display(&self) -> ScoreboardDisplay {
        self.scoreboard_display
    }
    fn number_of_cohorts(&self) -> i32 {
        // Custom tasks are always tracked per cohort.
        -1
    }
}

/// The target count of a task for the given cohort, with an ALL_COHORTS
/// fallback. 0 means the task is not applicable to the cohort.
pub fn total_count(cohort: &str, task: &dyn TrainingTask) -> i32 {
    task.counts()
        .get(cohort)
        .or_else(|| task.counts().get(ALL_COHORTS))
        .copied()
        .unwrap_or(0)
}

/// The current progress count of a task for the given cohort.
///
/// Tasks sharing progress across cohorts (`number_of_cohorts` 0 or 1) read
/// the ALL_COHORTS bucket. Minutes-display tasks measure time worked, taken
/// from the timeline when one is available. Missing progress reads as the
/// task's start count.
pub fn current_count(
    cohort: &str,
    task: &dyn TrainingTask,
    progress: Option<&RequirementProgress>,
    timeline: &[TimelineEntry],
) -> i32 {
    let bucket = if matches!(task.number_of_cohorts(), 0 | 1) {
        ALL_COHORTS
    } else {
        cohort
    };

    if task.scoreboard_display() == ScoreboardDisplay::Minutes {
        if !timeline.is_empty() {
            return timeline
                .iter()
                .filter(|e| e.requirement_id == task.id() && e.cohort == cohort)
                .map(|e| e.minutes_spent)
                .sum();
        }
        return progress
            .and_then(|p| p.minutes_spent.get(bucket))
            .copied()
            .unwrap_or(0);
    }

    let Some(progress) = progress else {
        return task.start_count();
    };
    progress
        .counts
        .get(bucket)
        .copied()
        .unwrap_or(task.start_count())
}

/// Dojo points per unit of the requirement for the given cohort.
pub fn unit_score(cohort: &str, requirement: &Requirement) -> f32 {
    requirement
        .unit_score_override
        .get(cohort)
        .copied()
        .unwrap_or(requirement.unit_score)
}

/// Total attainable score of the requirement for the cohort.
pub fn total_score(cohort: &str, requirement: &Requirement) -> f32 {
    if total_count(cohort, requirement) == 0 {
        return 0.0;
    }
    if requirement.total_score > 0.0 {
        return requirement.total_score;
    }
    let units = (total_count(cohort, requirement) - requirement.start_count).max(0);
    unit_score(cohort, requirement) * units as f32
}

/// Score earned so far on the requirement for the cohort.
pub fn current_score(
    cohort: &str,
    requirement: &Requirement,
    progress: Option<&RequirementProgress>,
    timeline: &[TimelineEntry],
) -> f32 {
    if requirement.total_score > 0.0 {
        if is_complete(cohort, requirement, progress, timeline, false) {
            return requirement.total_score;
        }
        return 0.0;
    }
    let target = total_count(cohort, requirement);
    let count = current_count(cohort, requirement, progress, timeline).min(target);
    let units = (count - requirement.start_count).max(0);
    unit_score(cohort, requirement) * units as f32
}

/// Score still attainable on the requirement for the cohort.
pub fn remaining_score(
    cohort: &str,
    requirement: &Requirement,
    progress: Option<&RequirementProgress>,
    timeline: &[TimelineEntry],
) -> f32 {
    (total_score(cohort, requirement) - current_score(cohort, requirement, progress, timeline))
        .max(0.0)
}

/// Remaining score as ranked by the suggestion algorithm. Atomic tasks
/// report their full total so partial progress never makes them look
/// "almost done".
pub fn remaining_suggestion_score(
    cohort: &str,
    requirement: &Requirement,
    progress: Option<&RequirementProgress>,
    timeline: &[TimelineEntry],
) -> f32 {
    if requirement.atomic {
        return total_score(cohort, requirement);
    }
    remaining_score(cohort, requirement, progress, timeline)
}

/// Whether the task is complete for the cohort. With
/// `count_partial_as_complete`, any progress past the start count counts as
/// complete (used when deciding whether pinned tasks still need suggesting).
pub fn is_complete(
    cohort: &str,
    task: &dyn TrainingTask,
    progress: Option<&RequirementProgress>,
    timeline: &[TimelineEntry],
    count_partial_as_complete: bool,
) -> bool {
    let count = current_count(cohort, task, progress, timeline);
    if count_partial_as_complete && count > task.start_count() {
        return true;
    }
    count >= total_count(cohort, task)
}

/// Whether recorded progress has lapsed.
pub fn is_expired(
    requirement: &Requirement,
    progress: &RequirementProgress,
    now: DateTime<Utc>,
) -> bool {
    requirement.expiration_days >= 0
        && now - progress.updated_at > Duration::days(requirement.expiration_days as i64)
}

/// Whether the task is blocked by an incomplete prerequisite. Returns a
/// human-readable reason naming the first incomplete blocker.
pub fn is_blocked(
    cohort: &str,
    user: &User,
    task: &dyn TrainingTask,
    all_requirements: &[Requirement],
    timeline: &[TimelineEntry],
) -> Option<String> {
    for blocker_id in task.blockers() {
        let Some(blocker) = all_requirements.iter().find(|r| &r.id == blocker_id) else {
            continue;
        };
        if !is_complete(
            cohort,
            blocker,
            user.progress.get(blocker_id),
            timeline,
            false,
        ) {
            return Some(format!("This task requires completing {} first", blocker.name));
        }
    }
    None
}
