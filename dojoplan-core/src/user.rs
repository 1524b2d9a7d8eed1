//! User profile: progress, pinned/skipped tasks, work goal, game schedule
//! and the persisted weekly-plan cache.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::plan::WeeklyPlan;
use crate::requirement::{CustomTask, RequirementProgress};

/// The work goal used when the user has not configured one.
pub const DEFAULT_WORK_GOAL: WorkGoalSettings = WorkGoalSettings {
    minutes_per_day: [60, 60, 60, 60, 60, 60, 60],
};

/// Nominal minutes one suggested task should receive per day. Days with less
/// remaining time than this fund fewer tasks.
pub const DEFAULT_MINUTES_PER_TASK: i32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    #[default]
    Subscribed,
    FreeTier,
}

/// Target working time per weekday, Sunday-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkGoalSettings {
    pub minutes_per_day: [i32; 7],
}

/// A user-declared commitment to play classical games on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScheduleEntry {
    pub date: NaiveDate,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    /// The rating-band cohort the user currently trains in.
    pub dojo_cohort: String,
    pub subscription_status: SubscriptionStatus,

    /// Requirement id -> accumulated progress.
    pub progress: HashMap<String, RequirementProgress>,
    pub custom_tasks: Vec<CustomTask>,

    /// Ids the user has flagged for priority suggestion, in pin order.
    pub pinned_tasks: Vec<String>,
    /// Ids the user has dismissed from suggestions for the current week.
    pub skipped_tasks: Vec<String>,

    pub work_goal: Option<WorkGoalSettings>,
    /// The last persisted plan, reused when nothing has invalidated it.
    pub weekly_plan: Option<WeeklyPlan>,
    /// Index of the day the user's week starts on (Sunday = 0).
    pub week_start: u32,

    pub game_schedule: Vec<GameScheduleEntry>,
    /// IANA timezone name overriding the default.
    pub timezone: Option<String>,
}

impl User {
    pub fn new(username: impl Into<String>, cohort: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            dojo_cohort: cohort.into(),
            subscription_status: SubscriptionStatus::Subscribed,
            progress: HashMap::new(),
            custom_tasks: Vec::new(),
            pinned_tasks: Vec::new(),
            skipped_tasks: Vec::new(),
            work_goal: None,
            weekly_plan: None,
            week_start: 0,
            game_schedule: Vec::new(),
            timezone: None,
        }
    }

    pub fn with_subscription(mut self, status: SubscriptionStatus) -> Self {
        self.subscription_status = status;
        self
    }

    pub fn with_progress(mut self, progress: RequirementProgress) -> Self {
        self.progress.insert(progress.requirement_id.clone(), progress);
        self
    }

    pub fn with_pinned_tasks(mut self, ids: Vec<String>) -> Self {
        self.pinned_tasks = ids;
        self
    }

    pub fn with_skipped_tasks(mut self, ids: Vec<String>) -> Self {
        self.skipped_tasks = ids;
        self
    }

    pub fn with_work_goal(mut self, work_goal: WorkGoalSettings) -> Self {
        self.work_goal = Some(work_goal);
        self
    }

    pub fn with_weekly_plan(mut self, plan: WeeklyPlan) -> Self {
        self.weekly_plan = Some(plan);
        self
    }

    pub fn with_week_start(mut self, week_start: u32) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn with_game_scheduled(mut self, date: NaiveDate, count: i32) -> Self {
        self.game_schedule.push(GameScheduleEntry { date, count });
        self
    }

    pub fn with_custom_task(mut self, task: CustomTask) -> Self {
        self.custom_tasks.push(task);
        self
    }

    pub fn is_free(&self) -> bool {
        self.subscription_status == SubscriptionStatus::FreeTier
    }

    pub fn work_goal(&self) -> &WorkGoalSettings {
        self.work_goal.as_ref().unwrap_or(&DEFAULT_WORK_GOAL)
    }

    /// The date of the earliest scheduled game on or after `today`.
    pub fn next_scheduled_game(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.game_schedule
            .iter()
            .filter(|e| e.count > 0 && e.date >= today)
            .map(|e| e.date)
            .min()
    }

    pub fn has_game_on(&self, date: NaiveDate) -> bool {
        self.game_schedule
            .iter()
            .any(|e| e.count > 0 && e.date == date)
    }

    /// Timestamp of the most recent progress update, if any.
    pub fn last_progress_update(&self) -> Option<DateTime<Utc>> {
        self.progress.values().map(|p| p.updated_at).max()
    }
}
