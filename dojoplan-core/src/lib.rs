//! dojoplan-core: the weekly training-plan engine.
//!
//! Builds each user's 7-day task plan from the requirement catalog, their
//! recorded progress, pinned and skipped tasks, scheduled games and daily
//! work goal. The engine is pure: it never mutates caller state and never
//! touches the clock, the network or storage.

pub mod plan;
pub mod requirement;
pub mod score;
pub mod suggestion;
pub mod time;
pub mod timeline;
pub mod user;

pub use plan::{
    assign_time_to_tasks, generation_reason, GenerationReason, PlanContext, PlanTask, PlannedTask,
    SuggestedTask, WeeklyPlan, WeeklySuggestedTasks, SCHEDULE_CLASSICAL_GAME_TASK_ID,
};
pub use requirement::{
    current_count, current_score, is_blocked, is_complete, is_expired, remaining_score,
    remaining_suggestion_score, total_count, total_score, unit_score, CustomTask, Requirement,
    RequirementCategory, RequirementProgress, ScoreboardDisplay, TrainingTask, ALL_COHORTS,
};
pub use score::{
    category_score, rank_categories, remaining_category_score_percent, SUGGESTED_TASK_CATEGORIES,
};
pub use suggestion::{
    TaskSuggestionAlgorithm, ANNOTATE_GAMES_TASK, CLASSICAL_GAMES_TASK, MAX_SUGGESTED_TASKS,
    REVIEW_HIGHER_RATED_TASK,
};
pub use time::{local_today, week_window, weekday_index};
pub use timeline::{minutes_spent_between, minutes_spent_on, TimelineEntry};
pub use user::{
    GameScheduleEntry, SubscriptionStatus, User, WorkGoalSettings, DEFAULT_MINUTES_PER_TASK,
    DEFAULT_WORK_GOAL,
};
