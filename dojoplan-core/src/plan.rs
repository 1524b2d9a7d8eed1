//! Weekly plan data: the persisted cache blob, the suggested-task union,
//! the time-budgeting rule and the regeneration-reason state machine.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::requirement::{CustomTask, Requirement, RequirementCategory, TrainingTask};
use crate::time::weekday_index;
use crate::user::{WorkGoalSettings, DEFAULT_MINUTES_PER_TASK};

/// Sentinel id for the "schedule your next classical game" prompt, used
/// when the prompt round-trips through the persisted plan.
pub const SCHEDULE_CLASSICAL_GAME_TASK_ID: &str = "schedule-classical-game";

/// One cached task: just an id and its allotted minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub id: String,
    pub minutes: i32,
}

/// The persisted weekly-plan cache, stored on the user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    /// Exclusive end of the 7-day window the plan covers.
    pub end_date: NaiveDate,
    /// Tasks indexed by day of the week (Sunday = 0).
    pub tasks: [Vec<PlannedTask>; 7],
    /// The most recent progress update at the time the plan was generated.
    pub progress_updated_at: Option<DateTime<Utc>>,
    /// The pinned-task ids the plan was generated against, in pin order.
    pub pinned_tasks: Vec<String>,
    /// The next scheduled game at the time the plan was generated.
    pub next_game: Option<NaiveDate>,
}

impl WeeklyPlan {
    /// The cache blob the caller persists after a computation.
    pub fn from_suggestions(suggestions: &WeeklySuggestedTasks, pinned_tasks: Vec<String>) -> Self {
        let tasks = suggestions.suggestions_by_day.clone().map(|day| {
            day.into_iter()
                .map(|s| PlannedTask {
                    id: s.task.id().to_string(),
                    minutes: s.goal_minutes,
                })
                .collect()
        });
        Self {
            end_date: suggestions.end_date,
            tasks,
            progress_updated_at: suggestions.progress_updated_at,
            pinned_tasks,
            next_game: suggestions.next_game,
        }
    }
}

/// A task appearing in a day's suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanTask {
    Requirement(Requirement),
    Custom(CustomTask),
    /// Prompt to schedule the next classical game. Carries no requirement
    /// and never receives a time budget.
    ScheduleGamePrompt,
}

impl PlanTask {
    pub fn id(&self) -> &str {
        match self {
            PlanTask::Requirement(r) => &r.id,
            PlanTask::Custom(c) => &c.id,
            PlanTask::ScheduleGamePrompt => SCHEDULE_CLASSICAL_GAME_TASK_ID,
        }
    }

    pub fn category(&self) -> Option<RequirementCategory> {
        match self {
            PlanTask::Requirement(r) => Some(r.category),
            PlanTask::Custom(c) => Some(c.category),
            PlanTask::ScheduleGamePrompt => None,
        }
    }

    pub fn is_welcome(&self) -> bool {
        self.category() == Some(RequirementCategory::Welcome)
    }

    /// Whether the task takes part in the remaining-minutes split.
    pub fn needs_time(&self) -> bool {
        !matches!(self, PlanTask::ScheduleGamePrompt) && !self.is_welcome()
    }

    pub fn expected_minutes(&self) -> i32 {
        match self {
            PlanTask::Requirement(r) => r.expected_minutes,
            _ => 0,
        }
    }

    pub fn as_requirement(&self) -> Option<&Requirement> {
        match self {
            PlanTask::Requirement(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_training(&self) -> Option<&dyn TrainingTask> {
        match self {
            PlanTask::Requirement(r) => Some(r),
            PlanTask::Custom(c) => Some(c),
            PlanTask::ScheduleGamePrompt => None,
        }
    }
}

/// The engine's output unit: a task plus its allotted minutes for the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedTask {
    pub task: PlanTask,
    pub goal_minutes: i32,
}

impl SuggestedTask {
    pub fn new(task: PlanTask) -> Self {
        Self {
            task,
            goal_minutes: 0,
        }
    }
}

/// The full output of one weekly-plan computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySuggestedTasks {
    /// Suggestions indexed by day of the week (Sunday = 0).
    pub suggestions_by_day: [Vec<SuggestedTask>; 7],
    /// Exclusive end of the covered window.
    pub end_date: NaiveDate,
    pub progress_updated_at: Option<DateTime<Utc>>,
    pub next_game: Option<NaiveDate>,
}

/// Why a plan computation deviates (or not) from the cached plan. Derived
/// fresh on every call; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationReason {
    /// No cached plan, or nothing has changed: the cache is fully reusable.
    Init,
    ProgressUpdate,
    PinnedTaskUpdate,
    WorkGoalUpdate,
    ScheduledGamesUpdateToday,
    ScheduledGamesUpdateFuture,
    SkippedTaskUpdate,
}

impl GenerationReason {
    /// Only these reasons invalidate what the user was already shown today.
    pub fn regenerate_today(self) -> bool {
        matches!(
            self,
            GenerationReason::PinnedTaskUpdate
                | GenerationReason::ScheduledGamesUpdateToday
                | GenerationReason::SkippedTaskUpdate
        )
    }

    pub fn regenerate_future(self) -> bool {
        self != GenerationReason::Init
    }
}

/// Current user state the cached plan is diffed against.
pub struct PlanContext<'a> {
    pub today: NaiveDate,
    /// Exclusive end of the current window.
    pub end: NaiveDate,
    pub skipped_tasks: &'a [String],
    pub pinned_tasks: &'a [String],
    pub progress_updated_at: Option<DateTime<Utc>>,
    pub next_game: Option<NaiveDate>,
    pub work_goal: &'a WorkGoalSettings,
}

/// Ordered-rule evaluator for [`GenerationReason`]: the first matching rule
/// wins. `resolve` maps a cached task id to a live task.
pub fn generation_reason(
    plan: Option<&WeeklyPlan>,
    ctx: &PlanContext,
    resolve: &dyn Fn(&str) -> Option<PlanTask>,
) -> GenerationReason {
    let Some(plan) = plan else {
        return GenerationReason::Init;
    };

    let mut day = ctx.today;
    while day < ctx.end {
        let cached = &plan.tasks[weekday_index(day)];
        if cached
            .iter()
            .any(|t| ctx.skipped_tasks.contains(&t.id))
        {
            return GenerationReason::SkippedTaskUpdate;
        }
        day += Duration::days(1);
    }

    if !plan_matches_pinned_tasks(plan, ctx.pinned_tasks) {
        return GenerationReason::PinnedTaskUpdate;
    }

    if plan.progress_updated_at != ctx.progress_updated_at {
        return GenerationReason::ProgressUpdate;
    }

    if plan.next_game != ctx.next_game {
        if plan.next_game == Some(ctx.today) || ctx.next_game == Some(ctx.today) {
            return GenerationReason::ScheduledGamesUpdateToday;
        }
        return GenerationReason::ScheduledGamesUpdateFuture;
    }

    if !plan_matches_work_goal(plan, ctx.work_goal, resolve) {
        return GenerationReason::WorkGoalUpdate;
    }

    GenerationReason::Init
}

/// Whether the plan was generated against the same pinned-task id sequence.
pub fn plan_matches_pinned_tasks(plan: &WeeklyPlan, pinned_tasks: &[String]) -> bool {
    plan.pinned_tasks == pinned_tasks
}

/// Whether the plan's per-day time totals match what the current work goal
/// would produce. Days with no tasks always match.
pub fn plan_matches_work_goal(
    plan: &WeeklyPlan,
    work_goal: &WorkGoalSettings,
    resolve: &dyn Fn(&str) -> Option<PlanTask>,
) -> bool {
    for (idx, day) in plan.tasks.iter().enumerate() {
        if day.is_empty() {
            continue;
        }
        let mut tasks: Vec<SuggestedTask> = day
            .iter()
            .filter_map(|p| resolve(&p.id).map(SuggestedTask::new))
            .collect();
        assign_time_to_tasks(&mut tasks, work_goal.minutes_per_day[idx]);

        let expected: i32 = tasks.iter().map(|s| s.goal_minutes).sum();
        let stored: i32 = day.iter().map(|p| p.minutes).sum();
        if stored != expected {
            return false;
        }
    }
    true
}

/// Divide a day's work-goal minutes across its suggestions.
///
/// Welcome tasks are funded first, in list order, each at its own expected
/// minutes, until the goal is met. The remainder is split evenly across the
/// first `min(max(1, remaining / DEFAULT_MINUTES_PER_TASK), n)` tasks that
/// need time; overflow tasks get 0 and are effectively deferred.
pub fn assign_time_to_tasks(tasks: &mut [SuggestedTask], goal_minutes: i32) {
    let mut welcome_minutes = 0;
    for s in tasks.iter_mut().filter(|s| s.task.is_welcome()) {
        if welcome_minutes >= goal_minutes {
            s.goal_minutes = 0;
            continue;
        }
        s.goal_minutes = s.task.expected_minutes();
        welcome_minutes += s.goal_minutes;
    }

    let remaining = (goal_minutes - welcome_minutes).max(0);
    let needing_time = tasks.iter().filter(|s| s.task.needs_time()).count();
    if needing_time == 0 {
        for s in tasks.iter_mut().filter(|s| !s.task.is_welcome()) {
            s.goal_minutes = 0;
        }
        return;
    }

    let funded = ((remaining / DEFAULT_MINUTES_PER_TASK).max(1) as usize).min(needing_time);
    let per_task = remaining / funded as i32;

    let mut assigned = 0;
    for s in tasks.iter_mut().filter(|s| !s.task.is_welcome()) {
        if !s.task.needs_time() {
            s.goal_minutes = 0;
            continue;
        }
        s.goal_minutes = if assigned < funded { per_task } else { 0 };
        assigned += 1;
    }
}
