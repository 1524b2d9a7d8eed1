//! The task suggestion algorithm: turns a user's progress, pinned tasks,
//! game schedule and work goal into a 7-day plan of suggested tasks.
//!
//! The algorithm owns a private deep copy of the user and simulates
//! completing each day's suggestions against it, so later days in the same
//! computation account for earlier days' hypothetical progress. Caller
//! state is never mutated.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::plan::{
    assign_time_to_tasks, generation_reason, GenerationReason, PlanContext, PlanTask,
    SuggestedTask, WeeklyPlan, WeeklySuggestedTasks, SCHEDULE_CLASSICAL_GAME_TASK_ID,
};
use crate::requirement::{
    current_count, is_blocked, is_complete, is_expired, remaining_suggestion_score, total_count,
    unit_score, Requirement, RequirementCategory, RequirementProgress, ALL_COHORTS,
};
use crate::score::{rank_categories, SUGGESTED_TASK_CATEGORIES};
use crate::time::{local_today, week_window, weekday_index};
use crate::timeline::TimelineEntry;
use crate::user::User;

/// The maximum number of suggested tasks per day, not counting Welcome
/// tasks or the schedule-game prompt.
pub const MAX_SUGGESTED_TASKS: usize = 3;

/// The Play Classical Games task.
pub const CLASSICAL_GAMES_TASK: &str = "38f46441-7a4e-4506-8632-166bcbe78baf";

/// The Annotate Classical Games task.
pub const ANNOTATE_GAMES_TASK: &str = "4d23d689-1284-46e6-b2a2-4b4bfdc37174";

/// The Review Games with a Higher-Rated Opponent task.
pub const REVIEW_HIGHER_RATED_TASK: &str = "91e4a9e8-7366-4d44-9c07-6b1d9a2a5b38";

/// Tasks which are never suggested unless the user has pinned them.
const INELIGIBLE_SUGGESTED_TASKS: [&str; 4] = [
    "812adb60-d5fb-4655-8d22-d568a0dca547", // Postmortems
    "25230066-4eda-4886-a12c-39a5175ea632", // Online tactics tune up 0-1400
    "b55eda1d-11dc-4f6f-aa7b-b83a6339513f", // Online tactics tune up 1400-1800
    "b9ef52d2-795d-4005-b15a-437ee36a2c0a", // Online tactics tune up 1800+
];

/// One weekly-plan computation. Construct with the current inputs, then
/// call [`TaskSuggestionAlgorithm::get_weekly_suggestions`].
pub struct TaskSuggestionAlgorithm {
    /// Private working copy; simulation target. Expired progress is
    /// dropped up front.
    user: User,
    /// Requirements applicable to the user's cohort.
    requirements: Vec<Requirement>,
    /// The full catalog, for resolving pinned tasks from other cohorts.
    all_requirements: Vec<Requirement>,
    timeline: Vec<TimelineEntry>,
    now: DateTime<Utc>,
    today: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    /// Sub-hour simulation carry per task id.
    time_per_task: HashMap<String, i32>,
}

impl TaskSuggestionAlgorithm {
    pub fn new(
        user: &User,
        requirements: Vec<Requirement>,
        all_requirements: Vec<Requirement>,
        timeline: Vec<TimelineEntry>,
        now: DateTime<Utc>,
    ) -> Self {
        let today =
            local_today(user.timezone.as_deref(), now).unwrap_or_else(|_| now.date_naive());
        let (start, end) = week_window(today, user.week_start);

        let mut user = user.clone();
        user.progress.retain(|id, progress| {
            match all_requirements.iter().find(|r| &r.id == id) {
                Some(req) => !is_expired(req, progress, now),
                None => true,
            }
        });

        Self {
            user,
            requirements,
            all_requirements,
            timeline,
            now,
            today,
            start,
            end,
            time_per_task: HashMap::new(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// The `[start, end)` window the plan covers.
    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end)
    }

    /// Diff the cached plan against current state (§ ordered rules in
    /// [`generation_reason`]).
    pub fn generation_reason(&self) -> GenerationReason {
        let ctx = PlanContext {
            today: self.today,
            end: self.end,
            skipped_tasks: &self.user.skipped_tasks,
            pinned_tasks: &self.user.pinned_tasks,
            progress_updated_at: self.user.last_progress_update(),
            next_game: self.user.next_scheduled_game(self.today),
            work_goal: self.user.work_goal(),
        };
        generation_reason(self.valid_cached_plan(), &ctx, &|id| self.resolve(id))
    }

    /// Produce the full weekly plan, reusing the cached plan wherever the
    /// generation reason allows.
    pub fn get_weekly_suggestions(&mut self) -> WeeklySuggestedTasks {
        let progress_updated_at = self.user.last_progress_update();
        let next_game = self.user.next_scheduled_game(self.today);
        let reason = self.generation_reason();
        let plan = self.valid_cached_plan().cloned();
        let had_previous_plan = self.user.weekly_plan.is_some();

        let mut by_day: [Vec<SuggestedTask>; 7] = Default::default();
        let mut day = self.start;
        while day < self.end {
            let idx = weekday_index(day);

            if day < self.today {
                if let Some(plan) = &plan {
                    // Already shown to the user: reuse verbatim, stored
                    // minutes included.
                    by_day[idx] = plan.tasks[idx]
                        .iter()
                        .filter_map(|p| {
                            self.resolve(&p.id).map(|task| SuggestedTask {
                                task,
                                goal_minutes: p.minutes,
                            })
                        })
                        .collect();
                } else if had_previous_plan {
                    // A previous plan lapsed with the week rollover;
                    // back-fill the elapsed days from scratch.
                    let mut tasks = self.tasks_for_day(reason, day, None);
                    assign_time_to_tasks(&mut tasks, self.user.work_goal().minutes_per_day[idx]);
                    self.increment_suggestions_progress(&tasks);
                    by_day[idx] = tasks;
                }
                // First plan ever: past days stay empty rather than
                // inventing a history the user never saw.
            } else {
                let mut tasks = self.tasks_for_day(reason, day, plan.as_ref());
                assign_time_to_tasks(&mut tasks, self.user.work_goal().minutes_per_day[idx]);
                self.increment_suggestions_progress(&tasks);
                by_day[idx] = tasks;
            }

            day += Duration::days(1);
        }

        WeeklySuggestedTasks {
            suggestions_by_day: by_day,
            end_date: self.end,
            progress_updated_at,
            next_game,
        }
    }

    /// The day's task list: cached tasks where the reason allows reuse,
    /// topped up to the cap, with outstanding Welcome tasks prepended.
    fn tasks_for_day(
        &self,
        reason: GenerationReason,
        day: NaiveDate,
        plan: Option<&WeeklyPlan>,
    ) -> Vec<SuggestedTask> {
        let mut tasks: Vec<SuggestedTask> = Vec::new();

        let reuse = if day == self.today {
            !reason.regenerate_today()
        } else {
            !reason.regenerate_future()
        };
        if let Some(plan) = plan {
            if reuse {
                tasks = plan.tasks[weekday_index(day)]
                    .iter()
                    .filter_map(|p| self.resolve(&p.id).map(SuggestedTask::new))
                    .collect();
            }
        }

        if real_task_count(&tasks) < MAX_SUGGESTED_TASKS {
            for task in self.suggested_tasks(day) {
                if tasks.iter().any(|s| s.task.id() == task.id()) {
                    continue;
                }
                if matches!(task, PlanTask::ScheduleGamePrompt) {
                    tasks.push(SuggestedTask::new(task));
                    continue;
                }
                if real_task_count(&tasks) >= MAX_SUGGESTED_TASKS {
                    break;
                }
                tasks.push(SuggestedTask::new(task));
            }
        }

        // Outstanding Welcome tasks ride on top, outside the cap.
        let cohort = self.user.dojo_cohort.clone();
        let mut result: Vec<SuggestedTask> = self
            .requirements
            .iter()
            .filter(|r| r.category == RequirementCategory::Welcome)
            .filter(|r| !self.user.is_free() || r.is_free)
            .filter(|r| !self.user.skipped_tasks.contains(&r.id))
            .filter(|r| {
                !is_complete(
                    &cohort,
                    *r,
                    self.user.progress.get(&r.id),
                    &self.timeline,
                    false,
                )
            })
            .filter(|r| !tasks.iter().any(|s| s.task.id() == r.id))
            .map(|r| SuggestedTask::new(PlanTask::Requirement(r.clone())))
            .collect();
        result.append(&mut tasks);
        result
    }

    /// The selection algorithm: at most [`MAX_SUGGESTED_TASKS`] tasks for
    /// the given date, in priority order (scheduled game day, pinned
    /// tasks, then the neediest categories). A schedule-game prompt may be
    /// prepended on top.
    pub fn suggested_tasks(&self, date: NaiveDate) -> Vec<PlanTask> {
        let cohort = &self.user.dojo_cohort;

        // A scheduled game preempts everything else that day.
        if self.user.has_game_on(date) {
            return self
                .all_requirements
                .iter()
                .find(|r| r.id == CLASSICAL_GAMES_TASK)
                .map(|r| vec![PlanTask::Requirement(r.clone())])
                .unwrap_or_default();
        }

        let mut suggested: Vec<PlanTask> = Vec::new();
        for id in &self.user.pinned_tasks {
            if self.user.skipped_tasks.contains(id) {
                continue;
            }
            let Some(task) = self.resolve(id) else {
                continue;
            };
            let Some(training) = task.as_training() else {
                continue;
            };
            // Pinned tasks with any progress at all stop being suggested.
            let complete = is_complete(
                cohort,
                training,
                self.user.progress.get(id),
                &self.timeline,
                true,
            );
            if complete {
                continue;
            }
            suggested.push(task);
        }
        if suggested.len() >= MAX_SUGGESTED_TASKS {
            return suggested;
        }

        let is_free_user = self.user.is_free();
        let mut eligible: Vec<&Requirement> = self
            .requirements
            .iter()
            .filter(|r| {
                (!is_free_user || r.is_free)
                    && !INELIGIBLE_SUGGESTED_TASKS.contains(&r.id.as_str())
                    && !suggested.iter().any(|t| t.id() == r.id)
                    && SUGGESTED_TASK_CATEGORIES.contains(&r.category)
                    && !is_complete(
                        cohort,
                        *r,
                        self.user.progress.get(&r.id),
                        &self.timeline,
                        false,
                    )
                    && !self.user.skipped_tasks.contains(&r.id)
                    && is_blocked(cohort, &self.user, *r, &self.all_requirements, &self.timeline)
                        .is_none()
            })
            .collect();

        // Game-derived tasks are pointless ahead of the games they feed
        // on: drop annotation/review once their counts have caught up with
        // the classical games actually played.
        let classical_count = self
            .all_requirements
            .iter()
            .find(|r| r.id == CLASSICAL_GAMES_TASK)
            .map(|r| {
                current_count(
                    cohort,
                    r,
                    self.user.progress.get(CLASSICAL_GAMES_TASK),
                    &self.timeline,
                )
            })
            .unwrap_or(0);
        eligible.retain(|r| {
            if r.id != ANNOTATE_GAMES_TASK && r.id != REVIEW_HIGHER_RATED_TASK {
                return true;
            }
            current_count(cohort, *r, self.user.progress.get(&r.id), &self.timeline)
                < classical_count
        });

        // An upcoming scheduled game already covers the classical-games
        // task for this week.
        if self.user.next_scheduled_game(self.today).is_some() {
            eligible.retain(|r| r.id != CLASSICAL_GAMES_TASK);
        }

        if eligible.is_empty() {
            return suggested;
        }

        let ranked = rank_categories(&self.user, cohort, &self.requirements, &self.timeline);
        let mut owe_schedule_prompt = false;

        while suggested.len() < MAX_SUGGESTED_TASKS {
            let eligible_categories: Vec<RequirementCategory> = ranked
                .iter()
                .map(|(c, _)| *c)
                .filter(|c| eligible.iter().any(|r| r.category == *c))
                .collect();
            if eligible_categories.is_empty() {
                break;
            }

            // Prefer categories not yet represented; repeat one only when
            // there is no other choice.
            let mut chosen: Vec<RequirementCategory> = eligible_categories
                .iter()
                .copied()
                .filter(|c| !suggested.iter().any(|t| t.category() == Some(*c)))
                .collect();
            if chosen.is_empty() {
                chosen = eligible_categories;
            }

            for category in chosen {
                let mut in_category: Vec<&Requirement> = eligible
                    .iter()
                    .copied()
                    .filter(|r| r.category == category)
                    .collect();
                in_category.sort_by(|a, b| {
                    let sa = remaining_suggestion_score(
                        cohort,
                        a,
                        self.user.progress.get(&a.id),
                        &self.timeline,
                    );
                    let sb = remaining_suggestion_score(
                        cohort,
                        b,
                        self.user.progress.get(&b.id),
                        &self.timeline,
                    );
                    sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
                });

                let mut pick = in_category[0];
                if pick.id == CLASSICAL_GAMES_TASK {
                    // Never suggest playing directly; prompt the user to
                    // schedule a game and fall back to the runner-up.
                    owe_schedule_prompt = true;
                    eligible.retain(|r| r.id != CLASSICAL_GAMES_TASK);
                    let Some(&second) = in_category.get(1) else {
                        continue;
                    };
                    pick = second;
                }

                suggested.push(PlanTask::Requirement(pick.clone()));
                let pick_id = pick.id.clone();
                eligible.retain(|r| r.id != pick_id);
                if suggested.len() >= MAX_SUGGESTED_TASKS {
                    break;
                }
            }
        }

        if owe_schedule_prompt {
            suggested.insert(0, PlanTask::ScheduleGamePrompt);
        }
        suggested
    }

    /// Apply a day's suggestions to the working copy so later days see
    /// their effect.
    fn increment_suggestions_progress(&mut self, suggestions: &[SuggestedTask]) {
        for s in suggestions {
            let Some(req) = s.task.as_requirement() else {
                continue;
            };
            if req.category == RequirementCategory::Welcome {
                // Welcome tasks award a flat point value irrespective of
                // duration; credit a full simulated hour.
                self.increment_progress(&req.clone(), 60);
            } else if s.goal_minutes > 0 {
                self.increment_progress(&req.clone(), s.goal_minutes);
            }
        }
    }

    /// Accrue simulated minutes on one requirement. Whole hours convert to
    /// count increments via the unit score; sub-hour remainders carry over
    /// to the next day of the same computation.
    fn increment_progress(&mut self, req: &Requirement, minutes: i32) {
        let carry = self.time_per_task.get(&req.id).copied().unwrap_or(0);
        let total = carry + minutes;
        let points = total / 60;
        self.time_per_task.insert(req.id.clone(), total % 60);
        if points == 0 {
            return;
        }

        let cohort = self.user.dojo_cohort.clone();
        let mut increment = 1;
        let unit = unit_score(&cohort, req);
        if unit > 0.0 && unit < 1.0 {
            increment = (1.0 / unit).ceil() as i32;
        } else if unit == 0.0 {
            increment = total_count(&cohort, req);
        }
        increment *= points;

        let start_count = req.start_count;
        let now = self.now;
        let progress = self
            .user
            .progress
            .entry(req.id.clone())
            .or_insert_with(|| {
                RequirementProgress::new(req.id.clone(), now)
                    .with_count(cohort.clone(), start_count)
                    .with_count(ALL_COHORTS, start_count)
            });

        let bucket = if matches!(req.number_of_cohorts, 0 | 1) {
            ALL_COHORTS
        } else {
            cohort.as_str()
        };
        *progress.counts.entry(bucket.to_string()).or_insert(start_count) += increment;
    }

    fn valid_cached_plan(&self) -> Option<&WeeklyPlan> {
        self.user
            .weekly_plan
            .as_ref()
            .filter(|p| p.end_date >= self.end)
    }

    fn resolve(&self, id: &str) -> Option<PlanTask> {
        if id == SCHEDULE_CLASSICAL_GAME_TASK_ID {
            return Some(PlanTask::ScheduleGamePrompt);
        }
        if let Some(custom) = self.user.custom_tasks.iter().find(|t| t.id == id) {
            return Some(PlanTask::Custom(custom.clone()));
        }
        self.all_requirements
            .iter()
            .find(|r| r.id == id)
            .map(|r| PlanTask::Requirement(r.clone()))
    }
}

/// Tasks counted against the suggestion cap: everything except Welcome
/// tasks and the schedule-game prompt.
fn real_task_count(tasks: &[SuggestedTask]) -> usize {
    tasks.iter().filter(|s| s.task.needs_time()).count()
}
