use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use dojoplan_core::{
    GenerationReason, PlanTask, Requirement, RequirementCategory, RequirementProgress,
    TaskSuggestionAlgorithm, User, WeeklyPlan, CLASSICAL_GAMES_TASK, MAX_SUGGESTED_TASKS,
};

const COHORT: &str = "1400-1500";

/// 2026-03-10 is a Tuesday; with a Sunday week start the window is
/// 03-08 .. 03-15 (exclusive).
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

fn req(id: &str, category: RequirementCategory, target: i32) -> Requirement {
    Requirement::new(id, id, category).with_count(COHORT, target)
}

fn catalog() -> Vec<Requirement> {
    vec![
        req(CLASSICAL_GAMES_TASK, RequirementCategory::Games, 10),
        req("annotation-drills", RequirementCategory::Games, 10).with_unit_score(0.5),
        req("puzzle-sets", RequirementCategory::Tactics, 30),
        req("calculation-book", RequirementCategory::Tactics, 12),
        req("positional-course", RequirementCategory::Middlegames, 15),
        req("rook-endings", RequirementCategory::Endgame, 20),
        req("opening-repertoire", RequirementCategory::Opening, 10),
    ]
}

fn algorithm(user: &User) -> TaskSuggestionAlgorithm {
    TaskSuggestionAlgorithm::new(user, catalog(), catalog(), vec![], now())
}

fn real_ids(day: &[dojoplan_core::SuggestedTask]) -> Vec<String> {
    day.iter()
        .filter(|s| s.task.needs_time())
        .map(|s| s.task.id().to_string())
        .collect()
}

/// A plan persisted from one run is reused verbatim by the next when
/// nothing has changed.
#[test]
fn unchanged_state_reproduces_the_cached_plan() {
    let user = User::new("alice", COHORT);
    let first = algorithm(&user).get_weekly_suggestions();

    let cached = user
        .clone()
        .with_weekly_plan(WeeklyPlan::from_suggestions(&first, user.pinned_tasks.clone()));
    let mut algo = algorithm(&cached);
    assert_eq!(algo.generation_reason(), GenerationReason::Init);

    let second = algo.get_weekly_suggestions();
    assert_eq!(first, second);
}

/// No day ever carries more than the cap of time-consuming tasks.
#[test]
fn daily_cap_holds_across_the_whole_week() {
    let user = User::new("alice", COHORT);
    let result = algorithm(&user).get_weekly_suggestions();

    for day in &result.suggestions_by_day {
        assert!(real_ids(day).len() <= MAX_SUGGESTED_TASKS);
    }
}

/// Each planned day spends exactly the work goal.
#[test]
fn daily_minutes_add_up_to_the_work_goal() {
    let user = User::new("alice", COHORT);
    let result = algorithm(&user).get_weekly_suggestions();

    // Today (Tuesday, index 2) through Saturday are planned days.
    for idx in 2..=6 {
        let total: i32 = result.suggestions_by_day[idx]
            .iter()
            .map(|s| s.goal_minutes)
            .sum();
        assert_eq!(total, 60, "day {idx}");
    }
}

/// The very first plan leaves days before today empty rather than
/// inventing a history the user never saw.
#[test]
fn first_plan_has_empty_past_days() {
    let user = User::new("alice", COHORT);
    let result = algorithm(&user).get_weekly_suggestions();

    assert!(result.suggestions_by_day[0].is_empty());
    assert!(result.suggestions_by_day[1].is_empty());
    assert!(!result.suggestions_by_day[2].is_empty());
}

/// When last week's plan lapsed, the elapsed days of the new week are
/// back-filled instead of left blank.
#[test]
fn lapsed_plan_backfills_elapsed_days() {
    let stale = WeeklyPlan {
        end_date: date(8),
        tasks: Default::default(),
        progress_updated_at: None,
        pinned_tasks: Vec::new(),
        next_game: None,
    };
    let user = User::new("alice", COHORT).with_weekly_plan(stale);
    let result = algorithm(&user).get_weekly_suggestions();

    assert!(!result.suggestions_by_day[0].is_empty());
    assert!(!result.suggestions_by_day[1].is_empty());
    assert_eq!(result.end_date, date(15));
}

/// A day with a scheduled game suggests only playing classical games,
/// with the full work goal behind it.
#[test]
fn scheduled_game_day_is_all_classical_games() {
    let user = User::new("alice", COHORT).with_game_scheduled(date(12), 1);
    let result = algorithm(&user).get_weekly_suggestions();

    // 03-12 is Thursday, index 4.
    let game_day = &result.suggestions_by_day[4];
    assert_eq!(real_ids(game_day), vec![CLASSICAL_GAMES_TASK.to_string()]);
    assert_eq!(game_day[0].goal_minutes, 60);

    // The upcoming game covers classical games for the rest of the week,
    // and no schedule prompt is owed.
    for (idx, day) in result.suggestions_by_day.iter().enumerate() {
        if idx == 4 {
            continue;
        }
        assert!(day.iter().all(|s| s.task.id() != CLASSICAL_GAMES_TASK));
        assert!(day
            .iter()
            .all(|s| !matches!(s.task, PlanTask::ScheduleGamePrompt)));
    }
}

/// Welcome tasks ride on top of the cap, get funded first, and stop
/// appearing once the simulation completes them.
#[test]
fn welcome_task_leads_the_first_day_then_drops_out() {
    let mut requirements = catalog();
    requirements.push(
        req("set-up-your-profile", RequirementCategory::Welcome, 1)
            .with_number_of_cohorts(1)
            .with_expected_minutes(10),
    );
    let user = User::new("alice", COHORT);
    let mut algo =
        TaskSuggestionAlgorithm::new(&user, requirements.clone(), requirements, vec![], now());
    let result = algo.get_weekly_suggestions();

    let today = &result.suggestions_by_day[2];
    assert_eq!(today[0].task.id(), "set-up-your-profile");
    assert_eq!(today[0].goal_minutes, 10);
    assert_eq!(real_ids(today).len(), MAX_SUGGESTED_TASKS);
    // The welcome minutes come out of the shared budget.
    let total: i32 = today.iter().map(|s| s.goal_minutes).sum();
    assert_eq!(total, 60);

    // Completed in simulation, so Wednesday no longer shows it.
    let wednesday = &result.suggestions_by_day[3];
    assert!(wednesday.iter().all(|s| s.task.id() != "set-up-your-profile"));
}

/// Skipping a task that the cached plan still shows today forces today to
/// regenerate without it.
#[test]
fn skipping_a_planned_task_regenerates_today_without_it() {
    let user = User::new("alice", COHORT);
    let first = algorithm(&user).get_weekly_suggestions();
    let victim = real_ids(&first.suggestions_by_day[2])[0].clone();

    let cached = user
        .clone()
        .with_weekly_plan(WeeklyPlan::from_suggestions(&first, Vec::new()))
        .with_skipped_tasks(vec![victim.clone()]);
    let mut algo = algorithm(&cached);
    assert_eq!(algo.generation_reason(), GenerationReason::SkippedTaskUpdate);

    let second = algo.get_weekly_suggestions();
    for idx in 2..=6 {
        assert!(second.suggestions_by_day[idx]
            .iter()
            .all(|s| s.task.id() != victim));
    }
}

/// New progress regenerates future days but leaves today as the user
/// already saw it.
#[test]
fn progress_update_preserves_today() {
    let user = User::new("alice", COHORT);
    let first = algorithm(&user).get_weekly_suggestions();

    let cached = user
        .clone()
        .with_weekly_plan(WeeklyPlan::from_suggestions(&first, Vec::new()))
        .with_progress(RequirementProgress::new("puzzle-sets", now()).with_count(COHORT, 1));
    let mut algo = algorithm(&cached);
    assert_eq!(algo.generation_reason(), GenerationReason::ProgressUpdate);

    let second = algo.get_weekly_suggestions();
    assert_eq!(
        real_ids(&first.suggestions_by_day[2]),
        real_ids(&second.suggestions_by_day[2])
    );
}

/// Pinning tasks reorders the whole plan around them.
#[test]
fn pinned_tasks_front_the_plan() {
    let user = User::new("alice", COHORT);
    let first = algorithm(&user).get_weekly_suggestions();

    let cached = user
        .clone()
        .with_weekly_plan(WeeklyPlan::from_suggestions(&first, Vec::new()))
        .with_pinned_tasks(vec!["rook-endings".to_string()]);
    let mut algo = algorithm(&cached);
    assert_eq!(algo.generation_reason(), GenerationReason::PinnedTaskUpdate);

    let second = algo.get_weekly_suggestions();
    // By Friday the simulation has credited a full hour on the pinned
    // task, and partial progress drops it from the pinned suggestions.
    for idx in 2..=4 {
        assert_eq!(real_ids(&second.suggestions_by_day[idx])[0], "rook-endings");
    }
}
