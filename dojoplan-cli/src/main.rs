use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use dojoplan_core::{
    category_score, current_count, remaining_category_score_percent, total_count, unit_score,
    PlanTask, Requirement, RequirementCategory, RequirementProgress, TaskSuggestionAlgorithm,
    User, ALL_COHORTS,
};

#[derive(Parser, Debug)]
#[command(name = "dojoplan", version, about = "Weekly training-plan utilities")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the suggestion algorithm on a mock user until their plan is
    /// exhausted, writing one CSV report per cohort
    Simulate {
        /// Path to the requirement catalog (JSON array)
        #[arg(long)]
        requirements: PathBuf,

        /// Cohorts to simulate. Defaults to every cohort in the catalog
        #[arg(short, long)]
        cohort: Vec<String>,

        /// Directory the CSV reports are written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Simulate {
            requirements,
            cohort,
            out_dir,
        } => {
            let catalog = load_requirements(&requirements)?;
            let cohorts = if cohort.is_empty() {
                catalog_cohorts(&catalog)
            } else {
                cohort
            };
            if cohorts.is_empty() {
                bail!("no cohorts found in {}", requirements.display());
            }

            for cohort in &cohorts {
                simulate_training_plan(cohort, &catalog, &out_dir)?;
            }
        }
    }

    Ok(())
}

fn load_requirements(path: &Path) -> Result<Vec<Requirement>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Every cohort the catalog defines a target for.
fn catalog_cohorts(catalog: &[Requirement]) -> Vec<String> {
    let cohorts: BTreeSet<String> = catalog
        .iter()
        .flat_map(|r| r.counts.keys())
        .filter(|c| c.as_str() != ALL_COHORTS)
        .cloned()
        .collect();
    cohorts.into_iter().collect()
}

/// One row per simulated training session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    suggested_task_1: String,
    suggested_task_2: String,
    suggested_task_3: String,
    chosen_task: String,
    games_points: f32,
    games_percent: f32,
    tactics_points: f32,
    tactics_percent: f32,
    middlegames_points: f32,
    middlegames_percent: f32,
    endgame_points: f32,
    endgame_percent: f32,
    opening_points: f32,
    opening_percent: f32,
}

/// Repeatedly ask the algorithm for suggestions, complete the first one, and
/// record how the category balance evolves, until nothing is left to suggest.
fn simulate_training_plan(cohort: &str, catalog: &[Requirement], out_dir: &Path) -> Result<()> {
    println!("Starting simulation for cohort {cohort}");

    let requirements: Vec<Requirement> = catalog
        .iter()
        .filter(|r| r.counts.get(cohort).copied().unwrap_or(0) != 0)
        .cloned()
        .collect();

    let mut user = User::new("", cohort);
    let mut rows: Vec<ReportRow> = Vec::new();

    // A requirement with a zero target and zero unit score would never
    // advance, so bound the loop instead of trusting the catalog.
    const MAX_SESSIONS: usize = 10_000;

    for _ in 0..MAX_SESSIONS {
        let algo = TaskSuggestionAlgorithm::new(
            &user,
            requirements.clone(),
            catalog.to_vec(),
            Vec::new(),
            Utc::now(),
        );
        let suggested = algo.suggested_tasks(algo.today());

        let Some(chosen) = suggested
            .iter()
            .filter_map(|t| t.as_requirement())
            .next()
            .cloned()
        else {
            write_report(cohort, &rows, out_dir)?;
            return Ok(());
        };

        complete_session(&mut user, &chosen);
        rows.push(report_row(&suggested, &chosen, &user, &requirements));
    }

    bail!("cohort {cohort} did not converge after {MAX_SESSIONS} sessions");
}

/// Credit one full unit of work on the chosen task, mirroring how the
/// engine's internal simulation advances progress.
fn complete_session(user: &mut User, chosen: &Requirement) {
    let cohort = user.dojo_cohort.clone();

    let mut increment = 1;
    let unit = unit_score(&cohort, chosen);
    if unit > 0.0 && unit < 1.0 {
        increment = (1.0 / unit).ceil() as i32;
    } else if unit == 0.0 {
        increment = total_count(&cohort, chosen);
    }

    let progress = user.progress.entry(chosen.id.clone()).or_insert_with(|| {
        RequirementProgress::new(chosen.id.clone(), Utc::now())
            .with_count(cohort.clone(), chosen.start_count)
            .with_count(ALL_COHORTS, chosen.start_count)
    });

    let bucket = if matches!(chosen.number_of_cohorts, 0 | 1) {
        ALL_COHORTS
    } else {
        cohort.as_str()
    };
    *progress
        .counts
        .entry(bucket.to_string())
        .or_insert(chosen.start_count) += increment;
    progress.updated_at = Utc::now();
}

fn task_name(task: Option<&PlanTask>) -> String {
    match task {
        Some(PlanTask::Requirement(r)) => r.name.clone(),
        Some(PlanTask::Custom(c)) => c.name.clone(),
        Some(PlanTask::ScheduleGamePrompt) => "Schedule classical game".to_string(),
        None => String::new(),
    }
}

fn report_row(
    suggested: &[PlanTask],
    chosen: &Requirement,
    user: &User,
    requirements: &[Requirement],
) -> ReportRow {
    let cohort = &user.dojo_cohort;
    let points = |category| category_score(user, cohort, category, requirements, &[]);
    let percent =
        |category| 1.0 - remaining_category_score_percent(user, cohort, category, requirements, &[]);

    ReportRow {
        suggested_task_1: task_name(suggested.first()),
        suggested_task_2: task_name(suggested.get(1)),
        suggested_task_3: task_name(suggested.get(2)),
        chosen_task: format!(
            "{} ({} / {})",
            chosen.name,
            current_count(cohort, chosen, user.progress.get(&chosen.id), &[]),
            total_count(cohort, chosen),
        ),
        games_points: points(RequirementCategory::Games),
        games_percent: percent(RequirementCategory::Games),
        tactics_points: points(RequirementCategory::Tactics),
        tactics_percent: percent(RequirementCategory::Tactics),
        middlegames_points: points(RequirementCategory::Middlegames),
        middlegames_percent: percent(RequirementCategory::Middlegames),
        endgame_points: points(RequirementCategory::Endgame),
        endgame_percent: percent(RequirementCategory::Endgame),
        opening_points: points(RequirementCategory::Opening),
        opening_percent: percent(RequirementCategory::Opening),
    }
}

fn write_report(cohort: &str, rows: &[ReportRow], out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let path = out_dir.join(format!("suggested-tasks-{cohort}.csv"));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    println!("Report saved at {}", path.display());
    Ok(())
}
