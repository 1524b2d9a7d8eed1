//! Category budget estimator: ranks categories by how much of their
//! attainable score a user still has left.

use std::cmp::Ordering;

use crate::requirement::{
    current_score, remaining_score, total_score, Requirement, RequirementCategory,
};
use crate::timeline::TimelineEntry;
use crate::user::User;

/// The categories the suggestion algorithm may draw from. Their order here
/// breaks ties when two categories have the same remaining percentage.
pub const SUGGESTED_TASK_CATEGORIES: [RequirementCategory; 5] = [
    RequirementCategory::Games,
    RequirementCategory::Tactics,
    RequirementCategory::Middlegames,
    RequirementCategory::Endgame,
    RequirementCategory::Opening,
];

/// Dojo points the user has earned in the category for the cohort.
pub fn category_score(
    user: &User,
    cohort: &str,
    category: RequirementCategory,
    requirements: &[Requirement],
    timeline: &[TimelineEntry],
) -> f32 {
    requirements
        .iter()
        .filter(|r| r.category == category)
        .map(|r| current_score(cohort, r, user.progress.get(&r.id), timeline))
        .sum()
}

/// The fraction of the category's total attainable score still remaining,
/// in [0, 1]. 0 when the category has no attainable score for the cohort.
pub fn remaining_category_score_percent(
    user: &User,
    cohort: &str,
    category: RequirementCategory,
    requirements: &[Requirement],
    timeline: &[TimelineEntry],
) -> f32 {
    let mut total = 0.0;
    let mut remaining = 0.0;
    for r in requirements.iter().filter(|r| r.category == category) {
        total += total_score(cohort, r);
        remaining += remaining_score(cohort, r, user.progress.get(&r.id), timeline);
    }
    if total <= 0.0 {
        return 0.0;
    }
    remaining / total
}

/// The suggestable categories ordered by descending remaining percentage.
/// The sort is stable, so equal percentages keep the fixed
/// [`SUGGESTED_TASK_CATEGORIES`] priority order.
pub fn rank_categories(
    user: &User,
    cohort: &str,
    requirements: &[Requirement],
    timeline: &[TimelineEntry],
) -> Vec<(RequirementCategory, f32)> {
    let mut ranked: Vec<(RequirementCategory, f32)> = SUGGESTED_TASK_CATEGORIES
        .iter()
        .map(|&category| {
            (
                category,
                remaining_category_score_percent(user, cohort, category, requirements, timeline),
            )
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirement::{RequirementProgress, ALL_COHORTS};
    use chrono::{TimeZone, Utc};

    const COHORT: &str = "1200-1300";

    fn req(id: &str, category: RequirementCategory, target: i32) -> Requirement {
        Requirement::new(id, id, category).with_count(COHORT, target)
    }

    #[test]
    fn percent_reflects_progress() {
        let requirements = vec![
            req("g1", RequirementCategory::Games, 10),
            req("g2", RequirementCategory::Games, 10),
        ];
        let user = User::new("alice", COHORT).with_progress(
            RequirementProgress::new("g1", Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
                .with_count(ALL_COHORTS, 5),
        );

        let percent = remaining_category_score_percent(
            &user,
            COHORT,
            RequirementCategory::Games,
            &requirements,
            &[],
        );
        assert!((percent - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_category_has_zero_percent() {
        let user = User::new("alice", COHORT);
        assert_eq!(
            remaining_category_score_percent(
                &user,
                COHORT,
                RequirementCategory::Endgame,
                &[],
                &[],
            ),
            0.0
        );
    }

    #[test]
    fn ties_keep_fixed_category_order() {
        let requirements = vec![
            req("o1", RequirementCategory::Opening, 10),
            req("e1", RequirementCategory::Endgame, 10),
            req("t1", RequirementCategory::Tactics, 10),
            req("g1", RequirementCategory::Games, 10),
            req("m1", RequirementCategory::Middlegames, 10),
        ];
        let user = User::new("alice", COHORT);

        let ranked = rank_categories(&user, COHORT, &requirements, &[]);
        let order: Vec<RequirementCategory> = ranked.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, SUGGESTED_TASK_CATEGORIES.to_vec());
    }

    #[test]
    fn neediest_category_ranks_first() {
        let requirements = vec![
            req("g1", RequirementCategory::Games, 10),
            req("t1", RequirementCategory::Tactics, 10),
        ];
        let user = User::new("alice", COHORT).with_progress(
            RequirementProgress::new("g1", Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
                .with_count(ALL_COHORTS, 8),
        );

        let ranked = rank_categories(&user, COHORT, &requirements, &[]);
        assert_eq!(ranked[0].0, RequirementCategory::Tactics);
        assert_eq!(ranked[1].0, RequirementCategory::Games);
    }
}
