//! Score comparison and rank assignment rules.
//!
//! # Responsibility
//! - Decide, per test category, whether a lower or higher score wins.
//! - Order result sets deterministically and assign contiguous 1-based
//!   ranks.
//!
//! # Invariants
//! - Equal scores are broken by earliest date, then by athlete id, so the
//!   same rows always rank the same way.

use crate::model::records::TestResult;
use std::cmp::Ordering;

/// Direction in which scores improve for a test category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    /// Timed tests: a lower score is the better result.
    LowerIsBetter,
    /// Reps, distance, weight: a higher score is the better result.
    HigherIsBetter,
}

impl ScoreOrder {
    /// Comparison rule for a test category. Speed tests are timed, so
    /// lower wins; every other category counts up.
    pub fn for_category(category: &str) -> Self {
        if category == "Speed" {
            Self::LowerIsBetter
        } else {
            Self::HigherIsBetter
        }
    }

    /// Whether `candidate` beats `incumbent` under this order. Equal
    /// scores are not an improvement.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::LowerIsBetter => candidate < incumbent,
            Self::HigherIsBetter => candidate > incumbent,
        }
    }

    pub fn best_score_is_lowest(self) -> bool {
        self == Self::LowerIsBetter
    }
}

/// Total order over results: better score first, earlier date breaking
/// ties, athlete id breaking exact duplicates.
pub fn compare_results(order: ScoreOrder, a: &TestResult, b: &TestResult) -> Ordering {
    let by_score = match order {
        ScoreOrder::LowerIsBetter => a.score.total_cmp(&b.score),
        ScoreOrder::HigherIsBetter => b.score.total_cmp(&a.score),
    };
    by_score
        .then_with(|| a.date.cmp(&b.date))
        .then_with(|| a.athlete_id.cmp(&b.athlete_id))
}

/// Sorts `results` into ranking order in place.
pub fn sort_for_ranking(order: ScoreOrder, results: &mut [TestResult]) {
    results.sort_by(|a, b| compare_results(order, a, b));
}

/// Picks the winning result out of a slice, if any.
pub fn best_result<'a>(order: ScoreOrder, results: &'a [TestResult]) -> Option<&'a TestResult> {
    results.iter().min_by(|a, b| compare_results(order, a, b))
}

/// 1-based contiguous rank for the i-th row of a sorted ranking.
pub fn rank_of(index: usize) -> i64 {
    index as i64 + 1
}

#[cfg(test)]
mod tests {
    use super::{best_result, compare_results, rank_of, sort_for_ranking, ScoreOrder};
    use crate::model::records::TestResult;
    use std::cmp::Ordering;

    fn result(athlete_id: &str, score: f64, date: &str) -> TestResult {
        TestResult::new(
            format!("r-{athlete_id}-{date}"),
            athlete_id,
            "40yd",
            score,
            "s",
            date,
            50,
            "Speed",
        )
    }

    #[test]
    fn speed_category_prefers_lower_scores() {
        let order = ScoreOrder::for_category("Speed");
        assert!(order.is_better(4.5, 4.8));
        assert!(!order.is_better(4.8, 4.5));
    }

    #[test]
    fn other_categories_prefer_higher_scores() {
        for category in ["Power", "Strength", "Core", "Anything Else"] {
            let order = ScoreOrder::for_category(category);
            assert!(order.is_better(120.0, 100.0), "category {category}");
        }
    }

    #[test]
    fn equal_scores_are_not_an_improvement() {
        assert!(!ScoreOrder::LowerIsBetter.is_better(4.5, 4.5));
        assert!(!ScoreOrder::HigherIsBetter.is_better(4.5, 4.5));
    }

    #[test]
    fn ties_break_on_earlier_date_then_athlete_id() {
        let order = ScoreOrder::LowerIsBetter;
        let earlier = result("a2", 4.5, "2025-01-01");
        let later = result("a1", 4.5, "2025-02-01");
        assert_eq!(compare_results(order, &earlier, &later), Ordering::Less);

        let same_day_a = result("a1", 4.5, "2025-01-01");
        let same_day_b = result("a2", 4.5, "2025-01-01");
        assert_eq!(compare_results(order, &same_day_a, &same_day_b), Ordering::Less);
    }

    #[test]
    fn sorting_yields_contiguous_ranks() {
        let mut results = vec![
            result("a1", 4.8, "2025-01-05"),
            result("a2", 4.5, "2025-01-06"),
            result("a3", 4.5, "2025-01-01"),
        ];
        sort_for_ranking(ScoreOrder::LowerIsBetter, &mut results);
        let ranked: Vec<(&str, i64)> = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.athlete_id.as_str(), rank_of(i)))
            .collect();
        assert_eq!(ranked, vec![("a3", 1), ("a2", 2), ("a1", 3)]);
    }

    #[test]
    fn best_result_matches_sort_winner() {
        let results = vec![
            result("a1", 11.0, "2025-01-05"),
            result("a2", 12.0, "2025-01-06"),
        ];
        let best = best_result(ScoreOrder::HigherIsBetter, &results);
        assert_eq!(best.map(|r| r.athlete_id.as_str()), Some("a2"));
    }

    #[test]
    fn best_of_empty_is_none() {
        assert!(best_result(ScoreOrder::LowerIsBetter, &[]).is_none());
    }
}
