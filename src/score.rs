//! Reward heuristic for candidate queries.
//!
//! A candidate is scored by actually executing it; the evaluator always
//! returns a value in [0, 1] and never raises, so the search loop stays
//! branch-free on the failure axis. The policy is additive and clamped:
//!
//! * execution failure: 0.1 flat, a small nonzero floor so invalid branches
//!   stay distinguishable from the worst valid branch;
//! * execution success: +0.4;
//! * non-empty result set: +0.2, plus +0.2 when the row count lies in
//!   [1, 1000] and +0.1 otherwise;
//! * +0.05 per structural keyword present (JOIN, GROUP BY, ORDER BY,
//!   HAVING, WHERE), case-insensitive;
//! * capped at 1.0.

use tracing::debug;

use crate::database::SqlDatabase;

/// Reward for a candidate that fails to execute.
pub const FAILURE_SCORE: f64 = 0.1;

const STRUCTURAL_KEYWORDS: [&str; 5] = ["JOIN", "GROUP BY", "ORDER BY", "HAVING", "WHERE"];

/// Scores one candidate in the context of a question. Deterministic for a
/// fixed database state; executing the candidate is a side effect of
/// scoring it.
pub trait QueryEvaluator {
    fn evaluate(&self, query: &str, question: &str) -> f64;
}

/// Evaluator that runs candidates against the live database.
#[derive(Debug)]
pub struct ExecutionEvaluator<'a> {
    db: &'a SqlDatabase,
}

impl<'a> ExecutionEvaluator<'a> {
    pub fn new(db: &'a SqlDatabase) -> Self {
        Self { db }
    }
}

impl QueryEvaluator for ExecutionEvaluator<'_> {
    fn evaluate(&self, query: &str, _question: &str) -> f64 {
        let outcome = self.db.execute_query(query);
        if !outcome.success {
            debug!(error = outcome.error.as_deref().unwrap_or(""), "candidate failed");
            return FAILURE_SCORE;
        }

        let mut score = 0.4;
        let row_count = outcome.rows.len();
        if row_count > 0 {
            score += 0.2;
            score += if (1..=1000).contains(&row_count) { 0.2 } else { 0.1 };
        }
        score += keyword_bonus(query);
        score.min(1.0)
    }
}

fn keyword_bonus(query: &str) -> f64 {
    let upper = query.to_uppercase();
    STRUCTURAL_KEYWORDS
        .iter()
        .filter(|keyword| upper.contains(*keyword))
        .count() as f64
        * 0.05
}
