//! Run metrics records handed to external reporting.
//!
//! These are the only state the search shares with the reporting side:
//! plain serializable records, tagged with the method that produced them.

use serde::Serialize;

/// Metrics for one full tree search over a question.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetrics {
    /// Best score ever observed across iterations.
    pub best_score: f64,
    /// Mean of the per-iteration scores.
    pub average_score: f64,
    /// Last iteration score minus first; 0.0 with fewer than two iterations.
    pub score_improvement: f64,
    /// Wall-clock seconds spent in the loop.
    pub execution_time: f64,
    /// Per-iteration scores in order.
    pub iteration_scores: Vec<f64>,
    /// Node count of the final tree, by full pre-order traversal.
    pub total_nodes_explored: usize,
}

impl RunMetrics {
    pub fn from_iterations(
        best_score: f64,
        iteration_scores: Vec<f64>,
        execution_time: f64,
        total_nodes_explored: usize,
    ) -> Self {
        let average_score = if iteration_scores.is_empty() {
            0.0
        } else {
            iteration_scores.iter().sum::<f64>() / iteration_scores.len() as f64
        };
        let score_improvement = match (iteration_scores.first(), iteration_scores.last()) {
            (Some(first), Some(last)) if iteration_scores.len() > 1 => last - first,
            _ => 0.0,
        };
        Self {
            best_score,
            average_score,
            score_improvement,
            execution_time,
            iteration_scores,
            total_nodes_explored,
        }
    }
}

/// Metrics for the single-shot baseline path.
#[derive(Debug, Clone, Serialize)]
pub struct BaselineMetrics {
    pub score: f64,
    pub execution_time: f64,
}

/// Record shape consumed by the reporting collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MetricsRecord {
    Mcts(RunMetrics),
    Baseline(BaselineMetrics),
}
