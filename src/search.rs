//! The MCTS loop over candidate queries.
//!
//! One tree per question. Every iteration runs four phases: UCB1 selection
//! down to a leaf (or terminal node), bounded expansion through a hinted
//! prompt variant, a single evaluation of the chosen candidate, and
//! backpropagation of the reward along the parent chain. The controller
//! separately tracks the best `(score, query)` pair ever observed and
//! returns that query, not the most-visited child: the goal is the best
//! single SQL string found, not a repeatable policy.
//!
//! The search is strictly sequential per question; each iteration depends
//! on the tree mutated by the previous one. Concurrent questions each get
//! their own controller invocation and their own tree.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::database::Schema;
use crate::error::{Result, ScoutError};
use crate::llm::CandidateGenerator;
use crate::metrics::{BaselineMetrics, RunMetrics};
use crate::node::NodeId;
use crate::prompt;
use crate::score::QueryEvaluator;
use crate::tree::SearchTree;

/// Temperature used for the root candidate and the baseline path.
pub const BASE_TEMPERATURE: f64 = 0.7;

/// Upper clamp for the drifting per-iteration temperature. The schedule
/// `0.7 + 0.05 * i` is unbounded in the iteration index and the backend's
/// valid range is unspecified, so we cap explicitly rather than rely on
/// upstream truncation.
pub const MAX_TEMPERATURE: f64 = 1.5;

/// Budgets and constants for one search invocation.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Iteration budget; must be positive.
    pub num_iterations: u32,
    /// Wall-clock budget, checked once per iteration boundary; must be
    /// positive. In-flight generation or evaluation is never interrupted.
    pub max_time: Duration,
    /// UCB1 exploration constant, approximately sqrt(2).
    pub exploration: f64,
    /// Maximum children per node.
    pub max_children: usize,
    /// Token budget forwarded to the generation backend.
    pub max_tokens: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_iterations: 10,
            max_time: Duration::from_secs(30),
            exploration: 1.41,
            max_children: 5,
            max_tokens: 256,
        }
    }
}

impl SearchConfig {
    /// Reject out-of-range budgets eagerly, before any search runs.
    pub fn validate(&self) -> Result<()> {
        if self.num_iterations == 0 {
            return Err(ScoutError::Config(
                "iteration budget must be positive".into(),
            ));
        }
        if self.max_time.is_zero() {
            return Err(ScoutError::Config("time budget must be positive".into()));
        }
        Ok(())
    }
}

/// Temperature for iteration `i`: upward drift, explicit clamp.
pub fn temperature_for(iteration: usize) -> f64 {
    (BASE_TEMPERATURE + 0.05 * iteration as f64).min(MAX_TEMPERATURE)
}

/// Result of one search invocation.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_query: String,
    pub metrics: RunMetrics,
}

/// Result of the single-shot baseline path.
#[derive(Debug, Clone)]
pub struct BaselineOutcome {
    pub query: String,
    pub metrics: BaselineMetrics,
}

/// Owns the per-question loop. Generator and evaluator are borrowed
/// collaborators constructed once at process start and passed in by
/// reference; the controller holds no ambient state between questions.
pub struct SearchController<'a, G: CandidateGenerator, E: QueryEvaluator> {
    generator: &'a G,
    evaluator: &'a E,
    config: SearchConfig,
}

impl<'a, G: CandidateGenerator, E: QueryEvaluator> SearchController<'a, G, E> {
    pub fn new(generator: &'a G, evaluator: &'a E, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            generator,
            evaluator,
            config,
        })
    }

    /// Run the full tree search for one question.
    pub fn search(&self, question: &str, schema: &Schema) -> SearchOutcome {
        let base_prompt = prompt::base_prompt(schema, question);
        let root_query =
            self.generator
                .generate(&base_prompt, BASE_TEMPERATURE, self.config.max_tokens);
        let mut tree = SearchTree::new(root_query.clone());

        let mut best_query = root_query;
        let mut best_score = 0.0_f64;
        let mut iteration_scores = Vec::new();

        let started = Instant::now();
        for i in 0..self.config.num_iterations as usize {
            // The only cancellation point: in-flight calls are never cut.
            if started.elapsed() > self.config.max_time {
                debug!(iteration = i, "time budget exhausted");
                break;
            }

            let target = search_iteration(
                &mut tree,
                self.generator,
                self.evaluator,
                &self.config,
                &base_prompt,
                question,
                i,
            );
            let score = target.score;
            iteration_scores.push(score);

            if score > best_score {
                best_score = score;
                best_query = tree.get(target.node).query.clone();
            }

            info!(
                iteration = i + 1,
                score,
                query = %preview(&tree.get(target.node).query),
                "iteration complete"
            );
        }

        let metrics = RunMetrics::from_iterations(
            best_score,
            iteration_scores,
            started.elapsed().as_secs_f64(),
            tree.node_count(),
        );
        SearchOutcome {
            best_query,
            metrics,
        }
    }

    /// Single generate + evaluate call from the base prompt; the reference
    /// point the search is compared against.
    pub fn baseline(&self, question: &str, schema: &Schema) -> BaselineOutcome {
        let started = Instant::now();
        let prompt = prompt::base_prompt(schema, question);
        let query = self
            .generator
            .generate(&prompt, BASE_TEMPERATURE, self.config.max_tokens);
        let score = self.evaluator.evaluate(&query, question);
        BaselineOutcome {
            query,
            metrics: BaselineMetrics {
                score,
                execution_time: started.elapsed().as_secs_f64(),
            },
        }
    }
}

/// Node evaluated by one iteration, with the reward it earned.
struct IterationTarget {
    node: NodeId,
    score: f64,
}

/// One full iteration: selection, expansion, evaluation, backpropagation.
///
/// When expansion is blocked because the generated candidate duplicates an
/// existing child, the already-selected node is evaluated and credited
/// again; the iteration is never aborted.
fn search_iteration<G: CandidateGenerator, E: QueryEvaluator>(
    tree: &mut SearchTree,
    generator: &G,
    evaluator: &E,
    config: &SearchConfig,
    base_prompt: &str,
    question: &str,
    iteration: usize,
) -> IterationTarget {
    let selected = select_leaf(tree, config.exploration);
    let mut target = selected;

    if tree.get(selected).children.len() < config.max_children {
        let variant = prompt::prompt_variant(base_prompt, iteration);
        let candidate =
            generator.generate(&variant, temperature_for(iteration), config.max_tokens);
        match tree.add_child(selected, candidate) {
            Some(child) => target = child,
            // Duplicate sibling: fall through and re-evaluate `selected`.
            None => debug!(iteration, "duplicate candidate rejected"),
        }
    }

    let score = evaluator.evaluate(&tree.get(target).query, question);
    tree.backpropagate(target, score);
    IterationTarget {
        node: target,
        score,
    }
}

/// Descend from the root to a node with no children or a terminal node,
/// always taking the maximal-score child.
fn select_leaf(tree: &SearchTree, exploration: f64) -> NodeId {
    let mut current = tree.root();
    loop {
        let node = tree.get(current);
        if node.is_leaf() {
            return current;
        }
        match tree.select_child(current, exploration) {
            Some(child) => current = child,
            None => return current,
        }
    }
}

fn preview(query: &str) -> &str {
    let end = query
        .char_indices()
        .nth(80)
        .map(|(i, _)| i)
        .unwrap_or(query.len());
    &query[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Generator replaying a fixed script, then repeating its last entry.
    struct ScriptedGenerator {
        script: Vec<&'static str>,
        cursor: Mutex<usize>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<&'static str>) -> Self {
            Self {
                script,
                cursor: Mutex::new(0),
            }
        }
    }

    impl CandidateGenerator for ScriptedGenerator {
        fn generate(&self, _prompt: &str, _temperature: f64, _max_tokens: u32) -> String {
            let mut cursor = self.cursor.lock().unwrap();
            let index = (*cursor).min(self.script.len() - 1);
            *cursor += 1;
            self.script[index].to_string()
        }
    }

    /// Evaluator scoring by query length, deterministic and database-free.
    struct LengthEvaluator;

    impl QueryEvaluator for LengthEvaluator {
        fn evaluate(&self, query: &str, _question: &str) -> f64 {
            (query.len() as f64 / 100.0).min(1.0)
        }
    }

    #[test]
    fn config_rejects_non_positive_budgets() {
        let mut config = SearchConfig::default();
        config.num_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = SearchConfig::default();
        config.max_time = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn temperature_drifts_then_clamps() {
        assert!((temperature_for(0) - 0.7).abs() < 1e-12);
        assert!((temperature_for(4) - 0.9).abs() < 1e-12);
        assert!((temperature_for(16) - 1.5).abs() < 1e-12);
        assert!((temperature_for(1000) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn selection_stops_at_terminal_node_with_children() {
        let mut tree = SearchTree::new("SELECT 1;".into());
        tree.add_child(tree.root(), "SELECT 2;".into()).unwrap();
        tree.get_mut(tree.root()).terminal = true;

        assert_eq!(select_leaf(&tree, 1.41), tree.root());
    }

    #[test]
    fn duplicate_candidate_recredits_selected_node() {
        // Reference behavior, reproduced faithfully: a blocked expansion
        // evaluates and credits the already-selected node instead of
        // skipping the iteration or retrying generation.
        let mut tree = SearchTree::new("SELECT 1;".into());
        let child = tree.add_child(tree.root(), "SELECT 2;".into()).unwrap();
        tree.get_mut(tree.root()).terminal = true;

        let generator = ScriptedGenerator::new(vec!["SELECT 2;"]);
        let config = SearchConfig::default();
        let target = search_iteration(
            &mut tree,
            &generator,
            &LengthEvaluator,
            &config,
            "base",
            "q",
            0,
        );

        assert_eq!(target.node, tree.root(), "selected node is re-evaluated");
        assert_eq!(tree.len(), 2, "no node added for the duplicate");
        assert_eq!(tree.get(tree.root()).visits, 1);
        assert_eq!(tree.get(child).visits, 0, "the duplicate sibling is untouched");
    }

    #[test]
    fn full_node_is_never_expanded() {
        let mut tree = SearchTree::new("SELECT 0;".into());
        for i in 1..=5 {
            tree.add_child(tree.root(), format!("SELECT {i};")).unwrap();
        }
        tree.get_mut(tree.root()).terminal = true;

        // Fresh text the tree has never seen; the child cap must still win.
        let generator = ScriptedGenerator::new(vec!["SELECT 99;"]);
        let config = SearchConfig::default();
        let target = search_iteration(
            &mut tree,
            &generator,
            &LengthEvaluator,
            &config,
            "base",
            "q",
            0,
        );

        assert_eq!(target.node, tree.root());
        assert_eq!(tree.get(tree.root()).children.len(), 5, "no sixth child");
    }

    #[test]
    fn root_visits_equal_completed_iterations() {
        let generator = ScriptedGenerator::new(vec![
            "SELECT 2;",
            "SELECT 3;",
            "SELECT 4;",
        ]);
        let config = SearchConfig {
            num_iterations: 3,
            ..SearchConfig::default()
        };
        let mut tree = SearchTree::new("SELECT 1;".into());

        for i in 0..config.num_iterations as usize {
            search_iteration(
                &mut tree,
                &generator,
                &LengthEvaluator,
                &config,
                "base",
                "q",
                i,
            );
            // Every backpropagated path includes the root.
            assert_eq!(tree.get(tree.root()).visits, i as u32 + 1);
        }
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn best_score_is_non_decreasing_in_iteration_budget() {
        let script = vec![
            "SELECT 1;",
            "SELECT 22;",
            "SELECT 333;",
            "SELECT 4;",
            "SELECT 55;",
        ];
        let mut previous_best = 0.0_f64;
        for budget in 1..=5u32 {
            let generator = ScriptedGenerator::new(script.clone());
            let config = SearchConfig {
                num_iterations: budget,
                ..SearchConfig::default()
            };
            let controller =
                SearchController::new(&generator, &LengthEvaluator, config).unwrap();
            let outcome = controller.search("q", &Schema::new());
            assert!(
                outcome.metrics.best_score >= previous_best,
                "best score regressed between budgets {} and {}",
                budget - 1,
                budget
            );
            previous_best = outcome.metrics.best_score;
        }
    }

    #[test]
    fn baseline_is_a_single_generate_and_evaluate() {
        let generator = ScriptedGenerator::new(vec!["SELECT 1;", "SELECT 2;"]);
        let controller = SearchController::new(
            &generator,
            &LengthEvaluator,
            SearchConfig::default(),
        )
        .unwrap();
        let outcome = controller.baseline("q", &Schema::new());

        assert_eq!(outcome.query, "SELECT 1;");
        assert!((outcome.metrics.score - 0.09).abs() < 1e-12);
        // Only the first script entry was consumed.
        assert_eq!(*generator.cursor.lock().unwrap(), 1);
    }
}
