//! Sqlscout – natural-language questions to executable SQL via tree search.
//!
//! A question is turned into candidate SQL queries by a text-generation
//! backend; a Monte Carlo Tree Search over the candidate strings refines
//! the choice, scoring each candidate by executing it against the target
//! SQLite database and applying a bounded heuristic reward.
//!
//! ## Modules
//! * [`node`] / [`tree`] – the arena-allocated candidate tree with visit
//!   and reward statistics (UCB1 selection, pre-order traversal).
//! * [`search`] – the MCTS controller: selection, bounded expansion,
//!   single-shot evaluation, backpropagation, plus the baseline path.
//! * [`llm`] – candidate generation against an Ollama-compatible backend,
//!   with the "never fails" fallback contract and SQL extraction.
//! * [`prompt`] – base prompt construction from schema metadata and the
//!   cyclic hint variants used during expansion.
//! * [`score`] – the execution-backed reward heuristic in [0, 1].
//! * [`database`] – SQLite schema introspection and query execution.
//! * [`metrics`] – serializable run records for external reporting.
//! * [`server`] – the axum service boundary.
//! * [`settings`] – layered configuration (defaults, file, environment).
//!
//! ## Quick Start
//! ```
//! use sqlscout::database::{DatabaseMode, SqlDatabase};
//! use sqlscout::llm::CandidateGenerator;
//! use sqlscout::score::ExecutionEvaluator;
//! use sqlscout::search::{SearchConfig, SearchController};
//!
//! struct OneShot;
//! impl CandidateGenerator for OneShot {
//!     fn generate(&self, _prompt: &str, _temperature: f64, _max_tokens: u32) -> String {
//!         "SELECT 1;".to_string()
//!     }
//! }
//!
//! let db = SqlDatabase::open(DatabaseMode::InMemory).unwrap();
//! let schema = db.introspect_schema().unwrap();
//! let evaluator = ExecutionEvaluator::new(&db);
//! let controller = SearchController::new(&OneShot, &evaluator, SearchConfig::default()).unwrap();
//! let outcome = controller.search("anything", &schema);
//! assert!(outcome.metrics.best_score > 0.0);
//! ```

pub mod database;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod node;
pub mod prompt;
pub mod score;
pub mod search;
pub mod server;
pub mod settings;
pub mod tree;
