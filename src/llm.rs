//! Candidate generation against an Ollama-compatible text-generation backend.
//!
//! The generator contract is "never fails": transport errors, non-2xx
//! responses and malformed bodies are all absorbed and replaced with a fixed
//! fallback candidate, so the search loop needs no error branch on this
//! axis. Raw model output is noisy (reasoning text, code fences), so a
//! layered extraction policy recovers the actual query:
//!
//! 1. the first `SELECT ... ;` match, case-insensitive across lines,
//!    collapsed to a single line and trimmed;
//! 2. otherwise the first line whose trimmed upper-case form starts with
//!    `SELECT`;
//! 3. otherwise the trimmed raw text verbatim.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{debug, warn};

/// Candidate returned whenever the backend cannot produce one.
pub const FALLBACK_QUERY: &str = "SELECT 1;";

lazy_static! {
    static ref SELECT_STATEMENT: Regex =
        Regex::new(r"(?is)(SELECT\s+.*?;)").expect("statement pattern is valid");
}

/// Source of candidate SQL strings. Always returns a usable string; the
/// implementation decides what "usable" means when the backend misbehaves.
pub trait CandidateGenerator {
    fn generate(&self, prompt: &str, temperature: f64, max_tokens: u32) -> String;
}

/// HTTP client for an Ollama-style `/api/generate` endpoint.
#[derive(Debug)]
pub struct LlmClient {
    endpoint: String,
    model: String,
    agent: ureq::Agent,
}

impl LlmClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn request(&self, prompt: &str, temperature: f64, max_tokens: u32) -> Option<String> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "temperature": temperature,
            "options": { "num_predict": max_tokens },
            "stream": false,
        });
        let response = match self.agent.post(&self.endpoint).send_json(payload) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "generation request failed, substituting fallback");
                return None;
            }
        };
        let body: serde_json::Value = match response.into_json() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "malformed generation response, substituting fallback");
                return None;
            }
        };
        body.get("response")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
    }
}

impl CandidateGenerator for LlmClient {
    fn generate(&self, prompt: &str, temperature: f64, max_tokens: u32) -> String {
        match self.request(prompt, temperature, max_tokens) {
            Some(raw) => {
                let sql = extract_sql(&raw);
                debug!(candidate = %sql, "candidate generated");
                sql
            }
            None => FALLBACK_QUERY.to_string(),
        }
    }
}

/// Pull a single-line SQL statement out of free-form model output.
pub fn extract_sql(response: &str) -> String {
    if let Some(found) = SELECT_STATEMENT.find(response) {
        let collapsed: String = found
            .as_str()
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ");
        return collapsed.trim().to_string();
    }
    for line in response.lines() {
        if line.trim().to_uppercase().starts_with("SELECT") {
            return line.trim().to_string();
        }
    }
    response.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_terminated_statement() {
        let raw = "Here is the query you asked for:\nSELECT name\nFROM Schools;\nHope it helps!";
        assert_eq!(extract_sql(raw), "SELECT name FROM Schools;");
    }

    #[test]
    fn extraction_is_case_insensitive() {
        assert_eq!(
            extract_sql("```sql\nselect 1 from Students;\n```"),
            "select 1 from Students;"
        );
    }

    #[test]
    fn falls_back_to_first_select_line() {
        let raw = "I think the answer is\nSELECT count(*) FROM Students\nbut double-check";
        assert_eq!(extract_sql(raw), "SELECT count(*) FROM Students");
    }

    #[test]
    fn verbatim_when_nothing_matches() {
        assert_eq!(extract_sql("  no sql here  "), "no sql here");
    }

    #[test]
    fn first_statement_wins() {
        let raw = "SELECT 1; SELECT 2;";
        assert_eq!(extract_sql(raw), "SELECT 1;");
    }
}
