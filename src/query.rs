//! Query lifecycle: `Idle → Loading → Success | Error`.
//!
//! Every accepted submit gets a new generation number. Only the outcome
//! carrying the latest generation is applied; older ones are dropped, so a
//! superseded request can never overwrite what the newest one shows.

use std::sync::Arc;

use crate::model::{Payload, ResultSet};
use crate::service::ServiceError;
use crate::storage::RecentQueries;

pub const PRESET_QUERIES: [&str; 5] = [
    "Analyze Wakad",
    "Compare Ambegaon Budruk and Aundh demand trends",
    "Show price growth for Akurdi over the last 3 years",
    "Which area has the highest demand?",
    "Price trends in Pune areas",
];

/// Query text submitted when an area or suggestion is clicked.
pub fn analyze_query(area: &str) -> String {
    format!("Analyze {}", area)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailureView {
    /// Banner text; `None` once dismissed.
    pub message: Option<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub enum QueryState {
    #[default]
    Idle,
    Loading {
        query: String,
    },
    Success(Arc<ResultSet>),
    Error(QueryFailureView),
}

/// Handed to whoever performs the request; returned with the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// A newer submit exists; nothing changed.
    Stale,
    /// Results are showing and the recent-query list changed.
    Succeeded,
    Failed,
}

/// What the results area should render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presentation<'a> {
    Idle,
    Loading,
    Suggestions(&'a [String]),
    Results(&'a ResultSet),
    NoResults,
}

#[derive(Debug, Default)]
pub struct QueryOrchestrator {
    state: QueryState,
    recent: RecentQueries,
    generation: u64,
}

impl QueryOrchestrator {
    pub fn new(recent: RecentQueries) -> Self {
        Self {
            recent,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn recent(&self) -> &RecentQueries {
        &self.recent
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, QueryState::Loading { .. })
    }

    /// Starts a request for `raw`. Blank input is ignored and returns `None`.
    pub fn submit(&mut self, raw: &str) -> Option<Ticket> {
        let query = raw.trim();
        if query.is_empty() {
            return None;
        }

        self.generation += 1;
        self.state = QueryState::Loading {
            query: query.to_string(),
        };
        log::info!("query #{} submitted: {:?}", self.generation, query);

        Some(Ticket {
            generation: self.generation,
            query: query.to_string(),
        })
    }

    pub fn settle(
        &mut self,
        ticket: &Ticket,
        outcome: Result<ResultSet, ServiceError>,
    ) -> Settlement {
        if ticket.generation != self.generation {
            log::debug!(
                "dropping stale response for query #{} (latest is #{})",
                ticket.generation,
                self.generation
            );
            return Settlement::Stale;
        }

        match outcome {
            Ok(result) => {
                log::info!(
                    "query #{} answered: {} rows",
                    ticket.generation,
                    result.table.len()
                );
                self.recent.record(&ticket.query);
                self.state = QueryState::Success(Arc::new(result));
                Settlement::Succeeded
            }
            Err(err) => {
                log::warn!("query #{} failed: {}", ticket.generation, err);
                self.state = QueryState::Error(QueryFailureView {
                    message: Some(err.query_message()),
                    suggestions: err.suggestions().to_vec(),
                });
                Settlement::Failed
            }
        }
    }

    /// Hides the error banner. An error without suggestions returns to `Idle`.
    pub fn dismiss_error(&mut self) {
        if let QueryState::Error(view) = &mut self.state {
            if view.suggestions.is_empty() {
                self.state = QueryState::Idle;
            } else {
                view.message = None;
            }
        }
    }

    /// Drops results, e.g. after a new dataset was uploaded. Pending requests become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = QueryState::Idle;
    }

    pub fn error_banner(&self) -> Option<&str> {
        match &self.state {
            QueryState::Error(view) => view.message.as_deref(),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&Arc<ResultSet>> {
        match &self.state {
            QueryState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn presentation(&self) -> Presentation<'_> {
        match &self.state {
            QueryState::Idle => Presentation::Idle,
            QueryState::Loading { .. } => Presentation::Loading,
            QueryState::Error(view) if !view.suggestions.is_empty() => {
                Presentation::Suggestions(&view.suggestions)
            }
            QueryState::Error(_) => Presentation::Idle,
            QueryState::Success(result) => match result.payload() {
                Payload::Suggestions(s) => Presentation::Suggestions(s),
                Payload::Results { .. } => Presentation::Results(result),
                Payload::Empty => Presentation::NoResults,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QueryFailure;
    use serde_json::json;

    fn result(v: serde_json::Value) -> ResultSet {
        serde_json::from_value(v).unwrap()
    }

    fn wakad() -> ResultSet {
        result(json!({
            "summary": "Wakad prices rose",
            "table": [{"year": 2023, "area": "Wakad"}],
            "total_rows": 1
        }))
    }

    #[test]
    fn blank_submit_is_ignored() {
        let mut q = QueryOrchestrator::default();
        assert!(q.submit("   \n\t").is_none());
        assert!(matches!(q.state(), QueryState::Idle));

        let ticket = q.submit("Analyze Wakad").unwrap();
        q.settle(&ticket, Ok(wakad()));
        assert!(q.submit("").is_none());
        assert!(matches!(q.state(), QueryState::Success(_)));
    }

    #[test]
    fn submit_clears_previous_results() {
        let mut q = QueryOrchestrator::default();
        let t = q.submit("Analyze Wakad").unwrap();
        q.settle(&t, Ok(wakad()));
        assert!(q.result().is_some());

        let t2 = q.submit("  Analyze Aundh  ").unwrap();
        assert_eq!(t2.query, "Analyze Aundh");
        assert!(q.is_loading());
        assert!(q.result().is_none());
        assert_eq!(q.presentation(), Presentation::Loading);
    }

    #[test]
    fn success_records_recent_query() {
        let mut q = QueryOrchestrator::default();
        let t = q.submit("Analyze Wakad").unwrap();
        assert_eq!(q.settle(&t, Ok(wakad())), Settlement::Succeeded);
        assert_eq!(q.recent().items(), ["Analyze Wakad"]);
        assert!(matches!(q.presentation(), Presentation::Results(_)));
    }

    #[test]
    fn failure_is_not_recorded() {
        let mut q = QueryOrchestrator::default();
        let t = q.submit("Analyze Nowhere").unwrap();
        let settled = q.settle(&t, Err(ServiceError::Network("refused".into())));
        assert_eq!(settled, Settlement::Failed);
        assert!(q.recent().is_empty());
        assert_eq!(
            q.error_banner(),
            Some("Failed to process query. Please try again.")
        );
        assert_eq!(q.presentation(), Presentation::Idle);
    }

    #[test]
    fn rejected_with_suggestions_shows_picker() {
        let mut q = QueryOrchestrator::default();
        let t = q.submit("Analyze Wakd").unwrap();
        q.settle(
            &t,
            Err(ServiceError::Rejected(QueryFailure {
                error: "No exact matches found. Did you mean: Wakad, Aundh?".into(),
                suggestions: Some(vec!["Wakad".into(), "Aundh".into()]),
            })),
        );

        assert_eq!(
            q.error_banner(),
            Some("No exact matches found. Did you mean: Wakad, Aundh?")
        );
        let names = ["Wakad".to_string(), "Aundh".to_string()];
        assert_eq!(q.presentation(), Presentation::Suggestions(&names));

        q.dismiss_error();
        assert_eq!(q.error_banner(), None);
        assert_eq!(q.presentation(), Presentation::Suggestions(&names));
    }

    #[test]
    fn success_with_only_suggestions_shows_picker() {
        let mut q = QueryOrchestrator::default();
        let t = q.submit("Analyze Wakd").unwrap();
        q.settle(&t, Ok(result(json!({"suggestions": ["Wakad", "Aundh"]}))));
        match q.presentation() {
            Presentation::Suggestions(s) => assert_eq!(s, ["Wakad", "Aundh"]),
            other => panic!("expected suggestions, got {:?}", other),
        }
    }

    #[test]
    fn empty_success_is_no_results() {
        let mut q = QueryOrchestrator::default();
        let t = q.submit("Analyze Wakad").unwrap();
        q.settle(&t, Ok(result(json!({"summary": "", "chart": {}, "table": []}))));
        assert_eq!(q.presentation(), Presentation::NoResults);
    }

    #[test]
    fn superseded_response_is_dropped() {
        let mut q = QueryOrchestrator::default();
        let first = q.submit("Analyze Wakad").unwrap();
        let second = q.submit("Analyze Aundh").unwrap();

        let aundh = result(json!({"summary": "Aundh", "table": [{"area": "Aundh"}]}));
        assert_eq!(q.settle(&second, Ok(aundh)), Settlement::Succeeded);
        assert_eq!(q.settle(&first, Ok(wakad())), Settlement::Stale);

        assert_eq!(q.result().unwrap().summary(), Some("Aundh"));
        assert_eq!(q.recent().items(), ["Analyze Aundh"]);
    }

    #[test]
    fn stale_failure_does_not_clobber_loading() {
        let mut q = QueryOrchestrator::default();
        let first = q.submit("a").unwrap();
        let _second = q.submit("b").unwrap();
        q.settle(&first, Err(ServiceError::Http(500, String::new())));
        assert!(q.is_loading());
        assert_eq!(q.error_banner(), None);
    }

    #[test]
    fn dismiss_plain_error_returns_to_idle() {
        let mut q = QueryOrchestrator::default();
        let t = q.submit("a").unwrap();
        q.settle(&t, Err(ServiceError::Http(500, String::new())));
        q.dismiss_error();
        assert!(matches!(q.state(), QueryState::Idle));
    }

    #[test]
    fn reset_invalidates_pending() {
        let mut q = QueryOrchestrator::default();
        let t = q.submit("a").unwrap();
        q.reset();
        assert_eq!(q.settle(&t, Ok(wakad())), Settlement::Stale);
        assert_eq!(q.presentation(), Presentation::Idle);
    }

    #[test]
    fn suggestion_click_builds_analyze_query() {
        let mut q = QueryOrchestrator::default();
        let t = q.submit(&analyze_query("Wakad")).unwrap();
        assert_eq!(t.query, "Analyze Wakad");
    }
}
