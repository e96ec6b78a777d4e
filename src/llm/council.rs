//! LLM Council - parallel fan-out of one prompt to many models

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::CouncilError;
use crate::llm::provider::{Message, QueryOutcome};
use crate::llm::registry::{AdapterRegistry, ProviderStatus};
use crate::llm::router::{ModeSource, Router};

/// Outcome per requested model, iterated in request order.
///
/// A model requested twice keeps its first position and its last outcome.
#[derive(Debug, Default)]
pub struct CouncilResponses {
    entries: Vec<(String, QueryOutcome)>,
}

impl CouncilResponses {
    fn insert(&mut self, model: String, outcome: QueryOutcome) {
        match self.entries.iter_mut().find(|(m, _)| *m == model) {
            Some(entry) => entry.1 = outcome,
            None => self.entries.push((model, outcome)),
        }
    }

    pub fn get(&self, model: &str) -> Option<&QueryOutcome> {
        self.entries
            .iter()
            .find(|(m, _)| m == model)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryOutcome)> {
        self.entries.iter().map(|(m, o)| (m.as_str(), o))
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(m, _)| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_ok()).count()
    }
}

impl IntoIterator for CouncilResponses {
    type Item = (String, QueryOutcome);
    type IntoIter = std::vec::IntoIter<(String, QueryOutcome)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Council of LLM backends queried side by side
pub struct Council {
    router: Arc<Router>,
    round_deadline: Option<Duration>,
}

impl Council {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            round_deadline: None,
        }
    }

    /// Build adapters from the config; the mode is re-read from `LLM_MODE`
    /// on every dispatch, falling back to `config.mode`
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(AdapterRegistry::from_config(config));
        Self::with_registry(registry, config)
    }

    /// Same as [`Council::from_config`] but sharing an existing registry
    pub fn with_registry(registry: Arc<AdapterRegistry>, config: &Config) -> Self {
        let router = Router::new(
            registry,
            ModeSource::Environment {
                fallback: config.mode,
            },
        )
        .with_default_timeout(config.council.timeout());

        Self::new(Arc::new(router)).with_round_deadline(config.council.round_deadline())
    }

    /// Abort members still running when the whole round exceeds `deadline`
    pub fn with_round_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.round_deadline = deadline;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn query_one(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> QueryOutcome {
        self.router.query(model, messages, timeout).await
    }

    /// Query every model concurrently with the router's default timeout.
    ///
    /// Always yields one entry per distinct model; a failing or slow member
    /// never cancels its siblings (short of the optional round deadline).
    pub async fn query_all(&self, models: &[String], messages: &[Message]) -> CouncilResponses {
        let started = Instant::now();
        let messages: Arc<[Message]> = messages.into();
        let mut set = JoinSet::new();

        for (index, model) in models.iter().enumerate() {
            let router = Arc::clone(&self.router);
            let messages = Arc::clone(&messages);
            let model = model.clone();
            set.spawn(async move {
                let outcome = router.query_default(&model, &messages).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<QueryOutcome>> = (0..models.len()).map(|_| None).collect();
        let deadline_hit = match self.round_deadline {
            Some(deadline) => {
                let finished =
                    tokio::time::timeout(deadline, collect(&mut set, &mut outcomes)).await;
                if finished.is_err() {
                    set.abort_all();
                    collect(&mut set, &mut outcomes).await;
                    true
                } else {
                    false
                }
            }
            None => {
                collect(&mut set, &mut outcomes).await;
                false
            }
        };

        let mut responses = CouncilResponses::default();
        for (model, outcome) in models.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| {
                let reason = match self.round_deadline {
                    Some(deadline) if deadline_hit => {
                        format!("round deadline of {:?} expired", deadline)
                    }
                    _ => "task ended without an outcome".to_string(),
                };
                warn!(model = %model, reason = %reason, "council member dropped");
                Err(CouncilError::TaskAborted(reason))
            });
            responses.insert(model.clone(), outcome);
        }

        info!(
            members = responses.len(),
            succeeded = responses.succeeded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "council round complete"
        );
        responses
    }

    pub fn provider_status(&self) -> ProviderStatus {
        self.router.status()
    }
}

/// Join every remaining task, recording outcomes by request index
async fn collect(
    set: &mut JoinSet<(usize, QueryOutcome)>,
    outcomes: &mut [Option<QueryOutcome>],
) {
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!(error = %e, "council member task panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::llm::provider::{Adapter, AdapterKind, QueryResult};
    use crate::llm::router::{ModeSwitch, OperatingMode};
    use pretty_assertions::assert_eq;

    /// Answers after `delay`; `fail` ids error, `panic` ids blow up
    struct Scripted {
        kind: AdapterKind,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl Adapter for Scripted {
        fn kind(&self) -> AdapterKind {
            self.kind
        }

        fn is_available(&self) -> bool {
            true
        }

        fn matches_model(&self, _model: &str) -> bool {
            true
        }

        fn normalize_model(&self, model: &str) -> String {
            model.to_string()
        }

        async fn send(
            &self,
            model: &str,
            _messages: &[Message],
            _timeout: Duration,
        ) -> Result<QueryResult> {
            let delay = if model.starts_with("slow") {
                Duration::from_secs(30)
            } else {
                self.delay
            };
            tokio::time::sleep(delay).await;

            if model.starts_with("fail") {
                return Err(CouncilError::Network("connection reset".to_string()));
            }
            if model.starts_with("panic") {
                panic!("adapter bug");
            }
            Ok(QueryResult::text(format!("answer from {}", model)))
        }
    }

    fn council(timeout: Duration) -> Council {
        let relay = Arc::new(Scripted {
            kind: AdapterKind::OpenRouter,
            delay: Duration::from_millis(10),
        });
        let registry = Arc::new(AdapterRegistry::new(Vec::new(), relay));
        let mode = ModeSource::Switch(ModeSwitch::new(OperatingMode::Relay));
        let router = Router::new(registry, mode).with_default_timeout(timeout);
        Council::new(Arc::new(router))
    }

    fn ids(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let council = council(Duration::from_secs(5));
        let models = ids(&["a/one", "fail/two", "c/three"]);

        let responses = council.query_all(&models, &[Message::user("hi")]).await;

        assert_eq!(
            responses.models().collect::<Vec<_>>(),
            vec!["a/one", "fail/two", "c/three"]
        );
        assert_eq!(
            responses.get("a/one"),
            Some(&Ok(QueryResult::text("answer from a/one")))
        );
        assert!(matches!(responses.get("fail/two"), Some(Err(CouncilError::Network(_)))));
        assert!(responses.get("c/three").unwrap().is_ok());
        assert_eq!(responses.succeeded(), 2);
    }

    #[tokio::test]
    async fn test_timeout_does_not_hold_back_siblings() {
        let council = council(Duration::from_millis(200));
        let models = ids(&["slow/one", "fast/two"]);
        let started = Instant::now();

        let responses = council.query_all(&models, &[Message::user("hi")]).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            responses.get("slow/one"),
            Some(&Err(CouncilError::Timeout(Duration::from_millis(200))))
        );
        assert!(responses.get("fast/two").unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_panicking_member_becomes_failure() {
        let council = council(Duration::from_secs(5));
        let models = ids(&["panic/one", "ok/two"]);

        let responses = council.query_all(&models, &[Message::user("hi")]).await;

        assert!(matches!(responses.get("panic/one"), Some(Err(CouncilError::TaskAborted(_)))));
        assert!(responses.get("ok/two").unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_round_deadline_aborts_stragglers() {
        let council = council(Duration::from_secs(60))
            .with_round_deadline(Some(Duration::from_millis(300)));
        let models = ids(&["slow/one", "quick/two"]);
        let started = Instant::now();

        let responses = council.query_all(&models, &[Message::user("hi")]).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(responses.get("slow/one"), Some(Err(CouncilError::TaskAborted(_)))));
        assert!(responses.get("quick/two").unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_ids_collapse_to_one_entry() {
        let council = council(Duration::from_secs(5));
        let models = ids(&["a/one", "b/two", "a/one"]);

        let responses = council.query_all(&models, &[Message::user("hi")]).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses.models().collect::<Vec<_>>(), vec!["a/one", "b/two"]);
    }

    #[tokio::test]
    async fn test_empty_council() {
        let council = council(Duration::from_secs(5));
        let responses = council.query_all(&[], &[Message::user("hi")]).await;
        assert!(responses.is_empty());
    }
}
