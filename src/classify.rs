//! Determines which model an endpoint serves and under which task.
//!
//! A stored record is authoritative. Without one, the endpoint name itself is
//! taken apart. Catalog endpoints are named
//! `<framework>-<task code>-<base model>[-<timestamp>]` and carry their task
//! in the name. Hub endpoints encode the model id with `/` replaced by `--`
//! and do not carry a task, so the hub is searched for the model and asked
//! for its pipeline tag. The reconstruction is lossy (hyphens inside a model
//! name are indistinguishable from the timestamp separator) and is therefore
//! only a best effort.

use std::str::FromStr;

use crate::hub::ModelHub;
use crate::registry::endpoint_name::{CUSTOM_PREFIX, PATH_DELIMITER};
use crate::registry::{ModelDeployment, ModelSource};
use crate::tasks::{CatalogTask, Task};
use crate::utils::errors::error_chain;
use crate::warn;

/// The model behind an endpoint and the task it performs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Classification {
    pub model_id: String,
    pub source: Option<ModelSource>,
    /// `None` when the task could not be determined or is not part of the
    /// source's vocabulary.
    pub task: Option<Task>,
    /// The task as labelled by the source, kept for error messages when the
    /// label is not understood.
    pub task_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CatalogEndpoint {
    pub framework: String,
    pub task_code: String,
    pub base_model: String,
}

impl CatalogEndpoint {
    /// The catalog id of the model, e.g. `huggingface-eqa-bert-base-cased`.
    pub(crate) fn model_id(&self) -> String {
        if self.base_model.is_empty() {
            format!("{}-{}", self.framework, self.task_code)
        } else {
            format!("{}-{}-{}", self.framework, self.task_code, self.base_model)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HubEndpoint {
    /// The reconstructed `author/name` id.
    pub model_id: String,
    pub author: Option<String>,
    /// The leading word of the model name, used as the search term.
    pub search_term: String,
    pub custom: bool,
}

fn is_timestamp(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn strip_timestamp(name: &str) -> &str {
    match name.rsplit_once('-') {
        Some((rest, last)) if is_timestamp(last) && !rest.is_empty() => rest,
        _ => name,
    }
}

/// Catalog endpoint names never contain the hub path delimiter.
pub(crate) fn is_catalog_endpoint(name: &str) -> bool {
    !name.contains(PATH_DELIMITER)
}

pub(crate) fn parse_catalog_endpoint(name: &str) -> Option<CatalogEndpoint> {
    if !is_catalog_endpoint(name) {
        return None;
    }

    let mut tokens = strip_timestamp(name).splitn(3, '-');

    let framework = tokens.next().filter(|t| !t.is_empty())?;
    let task_code = tokens.next().filter(|t| !t.is_empty())?;
    let base_model = tokens.next().unwrap_or_default();

    Some(CatalogEndpoint {
        framework: framework.to_string(),
        task_code: task_code.to_string(),
        base_model: base_model.to_string(),
    })
}

pub(crate) fn parse_hub_endpoint(name: &str) -> HubEndpoint {
    let (name, custom) = match name.strip_prefix(CUSTOM_PREFIX) {
        Some(rest) => (rest, true),
        None => (name, false),
    };

    let model_id = strip_timestamp(name).replace(PATH_DELIMITER, "/");

    let (author, model_name) = match model_id.split_once('/') {
        Some((author, model_name)) => (Some(author.to_string()), model_name),
        None => (None, model_id.as_str()),
    };

    let search_term = model_name
        .split(|c: char| c == '-' || c == '_' || c == '.')
        .find(|word| !word.is_empty())
        .unwrap_or(model_name)
        .to_string();

    HubEndpoint {
        model_id,
        author,
        search_term,
        custom,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, a_ch) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_ch) in b.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// A case-insensitive similarity between 0 (nothing in common) and 1
/// (identical).
pub(crate) fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    let longest = a.chars().count().max(b.chars().count());

    if longest == 0 {
        return 1.0;
    }

    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// The candidate most similar to `target`. Ties go to the earlier candidate.
fn best_match<'c>(target: &str, candidates: &'c [String]) -> Option<&'c str> {
    let mut best: Option<(&str, f64)> = None;

    for candidate in candidates {
        let score = similarity(target, candidate);

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    best.map(|(candidate, _)| candidate)
}

pub(crate) struct Classifier<'h> {
    hub: &'h dyn ModelHub,
}

impl<'h> Classifier<'h> {
    pub(crate) fn new(hub: &'h dyn ModelHub) -> Classifier<'h> {
        Classifier { hub }
    }

    /// Classifies `name`, an endpoint name or model id. A `deployment` takes
    /// precedence over anything derived from the name. Failures to determine
    /// the task are reported as `task = None`, never as errors.
    pub(crate) async fn classify(
        &self,
        name: &str,
        deployment: Option<&ModelDeployment>,
    ) -> Classification {
        if let Some(model) = deployment.and_then(|d| d.primary_model()) {
            return Classification {
                model_id: model.id.clone(),
                source: Some(model.source),
                task: model.parsed_task(),
                task_label: model.task.clone(),
            };
        }

        if is_catalog_endpoint(name) {
            self.classify_catalog(name)
        } else {
            self.classify_hub(name).await
        }
    }

    fn classify_catalog(&self, name: &str) -> Classification {
        match parse_catalog_endpoint(name) {
            Some(endpoint) => Classification {
                model_id: endpoint.model_id(),
                source: Some(ModelSource::Sagemaker),
                task: CatalogTask::from_str(&endpoint.task_code)
                    .ok()
                    .map(Task::Catalog),
                task_label: Some(endpoint.task_code),
            },
            None => Classification {
                model_id: name.to_string(),
                source: None,
                task: None,
                task_label: None,
            },
        }
    }

    async fn classify_hub(&self, name: &str) -> Classification {
        let endpoint = parse_hub_endpoint(name);

        let source = if endpoint.custom {
            ModelSource::Custom
        } else {
            ModelSource::HuggingFace
        };

        warn!(
            "no record for endpoint \"{}\", guessing the model \"{}\" from its name",
            name, endpoint.model_id
        );

        let candidates = match self
            .hub
            .search(&endpoint.search_term, endpoint.author.as_deref())
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!("hub search failed: {}", error_chain(&err));

                return Classification {
                    model_id: endpoint.model_id,
                    source: Some(source),
                    task: None,
                    task_label: None,
                };
            }
        };

        let model_id = best_match(&endpoint.model_id, &candidates)
            .unwrap_or(endpoint.model_id.as_str())
            .to_string();

        let task_label = match self.hub.model_task(&model_id).await {
            Ok(label) => label,
            Err(err) => {
                warn!("failed to look up the task of \"{}\": {}", model_id, error_chain(&err));

                None
            }
        };

        Classification {
            task: task_label
                .as_deref()
                .and_then(|label| Task::parse(source, label)),
            task_label,
            model_id,
            source: Some(source),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::hub::Error;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// An in-memory hub which records the searches made against it.
    #[derive(Default)]
    pub(crate) struct FakeHub {
        pub models: Vec<String>,
        pub tasks: HashMap<String, String>,
        pub searches: Mutex<Vec<(String, Option<String>)>>,
        pub fail: bool,
    }

    impl FakeHub {
        pub(crate) fn with_models(models: &[(&str, &str)]) -> FakeHub {
            FakeHub {
                models: models.iter().map(|(id, _)| id.to_string()).collect(),
                tasks: models
                    .iter()
                    .map(|(id, task)| (id.to_string(), task.to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ModelHub for FakeHub {
        async fn model_task(&self, model_id: &str) -> Result<Option<String>, Error> {
            if self.fail {
                return Err(Error::NotFound(model_id.to_string()));
            }

            match self.tasks.get(model_id) {
                Some(task) => Ok(Some(task.clone())),
                None => Err(Error::NotFound(model_id.to_string())),
            }
        }

        async fn search(&self, term: &str, author: Option<&str>) -> Result<Vec<String>, Error> {
            self.searches
                .lock()
                .unwrap()
                .push((term.to_string(), author.map(str::to_string)));

            if self.fail {
                return Err(Error::NotFound(term.to_string()));
            }

            Ok(self
                .models
                .iter()
                .filter(|id| id.contains(term))
                .filter(|id| author.map_or(true, |a| id.starts_with(&format!("{}/", a))))
                .cloned()
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeHub;
    use super::*;
    use crate::registry::{DeploymentRecord, ModelRecord};
    use crate::tasks::HubTask;

    #[test]
    fn test_parse_hub_endpoint() {
        let endpoint = parse_hub_endpoint("bert--base-uncased-202401011200");

        assert_eq!(
            endpoint,
            HubEndpoint {
                model_id: "bert/base-uncased".to_string(),
                author: Some("bert".to_string()),
                search_term: "base".to_string(),
                custom: false,
            }
        );

        let endpoint = parse_hub_endpoint("custom-acme--sentiment-model-20240101120000");

        assert_eq!(endpoint.model_id, "acme/sentiment-model");
        assert!(endpoint.custom);
    }

    #[test]
    fn test_parse_catalog_endpoint() {
        let endpoint = parse_catalog_endpoint("huggingface-eqa-bert-base-cased-20240101120000")
            .unwrap();

        assert_eq!(endpoint.framework, "huggingface");
        assert_eq!(endpoint.task_code, "eqa");
        assert_eq!(endpoint.base_model, "bert-base-cased");
        assert_eq!(endpoint.model_id(), "huggingface-eqa-bert-base-cased");

        assert!(parse_catalog_endpoint("bert--base-uncased").is_none());
        assert!(parse_catalog_endpoint("standalone").is_none());
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("bert/base-uncased", "BERT/base-uncased"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert!(similarity("bert/base-uncased", "bert/base-cased") > similarity("bert/base-uncased", "bert/large"));
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[tokio::test]
    async fn test_stored_record_is_authoritative() {
        let hub = FakeHub::default();

        let mut model = ModelRecord::new("distilbert/distilbert-base-uncased", ModelSource::HuggingFace);
        model.task = Some("question-answering".to_string());

        let deployment = ModelDeployment::new(
            DeploymentRecord::new("distilbert--distilbert-base-uncased-1", "ml.m5.xlarge"),
            model,
        );

        let classification = Classifier::new(&hub)
            .classify(deployment.endpoint_name(), Some(&deployment))
            .await;

        assert_eq!(classification.model_id, "distilbert/distilbert-base-uncased");
        assert_eq!(
            classification.task,
            Some(Task::Hub(HubTask::QuestionAnswering))
        );
        assert!(hub.searches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hub_endpoint_is_searched() {
        let hub = FakeHub::with_models(&[
            ("bert/base-cased", "fill-mask"),
            ("bert/base-uncased", "text-classification"),
        ]);

        let classification = Classifier::new(&hub)
            .classify("bert--base-uncased-202401011200", None)
            .await;

        assert_eq!(
            *hub.searches.lock().unwrap(),
            vec![("base".to_string(), Some("bert".to_string()))]
        );
        assert_eq!(classification.model_id, "bert/base-uncased");
        assert_eq!(classification.source, Some(ModelSource::HuggingFace));
        assert_eq!(
            classification.task,
            Some(Task::Hub(HubTask::TextClassification))
        );
    }

    #[tokio::test]
    async fn test_catalog_endpoint_carries_its_task() {
        let hub = FakeHub::default();

        let classification = Classifier::new(&hub)
            .classify("huggingface-spc-bert-base-cased-20240101120000", None)
            .await;

        assert_eq!(classification.model_id, "huggingface-spc-bert-base-cased");
        assert_eq!(classification.source, Some(ModelSource::Sagemaker));
        assert!(matches!(classification.task, Some(Task::Catalog(_))));
        assert!(hub.searches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hub_failures_are_soft() {
        let hub = FakeHub {
            fail: true,
            ..Default::default()
        };

        let classification = Classifier::new(&hub)
            .classify("bert--base-uncased-202401011200", None)
            .await;

        assert_eq!(classification.model_id, "bert/base-uncased");
        assert_eq!(classification.task, None);
    }

    #[tokio::test]
    async fn test_unknown_pipeline_tag_leaves_task_undetermined() {
        let hub = FakeHub::with_models(&[("acme/robot", "robotics")]);

        let classification = Classifier::new(&hub)
            .classify("acme--robot-20240101120000", None)
            .await;

        assert_eq!(classification.model_id, "acme/robot");
        assert_eq!(classification.task, None);
        assert_eq!(classification.task_label.as_deref(), Some("robotics"));
    }
}
