use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::tasks::Task;

/// Where the weights or definition of a model originate.
///
/// The `to_string` and `FromStr` are part of the CLI and the on-disk record
/// format and should remain stable.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ModelSource {
    /// A model hub repository, e.g. `google-bert/bert-base-uncased`.
    HuggingFace,
    /// A model catalog id, e.g. `huggingface-tc-bert-base-cased`.
    Sagemaker,
    /// Weights supplied by the operator, see [`ModelRecord::location`].
    Custom,
}

/// The cloud backend a model is deployed to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Destination {
    #[default]
    Aws,
}

#[derive(Error, Debug, PartialEq)]
pub(crate) enum RecordError {
    #[error("custom model \"{0}\" has no location")]
    MissingLocation(String),
    #[error("\"{task}\" is not a {model_source} task")]
    UnknownTask {
        task: String,
        model_source: ModelSource,
    },
    #[error("deployment \"{0}\" does not list any models")]
    NoModels(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct ModelRecord {
    /// The identifier of the model as known to its source.
    pub id: String,
    pub source: ModelSource,
    /// The inference task, set when the model is deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// A local path or remote URI. Only meaningful for custom models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Default inference parameters, used when a query supplies none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predict: Option<BTreeMap<String, String>>,
}

impl ModelRecord {
    pub(crate) fn new(id: &str, source: ModelSource) -> ModelRecord {
        ModelRecord {
            id: id.to_string(),
            source,
            task: None,
            version: None,
            location: None,
            predict: None,
        }
    }

    /// The stored task, interpreted in the vocabulary of the model's source.
    /// Returns `None` if no task was stored or the label is unknown.
    pub(crate) fn parsed_task(&self) -> Option<Task> {
        self.task
            .as_deref()
            .and_then(|label| Task::parse(self.source, label))
    }

    pub(crate) fn validate(&self) -> Result<(), RecordError> {
        if self.source == ModelSource::Custom && self.location.is_none() {
            return Err(RecordError::MissingLocation(self.id.clone()));
        }

        if let Some(task) = &self.task {
            if self.parsed_task().is_none() {
                return Err(RecordError::UnknownTask {
                    task: task.clone(),
                    model_source: self.source,
                });
            }
        }

        Ok(())
    }
}

fn default_instance_count() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct DeploymentRecord {
    #[serde(default)]
    pub destination: Destination,
    pub instance_type: String,
    pub endpoint_name: String,
    #[serde(default = "default_instance_count")]
    pub instance_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_gpus: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,
}

impl DeploymentRecord {
    pub(crate) fn new(endpoint_name: &str, instance_type: &str) -> DeploymentRecord {
        DeploymentRecord {
            destination: Destination::Aws,
            instance_type: instance_type.to_string(),
            endpoint_name: endpoint_name.to_string(),
            instance_count: default_instance_count(),
            num_gpus: None,
            quantization: None,
        }
    }
}

/// A deployment and the models it serves. This is the unit stored per
/// endpoint in the registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct ModelDeployment {
    pub deployment: DeploymentRecord,
    pub models: Vec<ModelRecord>,
}

impl ModelDeployment {
    pub(crate) fn new(deployment: DeploymentRecord, model: ModelRecord) -> ModelDeployment {
        ModelDeployment {
            deployment,
            models: vec![model],
        }
    }

    pub(crate) fn endpoint_name(&self) -> &str {
        &self.deployment.endpoint_name
    }

    /// The model consulted by classification and dispatch.
    pub(crate) fn primary_model(&self) -> Option<&ModelRecord> {
        self.models.first()
    }

    pub(crate) fn serves_model(&self, model_id: &str) -> bool {
        self.models.iter().any(|m| m.id == model_id)
    }

    pub(crate) fn validate(&self) -> Result<(), RecordError> {
        if self.models.is_empty() {
            return Err(RecordError::NoModels(self.deployment.endpoint_name.clone()));
        }

        for model in &self.models {
            model.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::HubTask;
    use std::str::FromStr;

    #[test]
    fn test_custom_model_requires_location() {
        let mut model = ModelRecord::new("my-model", ModelSource::Custom);

        assert_eq!(
            model.validate(),
            Err(RecordError::MissingLocation("my-model".to_string()))
        );

        model.location = Some("s3://bucket/models/my-model".to_string());

        assert_eq!(model.validate(), Ok(()));
    }

    #[test]
    fn test_task_must_match_source_vocabulary() {
        let mut model = ModelRecord::new("google-bert/bert-base-uncased", ModelSource::HuggingFace);
        model.task = Some("fill-mask".to_string());

        assert_eq!(model.validate(), Ok(()));
        assert_eq!(model.parsed_task(), Some(Task::Hub(HubTask::FillMask)));

        model.task = Some("fillmask".to_string());

        assert!(matches!(
            model.validate(),
            Err(RecordError::UnknownTask { .. })
        ));
        assert_eq!(model.parsed_task(), None);
    }

    #[test]
    fn test_deployment_without_models_is_invalid() {
        let deployment = ModelDeployment {
            deployment: DeploymentRecord::new("endpoint", "ml.m5.xlarge"),
            models: Vec::new(),
        };

        assert!(matches!(deployment.validate(), Err(RecordError::NoModels(_))));
        assert!(deployment.primary_model().is_none());
    }

    #[test]
    fn test_source_names_are_stable() {
        assert_eq!(ModelSource::HuggingFace.to_string(), "huggingface");
        assert_eq!(
            ModelSource::from_str("sagemaker").unwrap(),
            ModelSource::Sagemaker
        );
        assert!(ModelSource::from_str("azure").is_err());
    }
}
