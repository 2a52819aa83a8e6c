//! The container environment under which a recorded model is deployed.

use std::collections::BTreeMap;

use crate::config::HUB_TOKEN_ENV_VAR;
use crate::registry::{DeploymentRecord, ModelRecord, ModelSource};

pub(crate) const MODEL_ID_VAR: &str = "HF_MODEL_ID";
pub(crate) const TASK_VAR: &str = "HF_TASK";
pub(crate) const NUM_GPUS_VAR: &str = "SM_NUM_GPUS";
pub(crate) const QUANTIZE_VAR: &str = "HF_MODEL_QUANTIZE";

/// Returns the environment variables passed to the inference container of
/// `model`. Catalog containers are configured by the catalog itself and get
/// none. Custom models are loaded from their location rather than the hub,
/// so no model id is set for them.
pub(crate) fn deploy_environment(
    deployment: &DeploymentRecord,
    model: &ModelRecord,
    hub_token: Option<&str>,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();

    if model.source == ModelSource::Sagemaker {
        return env;
    }

    if model.source == ModelSource::HuggingFace {
        env.insert(MODEL_ID_VAR.to_string(), model.id.clone());
    }

    if let Some(task) = &model.task {
        env.insert(TASK_VAR.to_string(), task.clone());
    }

    if let Some(token) = hub_token {
        env.insert(HUB_TOKEN_ENV_VAR.to_string(), token.to_string());
    }

    if let Some(num_gpus) = deployment.num_gpus {
        env.insert(NUM_GPUS_VAR.to_string(), num_gpus.to_string());
    }

    if let Some(quantization) = &deployment.quantization {
        env.insert(QUANTIZE_VAR.to_string(), quantization.clone());
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_model_environment() {
        let mut deployment = DeploymentRecord::new("tiiuae--falcon-7b-1", "ml.g5.12xlarge");
        deployment.num_gpus = Some(4);
        deployment.quantization = Some("bitsandbytes".to_string());

        let mut model = ModelRecord::new("tiiuae/falcon-7b", ModelSource::HuggingFace);
        model.task = Some("text-generation".to_string());

        let env = deploy_environment(&deployment, &model, Some("hf_secret"));

        let expected: BTreeMap<String, String> = [
            ("HF_MODEL_ID", "tiiuae/falcon-7b"),
            ("HF_MODEL_QUANTIZE", "bitsandbytes"),
            ("HF_TASK", "text-generation"),
            ("HUGGING_FACE_HUB_TOKEN", "hf_secret"),
            ("SM_NUM_GPUS", "4"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(env, expected);
    }

    #[test]
    fn test_optional_variables_are_omitted() {
        let deployment = DeploymentRecord::new("gpt2-1", "ml.m5.xlarge");
        let model = ModelRecord::new("gpt2", ModelSource::HuggingFace);

        let env = deploy_environment(&deployment, &model, None);

        assert_eq!(env.len(), 1);
        assert_eq!(env.get(MODEL_ID_VAR).map(String::as_str), Some("gpt2"));
    }

    #[test]
    fn test_custom_models_have_no_model_id() {
        let deployment = DeploymentRecord::new("custom-acme--sentiment-1", "ml.m5.xlarge");

        let mut model = ModelRecord::new("acme/sentiment", ModelSource::Custom);
        model.location = Some("s3://models/acme/sentiment.tar.gz".to_string());
        model.task = Some("text-classification".to_string());

        let env = deploy_environment(&deployment, &model, None);

        assert!(!env.contains_key(MODEL_ID_VAR));
        assert_eq!(
            env.get(TASK_VAR).map(String::as_str),
            Some("text-classification")
        );
    }

    #[test]
    fn test_catalog_models_have_no_environment() {
        let mut deployment = DeploymentRecord::new("huggingface-tc-bert-1", "ml.m5.xlarge");
        deployment.num_gpus = Some(1);

        let model = ModelRecord::new("huggingface-tc-bert", ModelSource::Sagemaker);

        assert!(deploy_environment(&deployment, &model, Some("hf_secret")).is_empty());
    }
}
