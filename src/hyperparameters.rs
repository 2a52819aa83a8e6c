//! Generation hyperparameters for text-generation endpoints.
//!
//! Parameters come from exactly one of three tiers, in order of precedence:
//! the parameters sent with the query, the `predict` defaults stored with the
//! model at deploy time, and finally built-in defaults. The first non-empty
//! tier is used as a whole. Tiers are never merged, so a query setting only
//! `temperature` sends only `temperature`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::registry::ModelDeployment;

pub(crate) type Hyperparameters = Map<String, Value>;

pub(crate) const DEFAULT_MAX_NEW_TOKENS: u64 = 250;
pub(crate) const DEFAULT_TOP_P: f64 = 0.9;
pub(crate) const DEFAULT_TEMPERATURE: f64 = 0.9;

/// Parameters which may accompany a query.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct QueryParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl QueryParameters {
    fn to_hyperparameters(&self) -> Hyperparameters {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

pub(crate) fn default_hyperparameters() -> Hyperparameters {
    let mut parameters = Map::new();

    parameters.insert("max_new_tokens".to_string(), DEFAULT_MAX_NEW_TOKENS.into());
    parameters.insert("top_p".to_string(), DEFAULT_TOP_P.into());
    parameters.insert("temperature".to_string(), DEFAULT_TEMPERATURE.into());

    parameters
}

/// Interprets a textual parameter value. Integers and floats become JSON
/// numbers, `true`/`false` become booleans, anything else stays a string.
pub(crate) fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();

    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }

    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = Number::from_f64(float) {
            return Value::Number(number);
        }
    }

    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn stored_hyperparameters(predict: &BTreeMap<String, String>) -> Hyperparameters {
    predict
        .iter()
        .map(|(key, value)| (key.clone(), parse_value(value)))
        .collect()
}

/// Resolves the hyperparameters for a generation request against
/// `deployment`.
pub(crate) fn resolve(
    deployment: Option<&ModelDeployment>,
    request: Option<&QueryParameters>,
) -> Hyperparameters {
    if let Some(request) = request {
        let parameters = request.to_hyperparameters();

        if !parameters.is_empty() {
            return parameters;
        }
    }

    let stored = deployment
        .and_then(|d| d.primary_model())
        .and_then(|m| m.predict.as_ref())
        .map(stored_hyperparameters);

    match stored {
        Some(parameters) if !parameters.is_empty() => parameters,
        _ => default_hyperparameters(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DeploymentRecord, ModelRecord, ModelSource};
    use serde_json::json;

    fn deployment_with_predict(predict: Option<&[(&str, &str)]>) -> ModelDeployment {
        let mut model = ModelRecord::new("gpt2", ModelSource::HuggingFace);

        model.predict = predict.map(|pairs| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        });

        ModelDeployment::new(DeploymentRecord::new("gpt2-endpoint", "ml.m5.xlarge"), model)
    }

    #[test]
    fn test_request_parameters_replace_stored_defaults() {
        let deployment =
            deployment_with_predict(Some(&[("temperature", "0.5"), ("top_p", "0.8")]));

        let request = QueryParameters {
            temperature: Some(0.2),
            ..Default::default()
        };

        let resolved = resolve(Some(&deployment), Some(&request));

        assert_eq!(Value::Object(resolved), json!({ "temperature": 0.2 }));
    }

    #[test]
    fn test_stored_defaults_replace_builtin_defaults() {
        let deployment =
            deployment_with_predict(Some(&[("temperature", "0.5"), ("max_new_tokens", "64")]));

        let resolved = resolve(Some(&deployment), None);

        assert_eq!(
            Value::Object(resolved),
            json!({ "temperature": 0.5, "max_new_tokens": 64 })
        );
    }

    #[test]
    fn test_empty_tiers_are_skipped() {
        let deployment = deployment_with_predict(Some(&[]));

        let resolved = resolve(Some(&deployment), Some(&QueryParameters::default()));

        assert_eq!(resolved, default_hyperparameters());
        assert_eq!(
            Value::Object(resolve(None, None)),
            json!({ "max_new_tokens": 250, "top_p": 0.9, "temperature": 0.9 })
        );
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("250"), json!(250));
        assert_eq!(parse_value(" 0.9 "), json!(0.9));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("greedy"), json!("greedy"));
    }

    #[test]
    fn test_unknown_request_parameters_are_rejected() {
        let result = serde_json::from_value::<QueryParameters>(json!({ "temprature": 0.2 }));

        assert!(result.is_err());
    }
}
