//! Routes queries to deployed endpoints.
//!
//! A query is plain text. Endpoints, however, expect a request shaped after
//! the task of the model they serve: question answering takes a
//! question/passage pair, zero-shot classification takes candidate labels,
//! text generation takes hyperparameters, and so on. The dispatcher
//! determines the task of the endpoint, encodes the query accordingly, asks
//! for any input the query lacks, and sends the request to the backend
//! serving the model.

mod input;
mod payload;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::backends::{self, BackendIdentifier, Backends};
use crate::classify::{Classification, Classifier};
use crate::hub::ModelHub;
use crate::hyperparameters::{self, QueryParameters};
use crate::registry::{self, ModelDeployment, ModelSource, RecordStore};
use crate::tasks::{AuxiliaryField, PayloadKind, Task};

pub(crate) use input::{AuxiliaryInput, Error as InputError, StrictInput};
pub(crate) use payload::{split_labels, Payload};

/// Describes how to invoke an endpoint with a hand-built request.
pub(crate) const INVOCATION_API_DOCS: &str =
    "https://docs.aws.amazon.com/sagemaker/latest/APIReference/API_runtime_InvokeEndpoint.html";

fn describe_task(task: &Option<String>) -> String {
    match task {
        Some(task) => format!("serves task \"{}\"", task),
        None => "serves an unknown task".to_string(),
    }
}

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to read the record of endpoint \"{0}\"")]
    Registry(String, #[source] registry::Error),

    #[error(
        "endpoint \"{endpoint}\" {}, which has no structured query support; \
         invoke it with a raw request instead, see {}",
        describe_task(.task),
        INVOCATION_API_DOCS
    )]
    UnsupportedTask {
        endpoint: String,
        task: Option<String>,
    },

    #[error("a {field} is required to query a {task} endpoint")]
    MissingInput { field: AuxiliaryField, task: Task },

    #[error("failed to collect input")]
    Input(#[source] InputError),

    #[error("failed to encode the request")]
    Encoding(#[source] serde_json::Error),

    #[error("failed to query endpoint \"{endpoint}\" through the {backend} backend")]
    Backend {
        endpoint: String,
        backend: BackendIdentifier,
        #[source]
        source: backends::Error,
    },
}

/// A query as accepted from a caller.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub(crate) struct Query {
    pub query: String,
    /// The passage, comparison sentence, or comma separated labels, depending
    /// on the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<QueryParameters>,
}

impl Query {
    pub(crate) fn new(query: &str) -> Query {
        Query {
            query: query.to_string(),
            ..Default::default()
        }
    }
}

/// Catalog models are served by the catalog backend, as is any model whose
/// task is labelled in the catalog vocabulary.
pub(crate) fn route(source: Option<ModelSource>, task: &Task) -> BackendIdentifier {
    if source == Some(ModelSource::Sagemaker) || task.in_catalog_vocabulary() {
        BackendIdentifier::Catalog
    } else {
        BackendIdentifier::Hub
    }
}

pub(crate) struct Dispatcher<'d> {
    store: &'d RecordStore,
    hub: &'d dyn ModelHub,
    backends: &'d Backends,
    input: &'d dyn AuxiliaryInput,
}

impl<'d> Dispatcher<'d> {
    pub(crate) fn new(
        store: &'d RecordStore,
        hub: &'d dyn ModelHub,
        backends: &'d Backends,
        input: &'d dyn AuxiliaryInput,
    ) -> Dispatcher<'d> {
        Dispatcher {
            store,
            hub,
            backends,
            input,
        }
    }

    /// Sends `query` to `endpoint` and returns the endpoint's response as is.
    pub(crate) async fn dispatch(&self, endpoint: &str, query: &Query) -> Result<Value, Error> {
        let deployment = self
            .store
            .get_by_endpoint(endpoint)
            .map_err(|e| Error::Registry(endpoint.to_string(), e))?;

        let classification = Classifier::new(self.hub)
            .classify(endpoint, deployment.as_ref())
            .await;

        let (task, kind) = supported_task(endpoint, &classification)?;

        let payload = self.build_payload(task, kind, deployment.as_ref(), query)?;

        let backend = self.backends.get(route(classification.source, &task));

        backend
            .invoke(endpoint, &payload)
            .await
            .map_err(|source| Error::Backend {
                endpoint: endpoint.to_string(),
                backend: backend.id(),
                source,
            })
    }

    /// Encodes `query` for an endpoint performing `task`.
    pub(crate) fn build_payload(
        &self,
        task: Task,
        kind: PayloadKind,
        deployment: Option<&ModelDeployment>,
        query: &Query,
    ) -> Result<Payload, Error> {
        match (kind, kind.auxiliary_field()) {
            (PayloadKind::TextGeneration, _) => {
                let parameters = hyperparameters::resolve(deployment, query.parameters.as_ref());

                Payload::generation(&query.query, &parameters).map_err(Error::Encoding)
            }
            (PayloadKind::ZeroShot, Some(field)) => {
                let labels = split_labels(&self.auxiliary(field, task, query)?);

                if labels.is_empty() {
                    return Err(Error::MissingInput { field, task });
                }

                Payload::zero_shot(&query.query, &labels).map_err(Error::Encoding)
            }
            (_, Some(field)) => {
                let second = self.auxiliary(field, task, query)?;

                Payload::pair(&query.query, &second).map_err(Error::Encoding)
            }
            (_, None) => Ok(Payload::text(&query.query)),
        }
    }

    /// The context carried by the query, or else whatever the collector
    /// provides. Blank values count as missing.
    fn auxiliary(&self, field: AuxiliaryField, task: Task, query: &Query) -> Result<String, Error> {
        if let Some(context) = &query.context {
            if !context.trim().is_empty() {
                return Ok(context.clone());
            }
        }

        match self.input.collect(field) {
            Ok(Some(value)) if !value.trim().is_empty() => Ok(value),
            Ok(_) | Err(InputError::NonInteractive(_)) => Err(Error::MissingInput { field, task }),
            Err(err) => Err(Error::Input(err)),
        }
    }
}

fn supported_task(
    endpoint: &str,
    classification: &Classification,
) -> Result<(Task, PayloadKind), Error> {
    let supported = classification
        .task
        .and_then(|task| task.payload_kind().map(|kind| (task, kind)));

    supported.ok_or_else(|| Error::UnsupportedTask {
        endpoint: endpoint.to_string(),
        task: classification
            .task
            .map(|task| task.to_string())
            .or_else(|| classification.task_label.clone()),
    })
}
