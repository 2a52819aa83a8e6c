//! Inference backends which serve deployed endpoints.
//!
//! Every endpoint is invoked through an [`InferenceBackend`]. Two backends
//! exist: the catalog backend serves endpoints of catalog models, and the hub
//! backend serves endpoints of hub and custom models. They share a wire
//! protocol but negotiate different response formats, so a query must be
//! routed to the backend matching the model it targets.
//!
//! ## Error Handling
//!
//! The runtime API reports failures through HTTP statuses. These are
//! collapsed into an [`ErrorKind`] so that callers can react to the category
//! of a failure without knowing which backend raised it. The original error
//! is kept as the source.

mod runtime;

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;

use crate::apireq::{ReqwestError, ReqwestErrorKind};
use crate::config;
use crate::dispatch::Payload;

pub(crate) use runtime::RuntimeBackend;

/// General categories of errors returned by an [`InferenceBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Failed to connect to the backend.
    Connection,
    /// A request timed out.
    TimedOut,
    /// Credentials were missing or rejected.
    Authentication,
    /// A rate limit was reached.
    ExcessUsage,
    /// The backend is overloaded. A retry may succeed later.
    ApiOverloaded,
    /// The endpoint does not exist.
    NotFound,
    /// The payload was rejected by the endpoint. This usually means the
    /// payload does not match the model's task.
    BadRequest,
    /// The model failed while serving the request.
    InternalError,
    /// The response was not valid JSON.
    UnexpectedResponse,
    /// An error that does not fit into any of the other categories.
    UnspecifiedError,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: Box<dyn StdError + Send + Sync>,
}

impl Error {
    pub(crate) fn from_source(kind: ErrorKind, source: Box<dyn StdError + Send + Sync>) -> Error {
        Error { kind, source }
    }

    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn message(&self) -> &'static str {
        match self.kind {
            ErrorKind::Connection => "failed to connect to the inference backend",
            ErrorKind::TimedOut => "request timed out",
            ErrorKind::Authentication => "authentication failed or not provided",
            ErrorKind::ExcessUsage => "rate limit exceeded",
            ErrorKind::ApiOverloaded => "the inference backend is overloaded",
            ErrorKind::NotFound => "the endpoint was not found",
            ErrorKind::BadRequest => "the endpoint rejected the request",
            ErrorKind::InternalError => "the model failed to serve the request",
            ErrorKind::UnexpectedResponse => "the endpoint response was unexpected or malformed",
            ErrorKind::UnspecifiedError => "an unspecified error occurred",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}

impl From<ReqwestError> for Error {
    fn from(value: ReqwestError) -> Self {
        let kind = match value.kind() {
            ReqwestErrorKind::Connect => ErrorKind::Connection,
            ReqwestErrorKind::Timeout => ErrorKind::TimedOut,
            ReqwestErrorKind::Body | ReqwestErrorKind::Redirect => ErrorKind::UnexpectedResponse,
            ReqwestErrorKind::Build => ErrorKind::BadRequest,
            ReqwestErrorKind::Other => ErrorKind::UnspecifiedError,
        };

        Error::from_source(kind, Box::new(value))
    }
}

/// Identifies a backend. The `to_string` form appears in CLI output and
/// should remain stable.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum BackendIdentifier {
    Catalog,
    Hub,
}

#[async_trait]
pub(crate) trait InferenceBackend: Send + Sync {
    fn id(&self) -> BackendIdentifier;

    /// Sends `payload` to `endpoint_name` and returns the decoded response.
    async fn invoke(&self, endpoint_name: &str, payload: &Payload) -> Result<Value, Error>;
}

/// The pair of backends a query can be routed to.
pub(crate) struct Backends {
    catalog: Box<dyn InferenceBackend>,
    hub: Box<dyn InferenceBackend>,
}

impl Backends {
    pub(crate) fn new(
        catalog: Box<dyn InferenceBackend>,
        hub: Box<dyn InferenceBackend>,
    ) -> Backends {
        Backends { catalog, hub }
    }

    pub(crate) fn from_config(config: &config::Backends) -> Result<Backends, Error> {
        Ok(Backends::new(
            Box::new(RuntimeBackend::catalog(&config.catalog)?),
            Box::new(RuntimeBackend::hub(&config.hub)?),
        ))
    }

    pub(crate) fn get(&self, id: BackendIdentifier) -> &dyn InferenceBackend {
        match id {
            BackendIdentifier::Catalog => self.catalog.as_ref(),
            BackendIdentifier::Hub => self.hub.as_ref(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    pub(crate) type Calls = Arc<Mutex<Vec<(String, Payload)>>>;

    /// A backend which records every invocation and answers with a fixed
    /// response. The calls stay observable through a clone of `calls` after
    /// the backend is boxed.
    pub(crate) struct RecordingBackend {
        id: BackendIdentifier,
        response: Value,
        pub calls: Calls,
    }

    impl RecordingBackend {
        pub(crate) fn new(id: BackendIdentifier, response: Value) -> RecordingBackend {
            RecordingBackend {
                id,
                response,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl InferenceBackend for RecordingBackend {
        fn id(&self) -> BackendIdentifier {
            self.id
        }

        async fn invoke(&self, endpoint_name: &str, payload: &Payload) -> Result<Value, Error> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint_name.to_string(), payload.clone()));

            Ok(self.response.clone())
        }
    }
}
