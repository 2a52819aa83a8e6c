use async_trait::async_trait;
use serde_json::Value;

use super::api;
use crate::backends::{BackendIdentifier, Error, ErrorKind, InferenceBackend};
use crate::config;
use crate::dispatch::Payload;

/// Catalog containers return a verbose JSON document which includes the
/// scores of every label.
const CATALOG_ACCEPT: &str = "application/json;verbose";
const HUB_ACCEPT: &str = "application/json";

impl From<api::Error> for Error {
    fn from(value: api::Error) -> Self {
        let kind = match &value {
            api::Error::Authentication(_) | api::Error::PermissionDenied(_) => {
                ErrorKind::Authentication
            }
            api::Error::BadRequest(_)
            | api::Error::InvalidApiBase(_)
            | api::Error::CannotBeABase(_)
            | api::Error::UnprocessableEntity(_) => ErrorKind::BadRequest,
            api::Error::InternalError(_) => ErrorKind::InternalError,
            api::Error::NotFound(_) => ErrorKind::NotFound,
            api::Error::RateLimit(_) => ErrorKind::ExcessUsage,
            api::Error::ApiOverloaded(_) => ErrorKind::ApiOverloaded,
            api::Error::MalformedResponse(_) => ErrorKind::UnexpectedResponse,
            api::Error::UnknownStatus(..) => ErrorKind::UnspecifiedError,
            api::Error::RequestFailed(_) => ErrorKind::UnspecifiedError,
        };

        match value {
            api::Error::RequestFailed(err) => err.into(),
            value => Error::from_source(kind, Box::new(value)),
        }
    }
}

/// A backend reached over the runtime's HTTP invocation API.
pub(crate) struct RuntimeBackend {
    id: BackendIdentifier,
    api: api::RuntimeApi,
}

impl RuntimeBackend {
    fn new(
        id: BackendIdentifier,
        config: &config::Backend,
        accept: &'static str,
    ) -> Result<RuntimeBackend, Error> {
        let api = api::RuntimeApi::new(
            config.api_base(),
            config.api_key.clone(),
            accept,
            config.timeout(),
        )?;

        Ok(RuntimeBackend { id, api })
    }

    pub(crate) fn catalog(config: &config::Backend) -> Result<RuntimeBackend, Error> {
        Self::new(BackendIdentifier::Catalog, config, CATALOG_ACCEPT)
    }

    pub(crate) fn hub(config: &config::Backend) -> Result<RuntimeBackend, Error> {
        Self::new(BackendIdentifier::Hub, config, HUB_ACCEPT)
    }
}

#[async_trait]
impl InferenceBackend for RuntimeBackend {
    fn id(&self) -> BackendIdentifier {
        self.id
    }

    async fn invoke(&self, endpoint_name: &str, payload: &Payload) -> Result<Value, Error> {
        let response = self
            .api
            .invoke(
                endpoint_name,
                payload.body.clone(),
                payload.content_type.as_ref(),
            )
            .await?;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_backends_from_default_config() {
        let config = config::Backend::default();

        assert_eq!(
            RuntimeBackend::catalog(&config).unwrap().id(),
            BackendIdentifier::Catalog
        );
        assert_eq!(
            RuntimeBackend::hub(&config).unwrap().id(),
            BackendIdentifier::Hub
        );
    }

    #[test]
    fn test_invalid_api_base_is_a_bad_request() {
        let config = config::Backend {
            api_base: Some("not a url".to_string()),
            ..Default::default()
        };

        let err = match RuntimeBackend::hub(&config) {
            Err(err) => err,
            Ok(_) => panic!("expected an invalid api base to be rejected"),
        };

        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(err.source().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_backend_reports_connection_failure() {
        let config = config::Backend {
            api_base: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        };

        let backend = RuntimeBackend::catalog(&config).unwrap();

        let err = backend
            .invoke("some-endpoint", &Payload::text("hello"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
