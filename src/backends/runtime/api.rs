use bytes::Bytes;
use reqwest::{header, Client, IntoUrl};
use serde_json::Value;
use std::time::Duration;

use crate::apireq::{self, ReqwestError, Url};

#[derive(thiserror::Error, Debug)]
pub(super) enum Error {
    /// The API base is not a URL that can be used in a network request
    #[error("invalid api base")]
    InvalidApiBase(#[source] reqwest::Error),

    /// The API base cannot carry a path, e.g. `mailto:` URLs
    #[error("api base \"{0}\" cannot be used as a base url")]
    CannotBeABase(Url),

    /// Some issue with the request
    #[error("{}", .0)]
    RequestFailed(
        #[from]
        #[source]
        ReqwestError,
    ),

    /// The body of a successful response is not JSON.
    #[error("failed to decode the response body")]
    MalformedResponse(#[source] serde_json::Error),

    /// The payload does not match what the model expects.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    PermissionDenied(String),

    /// The endpoint does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The model could not process the input despite it being well formed.
    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("{0}")]
    RateLimit(String),

    /// The model container failed.
    #[error("{0}")]
    InternalError(String),

    #[error("{0}")]
    ApiOverloaded(String),

    #[error("status {0}: {1}")]
    UnknownStatus(u16, String),
}

impl Error {
    fn from_status(status: u16, message: String) -> Error {
        match status {
            400 => Error::BadRequest(message),
            401 => Error::Authentication(message),
            403 => Error::PermissionDenied(message),
            404 => Error::NotFound(message),
            422 | 424 => Error::UnprocessableEntity(message),
            429 => Error::RateLimit(message),
            500 => Error::InternalError(message),
            503 => Error::ApiOverloaded(message),
            status => Error::UnknownStatus(status, message),
        }
    }
}

pub(super) struct RuntimeApi {
    api_base: Url,
    api_key: Option<String>,
    accept: &'static str,
    client: Client,
}

impl RuntimeApi {
    pub(super) fn new<U: IntoUrl>(
        api_base: U,
        api_key: Option<String>,
        accept: &'static str,
        timeout: Duration,
    ) -> Result<RuntimeApi, Error> {
        let api_base = api_base.into_url().map_err(Error::InvalidApiBase)?;

        Ok(RuntimeApi {
            api_base,
            api_key,
            accept,
            client: apireq::client(timeout)?,
        })
    }

    /// `{api_base}/endpoints/{endpoint_name}/invocations`, with the name
    /// escaped as a single path segment.
    pub(super) fn invocation_url(&self, endpoint_name: &str) -> Result<Url, Error> {
        let mut url = self.api_base.clone();

        url.path_segments_mut()
            .map_err(|_| Error::CannotBeABase(self.api_base.clone()))?
            .pop_if_empty()
            .extend(&["endpoints", endpoint_name, "invocations"]);

        Ok(url)
    }

    pub(super) async fn invoke(
        &self,
        endpoint_name: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<Value, Error> {
        let url = self.invocation_url(endpoint_name)?;

        let mut req = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::ACCEPT, self.accept)
            .body(body);

        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }

        let res = req.send().await.map_err(|e| Error::RequestFailed(e.into()))?;

        let status = res.status();

        if !status.is_success() {
            let message = apireq::error_message(res).await;

            return Err(Error::from_status(status.as_u16(), message));
        }

        let body = res
            .bytes()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        serde_json::from_slice(&body).map_err(Error::MalformedResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(api_base: &str) -> RuntimeApi {
        RuntimeApi::new(api_base, None, "application/json", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_invocation_url() {
        let url = api("http://localhost:8080")
            .invocation_url("bert--base-uncased-20240101120000")
            .unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:8080/endpoints/bert--base-uncased-20240101120000/invocations"
        );
    }

    #[test]
    fn test_invocation_url_keeps_base_path() {
        let url = api("http://localhost:8080/runtime/").invocation_url("e").unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:8080/runtime/endpoints/e/invocations"
        );
    }

    #[test]
    fn test_endpoint_name_is_one_segment() {
        let url = api("http://localhost:8080").invocation_url("a/b").unwrap();

        assert_eq!(url.path(), "/endpoints/a%2Fb/invocations");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            Error::from_status(404, "no such endpoint".to_string()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            Error::from_status(424, "model error".to_string()),
            Error::UnprocessableEntity(_)
        ));
        assert!(matches!(
            Error::from_status(502, "bad gateway".to_string()),
            Error::UnknownStatus(502, _)
        ));
    }

    #[test]
    fn test_rejects_base_without_host() {
        let result = RuntimeApi::new(
            "mailto:ops@example.com",
            None,
            "application/json",
            Duration::from_secs(1),
        );

        assert!(matches!(result, Err(Error::InvalidApiBase(_))));
    }
}
