//! Client for the model hub's metadata API.
//!
//! The hub is consulted for two things: the pipeline tag (task) of a model,
//! which is recorded when a hub model is registered, and a fuzzy search over
//! model ids, which the classifier uses to recover a model from an endpoint
//! name when no record exists.

use async_trait::async_trait;
use reqwest::{Client, IntoUrl, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::apireq::{self, ReqwestError, Url};

/// The number of candidates requested from a search.
const SEARCH_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("invalid hub api base")]
    InvalidApiBase(#[source] reqwest::Error),

    #[error("invalid hub endpoint")]
    InvalidEndpoint(
        #[from]
        #[source]
        url::ParseError,
    ),

    #[error("a request to the hub failed")]
    RequestFailed(
        #[from]
        #[source]
        ReqwestError,
    ),

    #[error("model \"{0}\" was not found on the hub")]
    NotFound(String),

    #[error("the hub rejected the credentials: {0}")]
    Unauthorized(String),

    #[error("the hub returned status {0}: {1}")]
    UnexpectedStatus(StatusCode, String),
}

/// Metadata lookups against a model hub.
#[async_trait]
pub(crate) trait ModelHub: Send + Sync {
    /// Returns the pipeline tag declared by `model_id`, if any.
    async fn model_task(&self, model_id: &str) -> Result<Option<String>, Error>;

    /// Returns the ids of models matching `term`, optionally restricted to
    /// models published by `author`.
    async fn search(&self, term: &str, author: Option<&str>) -> Result<Vec<String>, Error>;
}

#[derive(Deserialize, Debug)]
struct TransformersInfo {
    #[serde(default)]
    pipeline_tag: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ModelInfo {
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default)]
    transformers_info: Option<TransformersInfo>,
}

impl ModelInfo {
    /// The transformers pipeline tag is more specific than the repository's
    /// tag and takes precedence.
    fn task(self) -> Option<String> {
        self.transformers_info
            .and_then(|info| info.pipeline_tag)
            .or(self.pipeline_tag)
    }
}

#[derive(Deserialize, Debug)]
struct SearchResult {
    #[serde(alias = "modelId")]
    id: String,
}

pub(crate) struct HubApi {
    api_base: Url,
    token: Option<String>,
    client: Client,
}

impl HubApi {
    pub(crate) fn new<U: IntoUrl>(
        api_base: U,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<HubApi, Error> {
        Ok(HubApi {
            api_base: api_base.into_url().map_err(Error::InvalidApiBase)?,
            token,
            client: apireq::client(timeout)?,
        })
    }

    /// Appends `segments` to the path of the api base, so that a hub
    /// mirrored under a path prefix keeps its prefix.
    fn api_url<'s, I>(&self, segments: I) -> Result<Url, Error>
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut url = self.api_base.clone();

        url.path_segments_mut()
            .map_err(|_| Error::InvalidEndpoint(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn model_url(&self, model_id: &str) -> Result<Url, Error> {
        self.api_url(["api", "models"].into_iter().chain(model_id.split('/')))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn check_status(res: reqwest::Response, model_id: &str) -> Result<reqwest::Response, Error> {
        let status = res.status();

        if status.is_success() {
            return Ok(res);
        }

        let message = apireq::error_message(res).await;

        match status {
            StatusCode::NOT_FOUND => Err(Error::NotFound(model_id.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized(message)),
            status => Err(Error::UnexpectedStatus(status, message)),
        }
    }
}

#[async_trait]
impl ModelHub for HubApi {
    async fn model_task(&self, model_id: &str) -> Result<Option<String>, Error> {
        let url = self.model_url(model_id)?;

        let res = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        let res = Self::check_status(res, model_id).await?;

        let info: ModelInfo = res
            .json()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Ok(info.task())
    }

    async fn search(&self, term: &str, author: Option<&str>) -> Result<Vec<String>, Error> {
        let url = self.api_url(["api", "models"])?;

        let limit = SEARCH_LIMIT.to_string();

        let mut query = vec![("search", term), ("limit", limit.as_str())];

        if let Some(author) = author {
            query.push(("author", author));
        }

        let res = self
            .authorized(self.client.get(url).query(&query))
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        let res = Self::check_status(res, term).await?;

        let results: Vec<SearchResult> = res
            .json()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Ok(results.into_iter().map(|r| r.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transformers_tag_takes_precedence() {
        let info: ModelInfo = serde_json::from_str(
            r#"{
                "id": "distilbert/distilbert-base-uncased-distilled-squad",
                "pipeline_tag": "text-classification",
                "transformers_info": { "pipeline_tag": "question-answering" }
            }"#,
        )
        .unwrap();

        assert_eq!(info.task().as_deref(), Some("question-answering"));
    }

    #[test]
    fn test_repository_tag_is_used_without_transformers_info() {
        let info: ModelInfo =
            serde_json::from_str(r#"{ "id": "gpt2", "pipeline_tag": "text-generation" }"#).unwrap();

        assert_eq!(info.task().as_deref(), Some("text-generation"));

        let info: ModelInfo = serde_json::from_str(r#"{ "id": "gpt2" }"#).unwrap();

        assert_eq!(info.task(), None);
    }

    #[test]
    fn test_search_results_accept_either_id_field() {
        let results: Vec<SearchResult> = serde_json::from_str(
            r#"[{ "id": "bert/base-uncased" }, { "modelId": "bert/base-cased" }]"#,
        )
        .unwrap();

        let ids: Vec<String> = results.into_iter().map(|r| r.id).collect();

        assert_eq!(ids, vec!["bert/base-uncased", "bert/base-cased"]);
    }

    #[test]
    fn test_urls_keep_the_base_path() {
        let api = HubApi::new("https://mirror.example.com/hf/", None, Duration::from_secs(1)).unwrap();

        assert_eq!(
            api.model_url("bert/base-uncased").unwrap().as_str(),
            "https://mirror.example.com/hf/api/models/bert/base-uncased"
        );

        let api = HubApi::new("https://huggingface.co", None, Duration::from_secs(1)).unwrap();

        assert_eq!(
            api.api_url(["api", "models"]).unwrap().as_str(),
            "https://huggingface.co/api/models"
        );
    }

    #[test]
    fn test_invalid_api_base() {
        let api = HubApi::new("not a url", None, Duration::from_secs(1));

        assert!(matches!(api, Err(Error::InvalidApiBase(_))));
    }
}
