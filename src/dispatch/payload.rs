//! Request bodies sent to inference endpoints.

use bytes::Bytes;
use serde::Serialize;

use crate::hyperparameters::Hyperparameters;

/// The content types understood by the inference containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::AsRefStr)]
pub(crate) enum ContentType {
    #[strum(to_string = "application/x-text")]
    PlainText,
    #[strum(to_string = "application/list-text")]
    ListText,
    #[strum(to_string = "application/json")]
    Json,
}

/// An encoded request body together with its content type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Payload {
    pub body: Bytes,
    pub content_type: ContentType,
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    sequence: &'a str,
    candidate_labels: &'a [String],
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: &'a Hyperparameters,
}

impl Payload {
    /// The query as raw UTF-8 text.
    pub(crate) fn text(query: &str) -> Payload {
        Payload {
            body: Bytes::copy_from_slice(query.as_bytes()),
            content_type: ContentType::PlainText,
        }
    }

    /// `[first, second]`, used for question/passage and sentence pairs.
    pub(crate) fn pair(first: &str, second: &str) -> Result<Payload, serde_json::Error> {
        Ok(Payload {
            body: serde_json::to_vec(&[first, second])?.into(),
            content_type: ContentType::ListText,
        })
    }

    pub(crate) fn zero_shot(
        sequence: &str,
        candidate_labels: &[String],
    ) -> Result<Payload, serde_json::Error> {
        let request = ZeroShotRequest {
            sequence,
            candidate_labels,
        };

        Ok(Payload {
            body: serde_json::to_vec(&request)?.into(),
            content_type: ContentType::Json,
        })
    }

    pub(crate) fn generation(
        inputs: &str,
        parameters: &Hyperparameters,
    ) -> Result<Payload, serde_json::Error> {
        let request = GenerationRequest { inputs, parameters };

        Ok(Payload {
            body: serde_json::to_vec(&request)?.into(),
            content_type: ContentType::Json,
        })
    }
}

/// Splits comma separated labels, dropping blank entries.
pub(crate) fn split_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}
