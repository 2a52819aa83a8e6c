//! A utility module with helpers for making and parsing API requests.

mod error;

use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

pub(crate) use error::Error as ReqwestError;
pub(crate) use error::ErrorKind as ReqwestErrorKind;
pub(crate) use reqwest::Url;

/// Builds a client whose requests fail after `timeout`.
pub(crate) fn client(timeout: Duration) -> Result<Client, ReqwestError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// The shapes in which APIs report errors in a response body.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ErrorBody {
    Message { message: String },
    Error { error: String },
}

/// Extracts a human readable message from an unsuccessful response. Bodies
/// which do not follow a known error shape are returned verbatim.
pub(crate) async fn error_message(res: Response) -> String {
    let status = res.status();

    let body = match res.text().await {
        Ok(body) => body,
        Err(_) => return status.to_string(),
    };

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody::Message { message }) => message,
        Ok(ErrorBody::Error { error }) => error,
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body,
    }
}
