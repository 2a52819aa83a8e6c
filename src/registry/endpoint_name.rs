//! Endpoint names double as registry keys and as the only information the
//! classifier has about an endpoint without a record. Generated names keep
//! enough of the model id to be recognisable:
//!
//! ```text
//! <endpoint name> := [ "custom-" ] <sanitized model id> "-" <timestamp>
//! ```
//!
//! where the sanitized model id has `/` escaped as `--` and the timestamp is
//! `YYYYMMDDHHMMSS` in UTC.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::ModelSource;

pub(crate) const MAX_LEN: usize = 63;
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
pub(crate) const PATH_DELIMITER: &str = "--";
pub(crate) const CUSTOM_PREFIX: &str = "custom-";

#[derive(Error, Debug, PartialEq)]
pub(crate) enum Error {
    #[error("endpoint name is empty")]
    Empty,
    #[error("endpoint name \"{0}\" is longer than 63 characters")]
    TooLong(String),
    #[error("endpoint name \"{0}\" may only contain alphanumeric characters and hyphens")]
    InvalidCharacter(String),
    #[error("endpoint name \"{0}\" must start and end with an alphanumeric character")]
    InvalidBoundary(String),
}

pub(crate) fn validate(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::Empty);
    }

    if name.len() > MAX_LEN {
        return Err(Error::TooLong(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::InvalidCharacter(name.to_string()));
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(Error::InvalidBoundary(name.to_string()));
    }

    Ok(())
}

/// Escapes a model id into the alphabet of endpoint names.
fn sanitize(model_id: &str) -> String {
    model_id
        .replace('/', PATH_DELIMITER)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

/// Returns the endpoint name for a new deployment of `model_id`. A name
/// requested by the operator is used as-is once validated. Otherwise the name
/// is derived from the model id and `now`, so repeated deployments of the
/// same model receive distinct names.
pub(crate) fn unique_endpoint_name(
    model_id: &str,
    source: ModelSource,
    requested: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, Error> {
    if let Some(requested) = requested {
        validate(requested)?;

        return Ok(requested.to_string());
    }

    let timestamp = now.format(TIMESTAMP_FORMAT).to_string();

    let mut base = sanitize(model_id);

    if source == ModelSource::Custom {
        base.insert_str(0, CUSTOM_PREFIX);
    }

    // Room for the hyphen and the timestamp
    let budget = MAX_LEN - timestamp.len() - 1;

    // Sanitized names are ASCII, byte truncation is safe
    base.truncate(budget);

    let base = base.trim_end_matches('-');

    let base = if base.is_empty() { "model" } else { base };

    let name = format!("{}-{}", base, timestamp);

    validate(&name)?;

    Ok(name)
}
