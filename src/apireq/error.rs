//! Classifies transport failures reported by reqwest so that callers can
//! match on what went wrong without inspecting the underlying error.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// The request could not be built, e.g. because of an invalid header.
    Build,
    Connect,
    Timeout,
    Redirect,
    /// The response body could not be read or decoded.
    Body,
    Other,
}

impl ErrorKind {
    fn of(err: &reqwest::Error) -> ErrorKind {
        if err.is_builder() {
            ErrorKind::Build
        } else if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connect
        } else if err.is_redirect() {
            ErrorKind::Redirect
        } else if err.is_decode() || err.is_body() {
            ErrorKind::Body
        } else {
            ErrorKind::Other
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ErrorKind::Build => "could not build the request",
            ErrorKind::Connect => "could not connect",
            ErrorKind::Timeout => "the request timed out",
            ErrorKind::Redirect => "too many redirects",
            ErrorKind::Body => "could not read the response body",
            ErrorKind::Other => "the request failed",
        }
    }
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: reqwest::Error,
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        Error {
            kind: ErrorKind::of(&source),
            source,
        }
    }
}

impl Error {
    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.describe())?;

        if let Some(url) = self.source.url() {
            write!(f, " ({})", url)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refused_connection_names_the_url() {
        let err: Error = reqwest::Client::new()
            .get("http://127.0.0.1:9/health")
            .send()
            .await
            .unwrap_err()
            .into();

        assert_eq!(err.kind(), ErrorKind::Connect);
        assert_eq!(
            err.to_string(),
            "could not connect (http://127.0.0.1:9/health)"
        );
        assert!(err.source().is_some());
    }
}
