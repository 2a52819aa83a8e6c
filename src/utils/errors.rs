use crate::color::{self, MaybePaint};
use std::error::Error as StdError;

pub const DEFAULT_EXIT_CODE: i32 = 1;

pub(crate) fn error_internal(text: &str) {
    eprintln!(
        "{} {}",
        color::ERROR_INDICATOR.maybe_paint("error:"),
        color::MESSAGE_TEXT.maybe_paint(text)
    );
}

pub(crate) fn warn_internal(text: &str) {
    eprintln!(
        "{} {}",
        color::WARNING_INDICATOR.maybe_paint("warning:"),
        color::MESSAGE_TEXT.maybe_paint(text)
    );
}

/// Renders an error followed by each of its sources, one per line. Backend
/// failures are only actionable with the full chain, so the CLI prints
/// errors through this helper.
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();

    let mut source = err.source();

    while let Some(cause) = source {
        text.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }

    text
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::warn_internal(&formatted);
    })
}

#[macro_export]
macro_rules! die {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
        ::std::process::exit($crate::utils::errors::DEFAULT_EXIT_CODE);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("connection refused")]
    struct Inner;

    #[derive(Error, Debug)]
    #[error("invocation failed")]
    struct Outer(#[source] Inner);

    #[test]
    fn test_error_chain_includes_sources() {
        let err = Outer(Inner);

        assert_eq!(
            error_chain(&err),
            "invocation failed\n  caused by: connection refused"
        );
    }
}
