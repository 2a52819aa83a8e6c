//! Collection of auxiliary inputs which a query did not carry.

use std::io;
use thiserror::Error;

use crate::tasks::AuxiliaryField;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("the {0} was not provided and cannot be requested")]
    NonInteractive(AuxiliaryField),
    #[error("failed to read the {0}")]
    Read(AuxiliaryField, #[source] io::Error),
}

/// Asks for an input missing from a query.
pub(crate) trait AuxiliaryInput: Send + Sync {
    /// Returns the collected value, or `None` when the operator declined to
    /// provide one.
    fn collect(&self, field: AuxiliaryField) -> Result<Option<String>, Error>;
}

/// Refuses to collect anything. Used wherever nobody can be asked.
pub(crate) struct StrictInput;

impl AuxiliaryInput for StrictInput {
    fn collect(&self, field: AuxiliaryField) -> Result<Option<String>, Error> {
        Err(Error::NonInteractive(field))
    }
}
