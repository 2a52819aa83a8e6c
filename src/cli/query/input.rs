use reedline::{Reedline, Signal};

use super::prompt::InputPrompt;
use crate::dispatch::{AuxiliaryInput, InputError};
use crate::tasks::AuxiliaryField;

/// Asks the operator for missing inputs on the terminal. Each request opens
/// a fresh line editor, so nothing typed for one endpoint leaks into the
/// history of another.
pub(crate) struct TerminalInput {
    endpoint: String,
}

impl TerminalInput {
    pub(crate) fn new(endpoint: &str) -> TerminalInput {
        TerminalInput {
            endpoint: endpoint.to_string(),
        }
    }

    /// Reads one line. Interrupting the editor yields `None`.
    pub(crate) fn read_line(&self, label: &str) -> std::io::Result<Option<String>> {
        let mut editor = Reedline::create();

        let prompt = InputPrompt::new(&self.endpoint, label);

        match editor.read_line(&prompt)? {
            Signal::Success(line) => Ok(Some(line)),
            _ => Ok(None),
        }
    }
}

impl AuxiliaryInput for TerminalInput {
    fn collect(&self, field: AuxiliaryField) -> Result<Option<String>, InputError> {
        eprintln!("{}", field.question());

        self.read_line(&field.to_string())
            .map_err(|err| InputError::Read(field, err))
    }
}
