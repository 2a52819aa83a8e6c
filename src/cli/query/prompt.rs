use reedline::{self, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, PromptViMode};
use std::borrow::Cow;

use crate::color::{self, MaybePaint};

const VI_NORMAL_MARKER: &str = "[=] ";
const MULTILINE_PROMPT: &str = "::: ";

/// Asks for a single input on behalf of an endpoint, e.g.
/// `[bert--base-uncased] context: `.
pub(crate) struct InputPrompt {
    endpoint: String,
    indicator: String,
    vi_normal_indicator: String,
    multiline_indicator: String,
}

impl InputPrompt {
    pub(crate) fn new(endpoint: &str, label: &str) -> InputPrompt {
        let indicator = format!("{}: ", label);

        InputPrompt {
            endpoint: color::ENDPOINT
                .maybe_paint(format!("[{}] ", endpoint))
                .to_string(),
            vi_normal_indicator: color::INPUT_PROMPT
                .maybe_paint(format!("{}{}", VI_NORMAL_MARKER, indicator))
                .to_string(),
            indicator: color::INPUT_PROMPT.maybe_paint(indicator).to_string(),
            multiline_indicator: color::INPUT_PROMPT
                .maybe_paint(MULTILINE_PROMPT)
                .to_string(),
        }
    }
}

impl reedline::Prompt for InputPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed(&self.endpoint)
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, prompt_mode: PromptEditMode) -> Cow<str> {
        match prompt_mode {
            PromptEditMode::Vi(PromptViMode::Normal) => Cow::Borrowed(&self.vi_normal_indicator),
            _ => Cow::Borrowed(&self.indicator),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed(&self.multiline_indicator)
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ColorMode;
    use reedline::Prompt;

    #[test]
    fn test_prompt_names_endpoint_and_field() {
        color::configure_color(ColorMode::Off);

        let prompt = InputPrompt::new("gpt2-20240101120000", "context");

        assert_eq!(prompt.render_prompt_left(), "[gpt2-20240101120000] ");
        assert_eq!(
            prompt.render_prompt_indicator(PromptEditMode::Emacs),
            "context: "
        );
        assert_eq!(
            prompt.render_prompt_indicator(PromptEditMode::Vi(PromptViMode::Normal)),
            "[=] context: "
        );
    }
}
