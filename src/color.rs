use crate::cli::ColorMode;
use lazy_static::lazy_static;
use nu_ansi_term::{AnsiString, Color, Style};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

lazy_static! {
    pub(crate) static ref INPUT_PROMPT: Style = Color::Blue.bold();
    pub(crate) static ref ENDPOINT: Style = Color::Green.bold();
    pub(crate) static ref ERROR_INDICATOR: Style = Color::Red.bold();
    pub(crate) static ref WARNING_INDICATOR: Style = Color::Yellow.bold();
    pub(crate) static ref MESSAGE_TEXT: Style = Color::Default.bold();
}

static USE_COLOR: AtomicBool = AtomicBool::new(true);

pub(crate) fn configure_color(mode: ColorMode) {
    USE_COLOR.store(matches!(mode, ColorMode::On), Ordering::Relaxed);
}

fn use_color() -> bool {
    USE_COLOR.load(Ordering::Relaxed)
}

/// Paints text only when color output is enabled.
pub(crate) trait MaybePaint {
    #[must_use]
    fn maybe_paint<'a, I: Into<Cow<'a, str>>>(&self, text: I) -> AnsiString<'a>;
}

impl MaybePaint for Style {
    fn maybe_paint<'a, I: Into<Cow<'a, str>>>(&self, text: I) -> AnsiString<'a> {
        if use_color() {
            self.paint(text)
        } else {
            Style::default().paint(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_output_without_color() {
        configure_color(ColorMode::Off);

        assert_eq!(ENDPOINT.maybe_paint("gpt2").to_string(), "gpt2");
    }
}
