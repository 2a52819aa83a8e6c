use std::io::{self, IsTerminal};
use std::time::Duration;

use crate::config::Config;
use crate::hub::HubApi;
use crate::registry::RecordStore;
use crate::utils::errors::error_chain;
use crate::{die, RequestedColorMode};

pub(crate) mod list;
pub(crate) mod plan;
pub(crate) mod query;
pub(crate) mod register;
pub(crate) mod show;

/// Hub lookups are small metadata requests.
const HUB_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, strum_macros::Display)]
pub(crate) enum ColorMode {
    On,
    Off,
}

impl ColorMode {
    /// Returns whether ANSI color should be used
    /// If the user has specified a preference, this is honored. This preference
    /// can be specified through the command line or the "NO_COLOR" environment
    /// variable. If the user hasn't stated a preference, color is enabled if
    /// diagnostics go to a terminal.
    pub(crate) fn resolve_auto(cm: RequestedColorMode) -> ColorMode {
        match cm {
            RequestedColorMode::Auto => {
                let disable_color =
                    std::env::var_os("NO_COLOR").is_some() || !io::stderr().is_terminal();

                if disable_color {
                    ColorMode::Off
                } else {
                    ColorMode::On
                }
            }
            RequestedColorMode::On => ColorMode::On,
            RequestedColorMode::Off => ColorMode::Off,
        }
    }
}

/// Parses a `key=value` argument.
pub(crate) fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got \"{}\"", arg)),
    }
}

pub(crate) fn open_store(config: &Config) -> RecordStore {
    match RecordStore::open(config.registry.path()) {
        Ok(store) => store,
        Err(err) => die!("failed to open the registry: {}", error_chain(&err)),
    }
}

pub(crate) fn hub_api(config: &Config) -> HubApi {
    match HubApi::new(config.hub.api_base(), config.hub.token(), HUB_TIMEOUT) {
        Ok(hub) => hub,
        Err(err) => die!("failed to configure the hub client: {}", error_chain(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("temperature=0.2"),
            Ok(("temperature".to_string(), "0.2".to_string()))
        );
        assert_eq!(
            parse_key_value("stop=a=b"),
            Ok(("stop".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("temperature").is_err());
        assert!(parse_key_value("=0.2").is_err());
    }
}
