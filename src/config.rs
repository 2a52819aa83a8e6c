use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::path::PathBuf;

use crate::{die, warn};

pub(crate) const HUB_TOKEN_ENV_VAR: &str = "HUGGING_FACE_HUB_TOKEN";

const DEFAULT_HUB_API_BASE: &str = "https://huggingface.co";
/// A local invocation gateway. Managed runtimes require signed requests,
/// which only such a gateway can provide.
const DEFAULT_RUNTIME_API_BASE: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Registry {
    /// The directory holding one record per endpoint.
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Hub {
    pub api_base: Option<String>,
    pub token: Option<String>,
}

/// An inference runtime which serves deployed endpoints.
#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Backend {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Backends {
    /// Serves endpoints of catalog models.
    #[serde(default)]
    pub catalog: Backend,
    /// Serves endpoints of hub and custom models.
    #[serde(default)]
    pub hub: Backend,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Config {
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub hub: Hub,
    #[serde(default)]
    pub backends: Backends,
}

impl Registry {
    /// The configured directory, or `./configs` relative to the working
    /// directory.
    pub(crate) fn path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("configs"))
    }
}

impl Hub {
    pub(crate) fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_HUB_API_BASE)
    }

    /// The configured token, falling back to the environment.
    pub(crate) fn token(&self) -> Option<String> {
        if let Some(token) = &self.token {
            return Some(token.clone());
        }

        match std::env::var(HUB_TOKEN_ENV_VAR) {
            Ok(token) => Some(token),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(_)) => die!("failed to parse {}", HUB_TOKEN_ENV_VAR),
        }
    }
}

impl Backend {
    pub(crate) fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_RUNTIME_API_BASE)
    }

    pub(crate) fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

fn get_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME");

    if let Some(home) = home {
        let home = PathBuf::from(home);

        const USER_PATHS: [&str; 2] = [".config/model-manager/config.toml", ".model-manager.toml"];

        for &path in USER_PATHS.iter() {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from("/etc/model-manager.toml");

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn parse_config<S: serde::de::DeserializeOwned>(config: &str) -> Result<S, toml::de::Error> {
    toml::de::from_str(config)
}

fn parse_config_or_die<S: serde::de::DeserializeOwned>(config: &str) -> S {
    match parse_config(config) {
        Ok(s) => s,
        Err(err) => die!("failed to parse config: {}", err),
    }
}

fn extra_fields_helper<'a>(
    path: &mut Vec<&'a String>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    extra: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        if let Some(config_value) = config.get(user_key) {
            if let (toml::Value::Table(user_value), toml::Value::Table(config_value)) =
                (user_value, config_value)
            {
                extra_fields_helper(path, user_value, config_value, extra)
            }
        } else {
            let path: Vec<&str> = path.iter().map(|&s| s.as_str()).collect();

            extra.push(path.join("."));
        }

        path.pop();
    }
}

/// Returns the dotted paths of keys present in `raw_config` which `config`
/// does not know about.
fn extra_fields(config: &Config, raw_config: &str) -> Vec<String> {
    let user_config: toml::Table = parse_config_or_die(raw_config);

    let config: toml::Table = {
        let serialized_config = match toml::ser::to_string(config) {
            Ok(serialized_config) => serialized_config,
            Err(err) => die!("failed to reserialize config: {}", err),
        };

        parse_config_or_die(&serialized_config)
    };

    let mut path = Vec::new();
    let mut extra = Vec::new();

    extra_fields_helper(&mut path, &user_config, &config, &mut extra);

    extra
}

/// Reads the config from `config`, or from the first default location that
/// exists. Without any config file, the defaults are used.
pub(crate) fn read_config(config: Option<PathBuf>) -> Config {
    let config_path = config.or_else(get_config_path);

    if let Some(path) = config_path {
        let raw_config = match std::fs::read_to_string(&path) {
            Ok(raw_config) => raw_config,
            Err(err) => die!("failed to read config \"{}\": {}", path.display(), err),
        };

        let config: Config = parse_config_or_die(&raw_config);

        for key in extra_fields(&config, &raw_config) {
            warn!("config contains extraneous key \"{}\", ignoring", key);
        }

        config
    } else {
        Config::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let raw = r#"
            [registry]
            path = "/var/lib/model-manager"

            [hub]
            api_base = "http://localhost:9000"
            token = "hf_secret"

            [backends.catalog]
            api_base = "http://localhost:8081"
            timeout_secs = 5

            [backends.hub]
            api_key = "key"
        "#;

        let config: Config = parse_config(raw).unwrap();

        assert_eq!(config.registry.path(), PathBuf::from("/var/lib/model-manager"));
        assert_eq!(config.hub.api_base(), "http://localhost:9000");
        assert_eq!(config.hub.token().as_deref(), Some("hf_secret"));
        assert_eq!(config.backends.catalog.api_base(), "http://localhost:8081");
        assert_eq!(
            config.backends.catalog.timeout(),
            std::time::Duration::from_secs(5)
        );
        assert_eq!(config.backends.hub.api_key.as_deref(), Some("key"));
        assert_eq!(config.backends.hub.api_base(), DEFAULT_RUNTIME_API_BASE);
        assert!(extra_fields(&config, raw).is_empty());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = parse_config("").unwrap();

        assert_eq!(config.registry.path(), PathBuf::from("configs"));
        assert_eq!(config.hub.api_base(), DEFAULT_HUB_API_BASE);
        assert_eq!(
            config.backends.hub.timeout(),
            std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert_eq!(config.backends.catalog.api_base(), "http://localhost:8080");
    }

    #[test]
    fn test_extra_fields_are_reported() {
        let raw = r#"
            editor = "vim"

            [hub]
            api_base = "http://localhost:9000"
            region = "us-east-1"
        "#;

        let config: Config = parse_config(raw).unwrap();

        let mut extra = extra_fields(&config, raw);
        extra.sort();

        assert_eq!(extra, vec!["editor", "hub.region"]);
    }
}
