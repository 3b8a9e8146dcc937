use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for structured env overrides, e.g. `PIPESTREAM_SERVER__PORT=9000`.
const ENV_PREFIX: &str = "PIPESTREAM_";

/// Legacy cookie variables and the config keys they feed.
const LEGACY_ENV: [(&str, &str); 2] = [
    ("YT_DLP_COOKIE_FILE_INFO", "credentials.info_cookie_file"),
    ("YT_DLP_COOKIE_FILE_STREAM", "credentials.stream_cookie_file"),
];

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(base_figment().merge(Toml::file(path)))
}

/// Load configuration from built-in defaults and environment variables only.
pub fn load_default_config() -> Result<Config, ConfigError> {
    extract(base_figment())
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn base_figment() -> Figment {
    Figment::from(Serialized::defaults(Config::default()))
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    let legacy = Env::raw()
        .only(&LEGACY_ENV.map(|(var, _)| var))
        .map(|key| {
            LEGACY_ENV
                .iter()
                .find(|(var, _)| key.as_str().eq_ignore_ascii_case(var))
                .map(|(_, target)| (*target).into())
                .unwrap_or_else(|| key.into())
        });

    figment
        .merge(legacy)
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}
