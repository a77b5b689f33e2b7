use std::{fs, path::Path};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "chat_cli.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub api_base_url: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
}

/// Defaults, then the config file, then the environment.
///
/// An explicitly named config file must exist; the default one is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

fn load_settings_with(
    config_path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let (path, required) = match config_path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
            if let Some(v) = file_cfg.api_base_url {
                settings.api_base_url = v;
            }
        }
        Err(err) if required => {
            return Err(err).with_context(|| format!("cannot read config '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, lookup);
    Ok(settings)
}

fn apply_env_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("AUDIT_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
}

/// Trims and checks that `raw` is an absolute http(s) URL that can carry a path.
pub fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("api base url is empty");
    }
    let url = Url::parse(raw).with_context(|| format!("invalid api base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("api base url '{raw}' must use http or https");
    }
    if url.cannot_be_a_base() {
        bail!("api base url '{raw}' cannot carry a path");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
