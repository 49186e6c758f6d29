#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use toml_config::{default_config_path, write_config, ConfigFile};

use crate::utils::error::Result;
use crate::utils::validation::{validate_positive_number, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_USERNAME: &str = "SL_USERNAME";
pub const ENV_API_KEY: &str = "SL_API_KEY";
pub const ENV_ENDPOINT_URL: &str = "SL_ENDPOINT_URL";
pub const ENV_TIMEOUT: &str = "SL_TIMEOUT";

/// Client settings gathered from arguments, the environment or `~/.softlayer`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftLayerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    /// 秒
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SoftLayerSettings {
    /// 從環境變數讀取；`lookup` 讓測試不必動到行程環境
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            username: non_empty(lookup(ENV_USERNAME)),
            api_key: non_empty(lookup(ENV_API_KEY)),
            endpoint_url: non_empty(lookup(ENV_ENDPOINT_URL)),
            timeout: lookup(ENV_TIMEOUT).and_then(|t| t.trim().parse().ok()),
            proxy: None,
            verify: None,
        }
    }

    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.api_key.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 空字串視為未設定
    pub fn normalized(self) -> Self {
        Self {
            username: non_empty(self.username),
            api_key: non_empty(self.api_key),
            endpoint_url: non_empty(self.endpoint_url),
            timeout: self.timeout,
            proxy: non_empty(self.proxy),
            verify: self.verify,
        }
    }

    /// 以較低優先序的來源補齊尚未設定的欄位
    pub fn fill_from(&mut self, lower: SoftLayerSettings) {
        let lower = lower.normalized();
        if self.username.is_none() {
            self.username = lower.username;
        }
        if self.api_key.is_none() {
            self.api_key = lower.api_key;
        }
        if self.endpoint_url.is_none() {
            self.endpoint_url = lower.endpoint_url;
        }
        if self.timeout.is_none() {
            self.timeout = lower.timeout;
        }
        if self.proxy.is_none() {
            self.proxy = lower.proxy;
        }
        if self.verify.is_none() {
            self.verify = lower.verify;
        }
    }
}

impl Validate for SoftLayerSettings {
    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint_url {
            validate_url("endpoint_url", endpoint)?;
        }
        if let Some(timeout) = self.timeout {
            validate_positive_number("timeout", timeout, 1)?;
        }
        if let Some(proxy) = &self.proxy {
            validate_url("proxy", proxy)?;
        }
        Ok(())
    }
}

/// 參數 > 環境變數 > 設定檔；一旦取得帳號與 API key 即停止往下找
pub fn resolve_settings(
    explicit: SoftLayerSettings,
    config_file: Option<&Path>,
) -> Result<SoftLayerSettings> {
    resolve_settings_with(explicit, SoftLayerSettings::from_env(), config_file)
}

pub fn resolve_settings_with(
    explicit: SoftLayerSettings,
    env: SoftLayerSettings,
    config_file: Option<&Path>,
) -> Result<SoftLayerSettings> {
    let mut settings = explicit.normalized();

    if !settings.has_credentials() {
        settings.fill_from(env);
    }

    if !settings.has_credentials() {
        let path = match config_file {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };
        match path {
            Some(path) if path.exists() => {
                tracing::debug!("reading config file {}", path.display());
                settings.fill_from(ConfigFile::from_file(&path)?.softlayer);
            }
            Some(path) => tracing::debug!("config file {} not found", path.display()),
            None => tracing::debug!("no home directory, skipping config file"),
        }
    }

    settings.validate()?;
    Ok(settings)
}
