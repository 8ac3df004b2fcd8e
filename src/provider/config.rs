//! LLM provider configuration owned by the provider domain.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_base_url() -> String {
    "https://api.siliconflow.cn/v1".to_string()
}

fn default_model() -> String {
    "deepseek-ai/DeepSeek-V3.2-Exp".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_copilot_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_idle_per_host() -> usize {
    20
}

fn default_idle_timeout_secs() -> u64 {
    30
}

fn default_max_cached_profiles() -> usize {
    64
}

/// Connection pool configuration for the LLM endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; may be supplied through `BERTH_PROVIDER__API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model bound to agents that do not request one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model for the copilot profile.
    #[serde(default = "default_model")]
    pub copilot_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    #[serde(default = "default_copilot_temperature")]
    pub copilot_temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Idle keep-alive connections kept per host.
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,

    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Profiles kept in the pool's shared cache; requests past it get an uncached profile.
    #[serde(default = "default_max_cached_profiles")]
    pub max_cached_profiles: usize,

    /// Issue `GET {base_url}/models` during pool initialization.
    #[serde(default)]
    pub probe_on_init: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            default_model: default_model(),
            copilot_model: default_model(),
            default_temperature: default_temperature(),
            copilot_temperature: default_copilot_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            max_idle_per_host: default_max_idle_per_host(),
            idle_timeout_secs: default_idle_timeout_secs(),
            max_cached_profiles: default_max_cached_profiles(),
            probe_on_init: false,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Base URL without a trailing slash
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_string()
    }

    pub fn endpoint_url_is_valid(endpoint: &str) -> bool {
        let endpoint = endpoint.trim();
        let Some(rest) = endpoint
            .strip_prefix("http://")
            .or_else(|| endpoint.strip_prefix("https://"))
        else {
            return false;
        };

        if rest.is_empty() || rest.chars().any(char::is_whitespace) {
            return false;
        }

        let authority = rest.split('/').next().unwrap_or_default();
        let host_port = authority.rsplit('@').next().unwrap_or(authority);
        let host = if host_port.starts_with('[') {
            let Some(end_bracket) = host_port.find(']') else {
                return false;
            };
            &host_port[1..end_bracket]
        } else {
            host_port.split(':').next().unwrap_or_default()
        };

        if host.is_empty() {
            return false;
        }

        host == "localhost" || host.contains('.') || host.parse::<std::net::IpAddr>().is_ok()
    }

    /// Validate provider configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_model.trim().is_empty() {
            return Err("default_model cannot be empty".to_string());
        }
        if self.copilot_model.trim().is_empty() {
            return Err("copilot_model cannot be empty".to_string());
        }
        if !Self::endpoint_url_is_valid(&self.base_url) {
            return Err(format!("Invalid endpoint URL: {}", self.base_url));
        }
        for (label, temp) in [
            ("default_temperature", self.default_temperature),
            ("copilot_temperature", self.copilot_temperature),
        ] {
            if !(0.0..=2.0).contains(&temp) {
                return Err(format!(
                    "{} must be between 0.0 and 2.0, got {}",
                    label, temp
                ));
            }
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be positive".to_string());
        }
        if self.max_cached_profiles < 2 {
            return Err("max_cached_profiles must hold the default and copilot profiles".to_string());
        }
        Ok(())
    }
}
