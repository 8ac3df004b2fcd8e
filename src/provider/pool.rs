//! LLM Connection Pool
//!
//! Process-wide, read-mostly after initialization. Agents hold an
//! [`LlmHandle`]: a shared reference to a cached client profile plus the
//! pooled HTTP client. Handles never own a connection.

use crate::error::ProvisionError;
use crate::provider::config::ProviderConfig;
use crate::readiness::GateInitializer;
use crate::template::TemplateCatalog;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Resolved client settings for one (model, temperature, max_tokens) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmProfile {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProfileKey {
    model: String,
    temperature_bits: u32,
    max_tokens: u32,
}

impl ProfileKey {
    fn new(model: &str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            temperature_bits: temperature.to_bits(),
            max_tokens,
        }
    }
}

#[derive(Clone)]
enum Binding {
    Pooled {
        profile: Arc<LlmProfile>,
        client: reqwest::Client,
    },
    Unbound {
        model: String,
    },
}

/// Reference into the connection pool bound to an agent
#[derive(Clone)]
pub struct LlmHandle {
    binding: Binding,
}

impl LlmHandle {
    /// Degraded handle that names a model but holds no pooled client
    pub fn unbound(model: impl Into<String>) -> Self {
        Self {
            binding: Binding::Unbound {
                model: model.into(),
            },
        }
    }

    pub fn model(&self) -> &str {
        match &self.binding {
            Binding::Pooled { profile, .. } => &profile.model,
            Binding::Unbound { model } => model,
        }
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self.binding, Binding::Pooled { .. })
    }

    pub fn profile(&self) -> Option<&LlmProfile> {
        match &self.binding {
            Binding::Pooled { profile, .. } => Some(profile),
            Binding::Unbound { .. } => None,
        }
    }

    /// Pooled HTTP client, when bound
    pub fn client(&self) -> Option<&reqwest::Client> {
        match &self.binding {
            Binding::Pooled { client, .. } => Some(client),
            Binding::Unbound { .. } => None,
        }
    }

    /// Whether two handles share the same cached profile
    pub fn shares_profile(&self, other: &LlmHandle) -> bool {
        match (&self.binding, &other.binding) {
            (Binding::Pooled { profile: a, .. }, Binding::Pooled { profile: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }

    pub fn describe(&self) -> LlmBindingInfo {
        LlmBindingInfo {
            model: self.model().to_string(),
            pooled: self.is_pooled(),
            base_url: self.profile().map(|p| p.base_url.clone()),
            temperature: self.profile().map(|p| p.temperature),
            max_tokens: self.profile().map(|p| p.max_tokens),
        }
    }
}

impl std::fmt::Debug for LlmHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmHandle")
            .field("model", &self.model())
            .field("pooled", &self.is_pooled())
            .finish()
    }
}

/// Serializable description of an agent's LLM binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmBindingInfo {
    pub model: String,
    pub pooled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Shared LLM connection pool and template cache
pub struct LlmPool {
    config: ProviderConfig,
    client: reqwest::Client,
    profiles: RwLock<HashMap<ProfileKey, Arc<LlmProfile>>>,
    templates: TemplateCatalog,
}

impl LlmPool {
    /// Build the pool. Creates the HTTP client and caches the default and copilot profiles.
    pub fn build(config: ProviderConfig, templates: TemplateCatalog) -> Result<Self, ProvisionError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.idle_timeout())
            .timeout(config.request_timeout())
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ProvisionError::ReadinessFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        let pool = Self {
            config,
            client,
            profiles: RwLock::new(HashMap::new()),
            templates,
        };
        let max_tokens = pool.config.max_tokens;
        pool.profile(
            &pool.config.default_model.clone(),
            pool.config.default_temperature,
            max_tokens,
        );
        pool.profile(
            &pool.config.copilot_model.clone(),
            pool.config.copilot_temperature,
            max_tokens,
        );
        Ok(pool)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Template cache loaded with the pool
    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn cached_profiles(&self) -> usize {
        self.profiles.read().len()
    }

    /// Handle for the requested model, temperature and token budget, falling back to the defaults.
    pub fn handle(
        &self,
        model: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<LlmHandle, ProvisionError> {
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.default_model)
            .to_string();
        let temperature = temperature.unwrap_or(self.config.default_temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ProvisionError::Construction(format!(
                "temperature {} outside 0.0-2.0",
                temperature
            )));
        }
        let max_tokens = max_tokens.unwrap_or(self.config.max_tokens);
        if max_tokens == 0 {
            return Err(ProvisionError::Construction(
                "max_tokens must be positive".to_string(),
            ));
        }

        Ok(LlmHandle {
            binding: Binding::Pooled {
                profile: self.profile(&model, temperature, max_tokens),
                client: self.client.clone(),
            },
        })
    }

    /// Handle for the copilot profile
    pub fn copilot_handle(&self) -> LlmHandle {
        LlmHandle {
            binding: Binding::Pooled {
                profile: self.profile(
                    &self.config.copilot_model.clone(),
                    self.config.copilot_temperature,
                    self.config.max_tokens,
                ),
                client: self.client.clone(),
            },
        }
    }

    fn new_profile(&self, model: &str, temperature: f32, max_tokens: u32) -> LlmProfile {
        LlmProfile {
            model: model.to_string(),
            temperature,
            max_tokens,
            base_url: self.config.normalized_base_url(),
            request_timeout_secs: self.config.request_timeout_secs,
            max_retries: self.config.max_retries,
        }
    }

    /// Cached profile, or a fresh uncached one once the cache is full
    fn profile(&self, model: &str, temperature: f32, max_tokens: u32) -> Arc<LlmProfile> {
        let key = ProfileKey::new(model, temperature, max_tokens);
        if let Some(profile) = self.profiles.read().get(&key) {
            return Arc::clone(profile);
        }

        let mut profiles = self.profiles.write();
        // Another caller may have inserted while we waited for the write lock
        if let Some(profile) = profiles.get(&key) {
            return Arc::clone(profile);
        }
        let profile = Arc::new(self.new_profile(model, temperature, max_tokens));
        if profiles.len() >= self.config.max_cached_profiles {
            debug!(
                model,
                temperature,
                max_tokens,
                "Profile cache full; handing out uncached profile"
            );
            return profile;
        }
        debug!(model, temperature, max_tokens, "Caching LLM profile");
        profiles.insert(key, Arc::clone(&profile));
        profile
    }

    /// Check the endpoint answers `GET /models`
    pub async fn probe(&self) -> Result<(), ProvisionError> {
        let url = format!("{}/models", self.config.normalized_base_url());
        let mut request = self.client.get(&url);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ProvisionError::ReadinessFailed(format!("Probe of {} failed: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(ProvisionError::ReadinessFailed(format!(
                "Probe of {} returned {}",
                url,
                response.status()
            )));
        }
        Ok(())
    }
}

/// Initializes an [`LlmPool`] from configuration behind the readiness gate
pub struct HttpPoolInitializer {
    config: ProviderConfig,
    templates: TemplateCatalog,
}

impl HttpPoolInitializer {
    pub fn new(config: ProviderConfig, templates: TemplateCatalog) -> Self {
        Self { config, templates }
    }
}

#[async_trait]
impl GateInitializer<LlmPool> for HttpPoolInitializer {
    async fn initialize(&self) -> Result<LlmPool, ProvisionError> {
        let start = Instant::now();
        info!(base_url = %self.config.base_url, "Initializing LLM connection pool");

        if self.config.api_key.is_none() {
            warn!("No provider API key configured; requests may be rejected by the endpoint");
        }

        let pool = LlmPool::build(self.config.clone(), self.templates.clone())?;
        if self.config.probe_on_init {
            pool.probe().await?;
        }

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            profiles = pool.cached_profiles(),
            "LLM connection pool initialized"
        );
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> LlmPool {
        LlmPool::build(ProviderConfig::default(), TemplateCatalog::builtin()).unwrap()
    }

    #[test]
    fn test_build_caches_default_profiles() {
        let pool = pool();
        // default and copilot share a model but differ in temperature
        assert_eq!(pool.cached_profiles(), 2);
    }

    #[test]
    fn test_handles_share_cached_profile() {
        let pool = pool();
        let a = pool.handle(None, None, None).unwrap();
        let b = pool.handle(Some("  "), None, None).unwrap();
        assert!(a.is_pooled());
        assert!(a.shares_profile(&b));
        assert_eq!(a.model(), pool.config().default_model);
        assert_eq!(pool.cached_profiles(), 2);
    }

    #[test]
    fn test_new_model_is_cached_on_demand() {
        let pool = pool();
        let handle = pool.handle(Some("qwen-small"), Some(0.2), None).unwrap();
        assert_eq!(handle.model(), "qwen-small");
        assert_eq!(handle.profile().unwrap().temperature, 0.2);
        assert_eq!(pool.cached_profiles(), 3);
    }

    #[test]
    fn test_out_of_range_temperature_rejected() {
        let pool = pool();
        assert!(matches!(
            pool.handle(None, Some(3.0), None),
            Err(ProvisionError::Construction(_))
        ));
    }

    #[test]
    fn test_token_budget_is_part_of_profile() {
        let pool = pool();
        let default = pool.handle(None, None, None).unwrap();
        let short = pool.handle(None, None, Some(123)).unwrap();
        assert_eq!(default.profile().unwrap().max_tokens, 2000);
        assert_eq!(short.profile().unwrap().max_tokens, 123);
        assert!(!default.shares_profile(&short));
        assert_eq!(short.describe().max_tokens, Some(123));
        assert!(matches!(
            pool.handle(None, None, Some(0)),
            Err(ProvisionError::Construction(_))
        ));
    }

    #[test]
    fn test_profile_cache_is_capped() {
        let config = ProviderConfig {
            max_cached_profiles: 4,
            ..Default::default()
        };
        let pool = LlmPool::build(config, TemplateCatalog::builtin()).unwrap();

        let handles: Vec<_> = (0..50)
            .map(|i| pool.handle(Some(&format!("m-{}", i)), None, None).unwrap())
            .collect();
        assert_eq!(pool.cached_profiles(), 4);

        // cached entries are still shared; overflow entries are not
        let again = pool.handle(Some("m-0"), None, None).unwrap();
        assert!(again.shares_profile(&handles[0]));
        let overflow = pool.handle(Some("m-49"), None, None).unwrap();
        assert!(!overflow.shares_profile(&handles[49]));
        assert_eq!(overflow.model(), "m-49");
        assert!(overflow.is_pooled());
        let default = pool.handle(None, None, None).unwrap();
        assert!(default.shares_profile(&pool.handle(None, None, None).unwrap()));
    }

    #[test]
    fn test_unbound_handle_is_degraded() {
        let handle = LlmHandle::unbound("fallback-model");
        assert!(!handle.is_pooled());
        assert!(handle.client().is_none());
        let info = handle.describe();
        assert_eq!(info.model, "fallback-model");
        assert!(!info.pooled);
        assert!(info.base_url.is_none());
    }

    #[test]
    fn test_copilot_handle_uses_copilot_temperature() {
        let pool = pool();
        let handle = pool.copilot_handle();
        assert_eq!(handle.profile().unwrap().temperature, 0.3);
    }

    #[tokio::test]
    async fn test_initializer_without_probe() {
        let init = HttpPoolInitializer::new(ProviderConfig::default(), TemplateCatalog::builtin());
        let pool = init.initialize().await.unwrap();
        assert_eq!(pool.cached_profiles(), 2);
    }
}
