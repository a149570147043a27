//! LLM client abstraction and provider selection
//!
//! - **Ollama**: local inference (default feature)
//! - **OpenAI**: OpenAI and compatible APIs (`openai` feature)

use crate::types::{AppError, Result};
use crate::utils::toml_config::LlmConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Generic LLM client trait for provider abstraction
///
/// Workflow nodes only ever send a system prompt plus the user-side input and
/// read back the text of the completion.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
///
/// | Provider | Feature | Notes |
/// |----------|---------|-------|
/// | Ollama | `ollama` (default) | Recommended for local |
/// | OpenAI | `openai` | Any OpenAI-compatible endpoint |
#[derive(Debug, Clone)]
pub enum Provider {
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Resolve a provider from configuration, reading API keys from the environment.
    ///
    /// # Errors
    ///
    /// [`AppError::ModelUnavailable`] when the OpenAI key variable is unset or empty.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::from_config_with(config, |name| std::env::var(name).ok())
    }

    pub fn from_config_with<F>(config: &LlmConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match config {
            LlmConfig::Ollama { base_url, model } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            }),
            LlmConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => {
                let api_key = lookup(api_key_env)
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::ModelUnavailable(format!(
                            "API key not configured: set {}",
                            api_key_env
                        ))
                    })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.clone(),
                })
            }
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] when the provider's Cargo feature
    /// is not enabled.
    pub async fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Arc::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "{} provider not enabled. Rebuild with the '{}' feature.",
                other.name(),
                other.name().to_lowercase()
            ))),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Configuration-based client factory
///
/// ```rust,ignore
/// let factory = LLMClientFactory::from_config(&config.llm)?;
/// let client = factory.create_default().await?;
/// ```
pub struct LLMClientFactory {
    default_provider: Provider,
}

impl LLMClientFactory {
    pub fn new(default_provider: Provider) -> Self {
        Self { default_provider }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(Provider::from_config(config)?))
    }

    /// Create a client using the default provider
    pub async fn create_default(&self) -> Result<Arc<dyn LLMClient>> {
        self.default_provider.create_client().await
    }

    pub fn default_provider(&self) -> &Provider {
        &self.default_provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_config() -> LlmConfig {
        LlmConfig::OpenAI {
            api_key_env: "TEST_OPENAI_KEY".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    #[test]
    fn test_provider_name() {
        let ollama = Provider::Ollama {
            base_url: "".to_string(),
            model: "llama3.2".to_string(),
        };
        assert_eq!(ollama.name(), "Ollama");
        assert_eq!(ollama.model(), "llama3.2");
    }

    #[test]
    fn test_from_config_ollama() {
        let provider = Provider::from_config(&LlmConfig::default()).unwrap();
        assert!(matches!(provider, Provider::Ollama { .. }));
    }

    #[test]
    fn test_from_config_openai_reads_key() {
        let provider = Provider::from_config_with(&openai_config(), |name| {
            (name == "TEST_OPENAI_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();

        match provider {
            Provider::OpenAI { api_key, model, .. } => {
                assert_eq!(api_key, "sk-test");
                assert_eq!(model, "gpt-4o-mini");
            }
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[test]
    fn test_missing_api_key_is_model_unavailable() {
        let err = Provider::from_config_with(&openai_config(), |_| None).unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable(_)));
        assert!(err.to_string().contains("TEST_OPENAI_KEY"));

        let err = Provider::from_config_with(&openai_config(), |_| Some("  ".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable(_)));
    }

    #[cfg(not(feature = "openai"))]
    #[tokio::test]
    async fn test_disabled_provider_is_configuration_error() {
        let provider = Provider::OpenAI {
            api_key: "sk".to_string(),
            api_base: "http://localhost".to_string(),
            model: "m".to_string(),
        };
        let err = match provider.create_client().await {
            Ok(_) => panic!("Expected error"),
            Err(e) => e,
        };
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
