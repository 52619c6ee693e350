use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_env_parsed, is_production};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Default chat model used for caption generation.
pub const DEFAULT_MODEL: &str = "gpt-5-nano";

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_OPENAI_TIMEOUT_SECS: u64 = 120;
const DEFAULT_OPS_PORT: u16 = 9090;

#[derive(Debug, Clone)]
pub struct CaptionConfig {
    pub common: core_config::Config,
    pub openai: OpenAiSettings,
    pub ops: OpsSettings,
    pub observability: ObservabilitySettings,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// Bearer credential for the completion API.
    pub api_key: Secret<String>,
    pub base_url: String,
    /// Model identifier sent with every completion request.
    pub model: String,
    pub timeout: Duration,
}

/// Listener for health, readiness and metrics, kept off the public router.
#[derive(Debug, Clone)]
pub struct OpsSettings {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct ObservabilitySettings {
    pub log_level: String,
    /// OTLP trace export is disabled when unset.
    pub otlp_endpoint: Option<String>,
}

impl CaptionConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = is_production();

        Ok(CaptionConfig {
            common: common_config,
            openai: OpenAiSettings {
                api_key: Secret::new(get_env("OPENAI_API_KEY", None, is_prod)?),
                base_url: get_env("OPENAI_BASE_URL", Some(DEFAULT_OPENAI_BASE_URL), is_prod)?,
                model: get_env("CAPTION_MODEL", Some(DEFAULT_MODEL), is_prod)?,
                timeout: Duration::from_secs(get_env_parsed(
                    "OPENAI_TIMEOUT_SECS",
                    DEFAULT_OPENAI_TIMEOUT_SECS,
                    is_prod,
                )?),
            },
            ops: OpsSettings {
                port: get_env_parsed("OPS_PORT", DEFAULT_OPS_PORT, is_prod)?,
            },
            observability: ObservabilitySettings {
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            },
        })
    }
}
