//! Runtime configuration read from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Default model name.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

pub const DEFAULT_PORT: u16 = 7860;
pub const DEFAULT_HISTORY_WINDOW: usize = 10;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// How the model is asked to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Free narrative text; `[[formula]]` blocks in it are rolled.
    #[default]
    Narrative,
    /// JSON with a scene sequence, checks and world updates.
    Structured,
}

impl FromStr for ResponseMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "narrative" => Ok(Self::Narrative),
            "structured" | "json" => Ok(Self::Structured),
            other => bail!("unknown RESPONSE_MODE '{other}' (expected narrative or structured)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Empty when unset; requests then fail with `LlmError::NotConfigured`.
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub llm: LlmConfig,
    /// Template file; `None` selects the built-in world.
    pub world_template: Option<PathBuf>,
    pub server_host: String,
    pub server_port: u16,
    pub history_window: usize,
    pub response_mode: ResponseMode,
    pub cors_allowed_origins: Option<String>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("DEEPSEEK_KEY")
            .or_else(|| get("API_KEY"))
            .unwrap_or_default();
        let base_url = get("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = get("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout_secs: u64 = parse_or(get("LLM_TIMEOUT_SECS"), "LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?;
        let temperature: Option<f32> = get("LLM_TEMPERATURE")
            .map(|raw| {
                raw.parse()
                    .with_context(|| format!("LLM_TEMPERATURE must be a number, got '{raw}'"))
            })
            .transpose()?;

        let server_port: u16 = parse_or(
            get("SERVER_PORT").or_else(|| get("PORT")),
            "SERVER_PORT",
            DEFAULT_PORT,
        )?;
        let history_window: usize =
            parse_or(get("HISTORY_WINDOW"), "HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW)?;
        if history_window == 0 {
            bail!("HISTORY_WINDOW must be at least 1");
        }

        let response_mode = match get("RESPONSE_MODE") {
            Some(raw) => raw.parse()?,
            None => ResponseMode::default(),
        };

        Ok(Self {
            llm: LlmConfig {
                api_key,
                base_url,
                model,
                timeout: Duration::from_secs(timeout_secs),
                temperature,
            },
            world_template: get("WORLD_TEMPLATE").map(PathBuf::from),
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port,
            history_window,
            response_mode,
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS"),
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
