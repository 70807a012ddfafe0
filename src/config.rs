//! Configuration management for the chemistry agent.
//!
//! Configuration can be set via environment variables:
//! - `LLM_API_KEY` - Required. API key for the chat completion endpoint.
//! - `LLM_BASE_URL` - Optional. OpenAI-compatible base URL. Defaults to `https://api.deepseek.com/v1`.
//! - `LLM_MODEL` - Optional. Model identifier. Defaults to `deepseek-chat`.
//! - `LLM_MAX_TOKENS` - Optional. Completion token limit. Defaults to `1000`.
//! - `LLM_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.7`.
//! - `MAX_TOOL_ITERATIONS` - Optional. Tool-dispatch rounds per turn. Defaults to `3`.
//! - `RESOLVE_NAMES` - Optional. Look up non-SMILES identifiers on PubChem. Defaults to `true`.
//! - `PUBCHEM_BASE_URL` - Optional. PUG REST base URL.
//! - `IMAGE_WIDTH` / `IMAGE_HEIGHT` - Optional. 2D depiction size in pixels. Default `400`.
//! - `EMBED_SEED` - Optional. Fixed seed for 3D embedding.

use std::str::FromStr;

use thiserror::Error;

use crate::chem::pubchem;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat completion API key
    pub api_key: String,

    /// OpenAI-compatible base URL (without `/chat/completions`)
    pub base_url: String,

    /// Model identifier
    pub model: String,

    pub max_tokens: u32,

    pub temperature: f32,

    /// Maximum tool-dispatch rounds in one conversational turn
    pub max_tool_iterations: usize,

    /// Resolve compound names through PubChem
    pub resolve_names: bool,

    pub pubchem_base_url: String,

    pub image_width: u32,

    pub image_height: u32,

    /// Fixed 3D embedding seed (random per call when unset)
    pub embed_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `LLM_API_KEY` is not set, and
    /// `ConfigError::InvalidValue` for unparsable numbers or booleans.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("LLM_API_KEY".to_string()))?;

        let base_url = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string());

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string());

        let max_tokens = parse_env("LLM_MAX_TOKENS")?.unwrap_or(1000);
        let temperature = parse_env("LLM_TEMPERATURE")?.unwrap_or(0.7);

        let max_tool_iterations = parse_env("MAX_TOOL_ITERATIONS")?.unwrap_or(3);
        if max_tool_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_TOOL_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let resolve_names = std::env::var("RESOLVE_NAMES")
            .ok()
            .map(|v| parse_bool(&v).map_err(|e| ConfigError::InvalidValue("RESOLVE_NAMES".to_string(), e)))
            .transpose()?
            .unwrap_or(true);

        let pubchem_base_url = std::env::var("PUBCHEM_BASE_URL")
            .unwrap_or_else(|_| pubchem::DEFAULT_BASE_URL.to_string());

        let image_width = parse_env("IMAGE_WIDTH")?.unwrap_or(400);
        let image_height = parse_env("IMAGE_HEIGHT")?.unwrap_or(400);
        let embed_seed = parse_env("EMBED_SEED")?;

        Ok(Self {
            api_key,
            base_url,
            model,
            max_tokens,
            temperature,
            max_tool_iterations,
            resolve_names,
            pubchem_base_url,
            image_width,
            image_height,
            embed_seed,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.deepseek.com/v1".to_string(),
            model,
            max_tokens: 1000,
            temperature: 0.7,
            max_tool_iterations: 3,
            resolve_names: false,
            pubchem_base_url: pubchem::DEFAULT_BASE_URL.to_string(),
            image_width: 400,
            image_height: 400,
            embed_seed: None,
        }
    }
}

fn parse_env<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(name)
        .ok()
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}
