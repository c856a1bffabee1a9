use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

// Reference deployment values. Unset environment variables keep these.
const DEFAULT_MODEL_PATH: &str = "models/llama-2-7b-chat.Q4_K_M.gguf";
const DEFAULT_TOKENIZER_PATH: &str = "models/tokenizer.json";
const DEFAULT_CONTEXT_LENGTH: usize = 2048;
const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub model: ModelConfig,
}

/// Everything the model session needs to come up. Read once at startup,
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub context_length: usize,
    pub threads: usize,
    pub temperature: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.into(),
            tokenizer_path: DEFAULT_TOKENIZER_PATH.into(),
            context_length: DEFAULT_CONTEXT_LENGTH,
            threads: num_cpus::get(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind: parse_var("BIND_ADDR", default_bind())?,
            model: ModelConfig::from_env()?,
        })
    }
}

impl ModelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            model_path: env_path("MODEL_PATH", defaults.model_path),
            tokenizer_path: env_path("TOKENIZER_PATH", defaults.tokenizer_path),
            context_length: parse_var("MODEL_CTX", defaults.context_length)?,
            threads: parse_var("MODEL_THREADS", defaults.threads)?,
            temperature: parse_var("MODEL_TEMPERATURE", defaults.temperature)?,
        })
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn env_path(var: &str, default: PathBuf) -> PathBuf {
    env::var(var).map(PathBuf::from).unwrap_or(default)
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    parse_value(var, env::var(var).ok(), default)
}

fn parse_value<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { var, value: raw }),
    }
}
