use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::generation::pipeline::FallbackPolicy;
use crate::generation::screening::{ClearanceGuard, DEFAULT_CLEARANCE_KEYWORDS};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub ollama_url: String,
    pub portfolio_path: PathBuf,
    pub prompts_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub resume_template_id: i32,
    pub cover_letter_template_id: i32,
    pub latex_program: String,
    pub llm_timeout: Duration,
    pub render_timeout: Duration,
    pub verbatim_fallback: FallbackPolicy,
    pub clearance_guard: ClearanceGuard,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            portfolio_path: PathBuf::from(env_or("PORTFOLIO_PATH", "data/portfolio.json")),
            prompts_dir: optional_env("PROMPTS_DIR").map(PathBuf::from),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "output")),
            resume_template_id: parse_env("RESUME_TEMPLATE_ID", 1)?,
            cover_letter_template_id: parse_env("COVER_LETTER_TEMPLATE_ID", 2)?,
            latex_program: env_or("LATEX_PROGRAM", "pdflatex"),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 120)?),
            render_timeout: Duration::from_secs(parse_env("RENDER_TIMEOUT_SECS", 60)?),
            verbatim_fallback: optional_env("VERBATIM_FALLBACK")
                .map(|v| v.parse::<FallbackPolicy>().map_err(|e| anyhow!(e)))
                .transpose()
                .context("VERBATIM_FALLBACK is invalid")?
                .unwrap_or_default(),
            clearance_guard: clearance_guard()?,
        })
    }
}

/// `CLEARANCE_CHECK=false` turns the guard off; `CLEARANCE_KEYWORDS` is a
/// comma-separated replacement for the built-in list.
fn clearance_guard() -> Result<ClearanceGuard> {
    if !parse_env("CLEARANCE_CHECK", true)? {
        return Ok(ClearanceGuard::disabled());
    }
    Ok(match optional_env("CLEARANCE_KEYWORDS") {
        Some(raw) => ClearanceGuard::new(raw.split(',')),
        None => ClearanceGuard::new(DEFAULT_CLEARANCE_KEYWORDS.iter().copied()),
    })
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank both read as `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
