use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::survey::machine::SurveyFlow;

/// Where survey rounds are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    /// In-process scoring against the bundled catalog file.
    Local,
    /// The external recommendation backend at `BACKEND_API_URL`.
    Remote,
}

/// Application configuration loaded from environment variables.
/// Startup fails if a variable is present but malformed, or if remote
/// scoring is selected without a backend URL.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub scoring_mode: ScoringMode,
    pub backend_api_url: Option<String>,
    pub backend_token: Option<String>,
    pub backend_timeout: Duration,
    pub catalog_path: PathBuf,
    pub survey_flow: SurveyFlow,
    /// Idle time after which a survey session is dropped.
    pub session_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            scoring_mode: ScoringMode::Local,
            backend_api_url: None,
            backend_token: None,
            backend_timeout: Duration::from_secs(30),
            catalog_path: PathBuf::from("data/catalog.json"),
            survey_flow: SurveyFlow::TwoStage,
            session_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let scoring_mode = match var("SCORING_MODE") {
            Some(raw) => parse_scoring_mode(&raw)?,
            None => defaults.scoring_mode,
        };
        let backend_api_url = var("BACKEND_API_URL");
        if scoring_mode == ScoringMode::Remote && backend_api_url.is_none() {
            bail!("SCORING_MODE=remote requires BACKEND_API_URL to be set");
        }

        Ok(Config {
            port: match var("PORT") {
                Some(raw) => raw
                    .parse::<u16>()
                    .context("PORT must be a valid port number")?,
                None => defaults.port,
            },
            rust_log: var("RUST_LOG").unwrap_or(defaults.rust_log),
            scoring_mode,
            backend_api_url,
            backend_token: var("BACKEND_TOKEN"),
            backend_timeout: match var("BACKEND_TIMEOUT_SECS") {
                Some(raw) => Duration::from_secs(
                    raw.parse::<u64>()
                        .context("BACKEND_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                None => defaults.backend_timeout,
            },
            catalog_path: var("CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_path),
            survey_flow: match var("SURVEY_FLOW") {
                Some(raw) => parse_survey_flow(&raw)?,
                None => defaults.survey_flow,
            },
            session_ttl: match var("SESSION_TTL_SECS") {
                Some(raw) => parse_session_ttl(&raw)?,
                None => defaults.session_ttl,
            },
        })
    }
}

fn parse_scoring_mode(raw: &str) -> Result<ScoringMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(ScoringMode::Local),
        "remote" => Ok(ScoringMode::Remote),
        other => bail!("SCORING_MODE must be 'local' or 'remote', got '{other}'"),
    }
}

fn parse_session_ttl(raw: &str) -> Result<Duration> {
    let secs = raw
        .parse::<u64>()
        .context("SESSION_TTL_SECS must be a whole number of seconds")?;
    if secs == 0 {
        bail!("SESSION_TTL_SECS must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

fn parse_survey_flow(raw: &str) -> Result<SurveyFlow> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "two_stage" => Ok(SurveyFlow::TwoStage),
        "single_stage" => Ok(SurveyFlow::SingleStage),
        other => bail!("SURVEY_FLOW must be 'two_stage' or 'single_stage', got '{other}'"),
    }
}
