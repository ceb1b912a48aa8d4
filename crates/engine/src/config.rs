use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shelfwise_backend_openai::OpenAiConfig;
use shelfwise_features::DecayConfig;
use shelfwise_intent::IntentConfig;
use shelfwise_rerank::{RerankConfig, StrategyWeights};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Complete engine configuration. Every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub profile: DecayConfig,
    pub intent: IntentConfig,
    pub ranking: RankingConfig,
    pub llm: OpenAiConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Items scoring at or below this are dropped
    pub relevance_floor: f64,
    /// Limit used when the request does not name one
    pub default_limit: usize,
    /// Largest limit a request may ask for
    pub max_limit: usize,
    /// Concurrent co-occurrence lookups; defaults to available parallelism.
    /// Only the store lookups are bounded by this. The scorers are pure and
    /// run inline once every lookup has finished.
    pub scoring_concurrency: Option<usize>,
    /// Price below which users without purchases get the content bonus
    pub low_price_threshold: f64,
    /// Weights of the hybrid strategy
    pub hybrid: StrategyWeights,
}

impl Default for RankingConfig {
    fn default() -> Self {
        let rerank = RerankConfig::default();
        Self {
            relevance_floor: rerank.relevance_floor,
            default_limit: 10,
            max_limit: 100,
            scoring_concurrency: None,
            low_price_threshold: rerank.low_price_threshold,
            hybrid: rerank.hybrid,
        }
    }
}

impl RankingConfig {
    pub fn rerank(&self) -> RerankConfig {
        RerankConfig {
            relevance_floor: self.relevance_floor,
            low_price_threshold: self.low_price_threshold,
            hybrid: self.hybrid,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.scoring_concurrency
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(4)
            .max(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot with `items` and `events`; demo fixtures when unset
    pub snapshot_path: Option<PathBuf>,
    /// JSON Lines file receiving recorded rankings; kept in memory when unset
    pub ranking_log: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from an optional TOML file, apply `SHELFWISE_*` environment
    /// overrides, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(value) = read("SHELFWISE_LLM_API_KEY") {
            self.llm.api_key = Some(value);
        }
        if let Some(value) = read("SHELFWISE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read("SHELFWISE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read("SHELFWISE_LOG_LEVEL") {
            self.logging.level = value;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_profile(&self.profile)?;
        validate_intent(&self.intent)?;
        validate_ranking(&self.ranking)?;
        validate_llm(&self.llm)?;
        validate_logging(&self.logging)
    }
}

/// Ten years of history.
const MAX_LOOKBACK_DAYS: u32 = 3650;

fn validate_profile(profile: &DecayConfig) -> Result<(), ConfigError> {
    if !profile.lambda.is_finite() || profile.lambda < 0.0 {
        return Err(ConfigError::Validation(
            "profile.lambda must be a non-negative number".to_string(),
        ));
    }
    if profile.lookback_days == 0 || profile.lookback_days > MAX_LOOKBACK_DAYS {
        return Err(ConfigError::Validation(format!(
            "profile.lookback_days must be in range 1..={MAX_LOOKBACK_DAYS}"
        )));
    }
    Ok(())
}

fn validate_intent(intent: &IntentConfig) -> Result<(), ConfigError> {
    if intent.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "intent.timeout_ms must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=2.0).contains(&intent.temperature) {
        return Err(ConfigError::Validation(
            "intent.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }
    Ok(())
}

fn validate_ranking(ranking: &RankingConfig) -> Result<(), ConfigError> {
    if !(0.0..1.0).contains(&ranking.relevance_floor) {
        return Err(ConfigError::Validation(
            "ranking.relevance_floor must be in range 0.0..1.0".to_string(),
        ));
    }
    if ranking.max_limit == 0 {
        return Err(ConfigError::Validation(
            "ranking.max_limit must be at least 1".to_string(),
        ));
    }
    if ranking.default_limit == 0 || ranking.default_limit > ranking.max_limit {
        return Err(ConfigError::Validation(format!(
            "ranking.default_limit must be in range 1..={}",
            ranking.max_limit
        )));
    }
    if ranking.scoring_concurrency == Some(0) {
        return Err(ConfigError::Validation(
            "ranking.scoring_concurrency must be greater than zero".to_string(),
        ));
    }
    let hybrid = &ranking.hybrid;
    let weights = [
        hybrid.intent,
        hybrid.behavior,
        hybrid.collaborative,
        hybrid.content,
        hybrid.popularity,
    ];
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ConfigError::Validation(
            "ranking.hybrid weights must be non-negative numbers".to_string(),
        ));
    }
    Ok(())
}

fn validate_llm(llm: &OpenAiConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "unsupported log level `{other}` (expected trace|debug|info|warn|error)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_is_default() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.ranking.relevance_floor, 0.1);
        assert_eq!(config.profile.lambda, 0.1);
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml(
            r#"
            [profile]
            lambda = 0.05

            [ranking]
            relevance_floor = 0.2
            max_limit = 50

            [ranking.hybrid]
            intent = 0.5
            collaborative = 0.1

            [llm]
            base_url = "http://localhost:11434"
            model = "qwen2.5"

            [store]
            ranking_log = "rankings.jsonl"
            "#,
        )
        .unwrap();

        assert_eq!(config.profile.lambda, 0.05);
        assert_eq!(config.profile.lookback_days, 30);
        assert_eq!(config.ranking.max_limit, 50);
        assert_eq!(config.ranking.default_limit, 10);
        assert_eq!(config.ranking.hybrid.intent, 0.5);
        assert_eq!(config.ranking.hybrid.behavior, 0.3);
        assert_eq!(config.ranking.rerank().hybrid.collaborative, 0.1);
        assert_eq!(config.llm.timeout_secs, 30);
        assert!(config.llm.is_usable());
        assert_eq!(config.store.ranking_log, Some(PathBuf::from("rankings.jsonl")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SHELFWISE_LLM_API_KEY", "sk-test"),
            ("SHELFWISE_LLM_MODEL", "  "),
            ("SHELFWISE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.ranking.relevance_floor = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = EngineConfig::default();
        config.ranking.default_limit = 500;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.profile.lambda = -0.1;
        assert!(config.validate().is_err());

        let config = EngineConfig::from_toml("[profile]\nlookback_days = 4000000000").unwrap();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.profile.lookback_days = 3650;
        assert!(config.validate().is_ok());

        let mut config = EngineConfig::default();
        config.intent.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_concurrency_floor() {
        let ranking = RankingConfig {
            scoring_concurrency: Some(3),
            ..Default::default()
        };
        assert_eq!(ranking.concurrency(), 3);
        assert!(RankingConfig::default().concurrency() >= 1);
    }
}
