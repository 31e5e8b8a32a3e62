use crate::services::plan_analyzer::analyzer::MetricKind;
use crate::services::plan_analyzer::models::constants::DEFAULT_ESTIMATION_THRESHOLD;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Factor outside of which `actualRows / planRows` counts as a misestimate
    pub estimation_threshold: f64,
    /// Metric used when none is given on the command line ("time" or "cost")
    pub default_metric: String,
}

impl Config {
    /// Load configuration with environment variable override support
    ///
    /// Loading order:
    /// 1. Load from config.toml file
    /// 2. Override with environment variables (prefixed with APP_)
    /// 3. Validate the final configuration
    pub fn load() -> Result<Self, anyhow::Error> {
        // 1. Load from config file
        let mut config = if let Some(config_path) = Self::find_config_file() {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        // 2. Override with environment variables
        config.apply_env_overrides();

        // 3. Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,pg_plan_viz=debug")
    /// - APP_LOG_FILE: Log file path; empty disables file logging
    /// - APP_ESTIMATION_THRESHOLD: Misestimate factor (e.g., "2.5")
    /// - APP_DEFAULT_METRIC: Default critical path metric ("time" or "cost")
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Some(file) = lookup("APP_LOG_FILE") {
            self.logging.file = (!file.is_empty()).then_some(file);
            tracing::info!("Override logging.file from env: {:?}", self.logging.file);
        }

        if let Some(threshold) = lookup("APP_ESTIMATION_THRESHOLD") {
            match threshold.parse::<f64>() {
                Ok(val) => {
                    self.analysis.estimation_threshold = val;
                    tracing::info!(
                        "Override analysis.estimation_threshold from env: {}",
                        self.analysis.estimation_threshold
                    );
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_ESTIMATION_THRESHOLD='{}': {}. Keep {}",
                    threshold,
                    e,
                    self.analysis.estimation_threshold
                ),
            }
        }

        if let Some(metric) = lookup("APP_DEFAULT_METRIC") {
            match metric.parse::<MetricKind>() {
                Ok(MetricKind::Custom) | Err(_) => tracing::warn!(
                    "Invalid APP_DEFAULT_METRIC='{}'. Keep {}",
                    metric,
                    self.analysis.default_metric
                ),
                Ok(kind) => {
                    self.analysis.default_metric = kind.to_string();
                    tracing::info!(
                        "Override analysis.default_metric from env: {}",
                        self.analysis.default_metric
                    );
                },
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), anyhow::Error> {
        let threshold = self.analysis.estimation_threshold;
        if !threshold.is_finite() || threshold < 1.0 {
            anyhow::bail!(
                "analysis.estimation_threshold must be a finite number >= 1.0, got {}",
                threshold
            );
        }

        // A config file cannot supply a custom extractor
        match self.analysis.default_metric.parse::<MetricKind>() {
            Ok(MetricKind::Time) | Ok(MetricKind::Cost) => {},
            _ => anyhow::bail!(
                "analysis.default_metric must be \"time\" or \"cost\", got \"{}\"",
                self.analysis.default_metric
            ),
        }

        if self.logging.level.trim().is_empty() {
            anyhow::bail!("logging.level cannot be empty");
        }

        Ok(())
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    /// Load configuration from TOML file
    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn from_toml_str(content: &str) -> Result<Self, anyhow::Error> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,pg_plan_viz=debug".to_string(), file: None }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            estimation_threshold: DEFAULT_ESTIMATION_THRESHOLD,
            default_metric: MetricKind::Time.to_string(),
        }
    }
}
