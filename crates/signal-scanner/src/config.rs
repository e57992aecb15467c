use analysis_core::{DecisionConfig, EngineConfig};
use analysis_orchestrator::ScreenerOptions;
use anyhow::{Context, Result};
use exchange_client::{ExchangeClientConfig, RetryPolicy, DEFAULT_BASE_URL};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Longest history window accepted, roughly a century.
const MAX_LOOKBACK_DAYS: i64 = 36_500;

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    // Retrieval
    pub base_url: String,
    pub lookback_days: i64,
    pub history_page_size: usize,
    pub fetch_max_attempts: u32,
    pub fetch_backoff_ms: u64,
    pub request_timeout_secs: u64,

    // Scan
    pub concurrency: usize,
    pub symbols: Option<Vec<String>>,

    // Decision thresholds
    pub sentiment_threshold: f64,
    pub pressure_deadband: f64,

    // Output
    pub output_dir: PathBuf,
    pub abbreviate_labels: bool,
    pub dry_run: bool,
}

impl ScannerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            base_url: var("EXCHANGE_BASE_URL", DEFAULT_BASE_URL),
            lookback_days: var("LOOKBACK_DAYS", "365")
                .parse()
                .context("LOOKBACK_DAYS must be a whole number of days")?,
            history_page_size: var("HISTORY_PAGE_SIZE", "500")
                .parse()
                .context("HISTORY_PAGE_SIZE must be a positive integer")?,
            fetch_max_attempts: var("FETCH_MAX_ATTEMPTS", "5")
                .parse()
                .context("FETCH_MAX_ATTEMPTS must be a positive integer")?,
            fetch_backoff_ms: var("FETCH_BACKOFF_MS", "1000")
                .parse()
                .context("FETCH_BACKOFF_MS must be milliseconds")?,
            request_timeout_secs: var("REQUEST_TIMEOUT_SECS", "30")
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be seconds")?,
            concurrency: var("SCAN_CONCURRENCY", "10")
                .parse()
                .context("SCAN_CONCURRENCY must be a positive integer")?,
            symbols: None,
            sentiment_threshold: var("SENTIMENT_THRESHOLD", "0.05")
                .parse()
                .context("SENTIMENT_THRESHOLD must be a number")?,
            pressure_deadband: var("PRESSURE_DEADBAND", "0.0")
                .parse()
                .context("PRESSURE_DEADBAND must be a number")?,
            output_dir: PathBuf::from(var("OUTPUT_DIR", "output")),
            abbreviate_labels: var("ABBREVIATE_LABELS", "false")
                .parse()
                .context("ABBREVIATE_LABELS must be true or false")?,
            dry_run: false,
        };

        config.validate()?;
        Ok(config)
    }

    /// Command-line flags override the environment.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        if let Some(value) = flag_value(args, "--concurrency")? {
            self.concurrency = value
                .parse()
                .with_context(|| format!("invalid --concurrency '{}'", value))?;
        }
        if let Some(value) = flag_value(args, "--output")? {
            self.output_dir = PathBuf::from(value);
        }
        if let Some(idx) = args.iter().position(|a| a == "--symbols") {
            let symbols: Vec<String> = args[idx + 1..]
                .iter()
                .take_while(|a| !a.starts_with("--"))
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            anyhow::ensure!(!symbols.is_empty(), "--symbols needs at least one symbol");
            self.symbols = Some(symbols);
        }
        if args.iter().any(|a| a == "--dry-run") {
            self.dry_run = true;
        }
        if args.iter().any(|a| a == "--short-labels") {
            self.abbreviate_labels = true;
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.concurrency > 0, "concurrency must be at least 1");
        anyhow::ensure!(
            (1..=MAX_LOOKBACK_DAYS).contains(&self.lookback_days),
            "lookback must be between 1 and {} days",
            MAX_LOOKBACK_DAYS
        );
        anyhow::ensure!(self.history_page_size > 0, "history page size must be at least 1");
        anyhow::ensure!(self.fetch_max_attempts > 0, "at least one fetch attempt is required");
        anyhow::ensure!(
            self.sentiment_threshold >= 0.0 && self.pressure_deadband >= 0.0,
            "thresholds must not be negative"
        );
        Ok(())
    }

    pub fn client_config(&self) -> ExchangeClientConfig {
        ExchangeClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            page_size: self.history_page_size,
            retry: RetryPolicy::new(
                self.fetch_max_attempts,
                Duration::from_millis(self.fetch_backoff_ms),
            ),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            decision: DecisionConfig {
                sentiment_threshold: self.sentiment_threshold,
                pressure_deadband: self.pressure_deadband,
            },
            ..EngineConfig::default()
        }
    }

    pub fn screener_options(&self) -> ScreenerOptions {
        ScreenerOptions {
            concurrency: self.concurrency,
            lookback_days: self.lookback_days,
            symbols: self.symbols.clone(),
        }
    }
}

/// Value following `flag`, if the flag is present. A flag with nothing
/// after it, or followed by another flag, is an error.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    let Some(idx) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let value = args.get(idx + 1).map(|s| s.as_str());
    match value {
        Some(v) if !v.starts_with("--") => Ok(Some(v)),
        _ => anyhow::bail!("{} needs a value", flag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ScannerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScannerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.lookback_days, 365);
        assert_eq!(config.history_page_size, 500);
        assert_eq!(config.sentiment_threshold, 0.05);
        assert_eq!(config.pressure_deadband, 0.0);
        assert!(!config.abbreviate_labels);
        assert!(!config.dry_run);
        assert!(config.symbols.is_none());
    }

    #[test]
    fn test_environment_values() {
        let config = config_from(&[
            ("SCAN_CONCURRENCY", "4"),
            ("PRESSURE_DEADBAND", "100000"),
            ("ABBREVIATE_LABELS", "true"),
            ("FETCH_BACKOFF_MS", "250"),
            ("OUTPUT_DIR", "/tmp/signals"),
        ])
        .unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.engine_config().decision.pressure_deadband, 100000.0);
        assert!(config.abbreviate_labels);
        assert_eq!(config.client_config().retry.initial_backoff, Duration::from_millis(250));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/signals"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("SCAN_CONCURRENCY", "many")]).is_err());
        assert!(config_from(&[("SCAN_CONCURRENCY", "0")]).is_err());
        assert!(config_from(&[("SENTIMENT_THRESHOLD", "-0.1")]).is_err());
        assert!(config_from(&[("ABBREVIATE_LABELS", "yes please")]).is_err());
        assert!(config_from(&[("LOOKBACK_DAYS", "0")]).is_err());
        assert!(config_from(&[("LOOKBACK_DAYS", "100000000")]).is_err());
        assert_eq!(
            config_from(&[("LOOKBACK_DAYS", "36500")]).unwrap().lookback_days,
            36_500
        );
    }

    #[test]
    fn test_flags_override_environment() {
        let mut config = config_from(&[("SCAN_CONCURRENCY", "4")]).unwrap();
        config
            .apply_args(&args(&[
                "signal-scanner",
                "--symbols",
                "nabil",
                "HDL",
                "--concurrency",
                "2",
                "--dry-run",
                "--short-labels",
                "--output",
                "reports",
            ]))
            .unwrap();

        assert_eq!(config.concurrency, 2);
        assert_eq!(config.symbols, Some(vec!["NABIL".to_string(), "HDL".to_string()]));
        assert!(config.dry_run);
        assert!(config.abbreviate_labels);
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert_eq!(config.screener_options().symbols.map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_bad_flags_are_rejected() {
        let mut config = config_from(&[]).unwrap();
        assert!(config.apply_args(&args(&["x", "--concurrency", "lots"])).is_err());

        let mut config = config_from(&[]).unwrap();
        assert!(config.apply_args(&args(&["x", "--symbols", "--dry-run"])).is_err());

        let mut config = config_from(&[]).unwrap();
        assert!(config.apply_args(&args(&["x", "--output", "--dry-run"])).is_err());
        assert_eq!(config.output_dir, PathBuf::from("output"));

        let mut config = config_from(&[]).unwrap();
        assert!(config.apply_args(&args(&["x", "--dry-run", "--concurrency"])).is_err());
        assert!(config.apply_args(&args(&["x", "--output"])).is_err());
    }
}
