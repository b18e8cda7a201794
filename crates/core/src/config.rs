use crate::types::ChartKind;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `MARKETING_ANALYZER__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub charts: ChartConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// What the loader does with a row that fails type coercion or a record
/// invariant. Applied uniformly for the whole load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRowPolicy {
    /// Drop the row, log a warning and count it as rejected.
    #[default]
    Skip,
    /// Fail the whole load on the first invalid row.
    Abort,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub invalid_rows: InvalidRowPolicy,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_row_count")]
    pub row_count: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_campaign_count")]
    pub campaign_count: usize,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_width")]
    pub width: u32,
    #[serde(default = "default_chart_height")]
    pub height: u32,
    /// Maximum number of group keys drawn on a single chart.
    #[serde(default = "default_chart_top_n")]
    pub top_n: usize,
    #[serde(default = "default_chart_kinds")]
    pub kinds: Vec<ChartKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_save_simulated_data")]
    pub save_simulated_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_top_n")]
    pub top_n: usize,
}

// Default functions
fn default_delimiter() -> char {
    ','
}
fn default_row_count() -> usize {
    6000
}
fn default_seed() -> u64 {
    42
}
fn default_campaign_count() -> usize {
    100
}
fn default_window_days() -> u32 {
    30
}
fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}
fn default_chart_width() -> u32 {
    1600
}
fn default_chart_height() -> u32 {
    900
}
fn default_chart_top_n() -> usize {
    15
}
fn default_chart_kinds() -> Vec<ChartKind> {
    ChartKind::ALL.to_vec()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_save_simulated_data() -> bool {
    true
}
fn default_report_top_n() -> usize {
    3
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            invalid_rows: InvalidRowPolicy::default(),
            delimiter: default_delimiter(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            row_count: default_row_count(),
            seed: default_seed(),
            campaign_count: default_campaign_count(),
            window_days: default_window_days(),
            start_date: default_start_date(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_chart_width(),
            height: default_chart_height(),
            top_n: default_chart_top_n(),
            kinds: default_chart_kinds(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            save_simulated_data: default_save_simulated_data(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_report_top_n(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional config file, then environment
    /// variables (which take precedence).
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("MARKETING_ANALYZER")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("charts.kinds"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        tracing::debug!(
            file = ?file,
            output_dir = %config.output.dir.display(),
            "Configuration sources merged"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.loader.invalid_rows, InvalidRowPolicy::Skip);
        assert_eq!(config.loader.delimiter, ',');
        assert_eq!(config.simulator.row_count, 6000);
        assert_eq!(config.simulator.seed, 42);
        assert_eq!(
            config.simulator.start_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(config.charts.kinds.len(), 3);
        assert_eq!(config.output.dir, PathBuf::from("output"));
        assert_eq!(config.report.top_n, 3);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[loader]
invalid_rows = "abort"

[simulator]
row_count = 250
seed = 7

[charts]
kinds = ["time-series"]
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.loader.invalid_rows, InvalidRowPolicy::Abort);
        assert_eq!(config.simulator.row_count, 250);
        assert_eq!(config.simulator.seed, 7);
        assert_eq!(config.simulator.window_days, 30);
        assert_eq!(config.charts.kinds, vec![ChartKind::TimeSeries]);
        assert_eq!(config.charts.top_n, 15);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/analyzer.toml")));
        assert!(result.is_err());
    }
}
