use serde::Deserialize;
use std::fs;

use crate::domain::TariffClass;
use crate::pipeline::AnalysisError;

/// Tariff quantities used by the cost stage. Every field is required:
/// a config file missing one fails at load rather than silently defaulting.
/// Rates are per consumed unit; fees and the rebate are fixed annual amounts
/// prorated on a 365-day basis.
#[derive(Debug, Clone, Deserialize)]
pub struct TariffConfig {
    pub unit_rate_low: f64,
    pub unit_rate_high: f64,
    pub unit_rate_gas: f64,
    pub delivery_fee: f64,
    pub electricity_network_fee: f64,
    pub gas_network_fee: f64,
    /// Annual energy-tax reduction, subtracted once from the grand total.
    pub rebate: f64,
}

impl TariffConfig {
    pub fn unit_rate(&self, class: TariffClass) -> f64 {
        match class {
            TariffClass::ElectricityLow => self.unit_rate_low,
            TariffClass::ElectricityHigh => self.unit_rate_high,
            TariffClass::Gas => self.unit_rate_gas,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadingsConfig {
    pub path: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ';'
}

impl ReadingsConfig {
    /// The delimiter as the byte the CSV reader wants; lossless because
    /// config validation rejects non-ASCII delimiters.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Ndjson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub readings: ReadingsConfig,
    pub tariffs: TariffConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, AnalysisError> {
        use std::env;

        let path =
            env::var("USAGE_ANALYSER_CONFIG").unwrap_or_else(|_| "usage-config.toml".to_string());
        let contents = fs::read_to_string(&path).map_err(|e| {
            AnalysisError::Configuration(format!("failed to read config '{path}': {e}"))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, AnalysisError> {
        let cfg: AppConfig = toml::from_str(contents)
            .map_err(|e| AnalysisError::Configuration(e.to_string()))?;
        if !cfg.readings.delimiter.is_ascii() {
            return Err(AnalysisError::Configuration(format!(
                "readings.delimiter '{}' is not a single ASCII character",
                cfg.readings.delimiter
            )));
        }
        Ok(cfg)
    }
}
