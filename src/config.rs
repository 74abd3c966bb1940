use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub general: General,
    pub data_api: DataAPI,
    pub analysis: Analysis,
}

#[derive(Debug, Deserialize)]
pub struct General {
    pub data_source: String,
    pub data_file: String,
}

#[derive(Debug, Deserialize)]
pub struct Analysis {
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default = "default_correlation_threshold")]
    pub correlation_threshold: f64,
    // Raw allocation per ticker, same order as data_api.tickers. Renormalized
    // before reaching the engine; equal weights when omitted.
    pub weights: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct DataAPI {
    pub source: String,
    pub api_key: String,
    pub tickers: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub timeframe: String,
}

fn default_risk_free_rate() -> f64 {
    0.02
}

fn default_correlation_threshold() -> f64 {
    0.7
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let s = Config::builder()
            .add_source(File::with_name("config"))
            // Retrieve the api key from .env
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}
