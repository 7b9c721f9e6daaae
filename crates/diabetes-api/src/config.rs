//! Service configuration

use anyhow::{Context, Result};
use model_lib::RetryPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Predictor service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Directory holding the model and metadata artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Address to bind the HTTP server to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Overrides the decision threshold recorded in the metadata
    #[serde(default)]
    pub decision_threshold: Option<f64>,

    /// Artifact read attempts before giving up
    #[serde(default = "default_load_attempts")]
    pub load_attempts: u32,

    /// Backoff between artifact read attempts in milliseconds
    #[serde(default = "default_load_backoff_ms")]
    pub load_backoff_ms: u64,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_load_attempts() -> u32 {
    3
}

fn default_load_backoff_ms() -> u64 {
    200
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            host: default_host(),
            port: default_port(),
            decision_threshold: None,
            load_attempts: default_load_attempts(),
            load_backoff_ms: default_load_backoff_ms(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional `predictor.toml` and `PREDICTOR_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("predictor").required(false))
            .add_source(config::Environment::with_prefix("PREDICTOR"))
            .build()
            .context("Failed to read configuration")?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        let parsed: Self = config.try_deserialize().context("Invalid configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if let Some(t) = self.decision_threshold {
            if !(0.0..=1.0).contains(&t) {
                anyhow::bail!("decision_threshold {} must be within [0, 1]", t);
            }
        }
        if self.load_attempts == 0 {
            anyhow::bail!("load_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.load_attempts,
            backoff: Duration::from_millis(self.load_backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = config::Config::builder().build().unwrap();
        let parsed = ServiceConfig::from_config(config).unwrap();
        assert_eq!(parsed.port, 8000);
        assert_eq!(parsed.artifact_dir, PathBuf::from("artifacts"));
        assert_eq!(parsed.decision_threshold, None);
        assert_eq!(parsed.bind_addr(), "0.0.0.0:8000");
        assert_eq!(parsed.retry_policy().attempts, 3);
    }

    #[test]
    fn test_overrides_apply() {
        let config = config::Config::builder()
            .set_override("port", 9090)
            .unwrap()
            .set_override("artifact_dir", "/models")
            .unwrap()
            .set_override("decision_threshold", 0.4)
            .unwrap()
            .build()
            .unwrap();
        let parsed = ServiceConfig::from_config(config).unwrap();
        assert_eq!(parsed.port, 9090);
        assert_eq!(parsed.artifact_dir, PathBuf::from("/models"));
        assert_eq!(parsed.decision_threshold, Some(0.4));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = config::Config::builder()
            .set_override("decision_threshold", 1.5)
            .unwrap()
            .build()
            .unwrap();
        assert!(ServiceConfig::from_config(config).is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = config::Config::builder()
            .set_override("load_attempts", 0)
            .unwrap()
            .build()
            .unwrap();
        assert!(ServiceConfig::from_config(config).is_err());
    }
}
