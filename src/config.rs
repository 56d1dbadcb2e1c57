use axum::http::HeaderName;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::error::{NaasError, Result};
use crate::rate_limiter::RateLimitPolicy;

#[derive(Debug, Clone, Parser, Validate)]
#[command(name = "naas", version, about = "No-as-a-Service: random rejection reasons over HTTP")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "NAAS_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// Directory holding one `<lang>.txt` file per language
    #[arg(long, env = "NAAS_REASONS_DIR", default_value = "reasons")]
    pub reasons_dir: PathBuf,

    /// Requests admitted per client and window
    #[arg(long, env = "NAAS_PERMIT_LIMIT", default_value_t = 120)]
    #[validate(range(min = 1))]
    pub permit_limit: u32,

    /// Window length, e.g. `1m`, `30s`
    #[arg(long, env = "NAAS_WINDOW", default_value = "1m", value_parser = parse_duration)]
    #[validate(custom(function = "validate_window"))]
    pub window: Duration,

    /// Header carrying the client IP set by a trusted proxy, e.g.
    /// `CF-Connecting-IP`. Unset means the header is never trusted.
    #[arg(long, env = "NAAS_TRUSTED_HEADER")]
    pub trusted_header: Option<HeaderName>,

    /// Interval for dropping expired limiter entries. Unset disables it.
    #[arg(long, env = "NAAS_SWEEP_INTERVAL", value_parser = parse_duration)]
    pub sweep_interval: Option<Duration>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "NAAS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Parse configuration from the command line and environment.
    ///
    /// Exits the process on `--help`, `--version` or unparsable flags.
    pub fn from_env() -> Result<Self> {
        let config = Config::parse();
        config.check()?;
        Ok(config)
    }

    /// Validate field constraints.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| NaasError::Configuration(e.to_string()))?;
        if self.sweep_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(NaasError::Configuration(
                "Sweep interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The limiter policy described by this configuration.
    pub fn rate_limit_policy(&self) -> Result<RateLimitPolicy> {
        RateLimitPolicy::new(self.permit_limit, self.window)
    }
}

impl Default for Config {
    fn default() -> Self {
        let policy = RateLimitPolicy::default();
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            reasons_dir: PathBuf::from("reasons"),
            permit_limit: policy.permit_limit(),
            window: policy.window(),
            trusted_header: None,
            sweep_interval: None,
            log_level: "info".to_string(),
        }
    }
}

fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

fn validate_window(window: &Duration) -> std::result::Result<(), ValidationError> {
    if window.is_zero() {
        return Err(ValidationError::new("zero_duration"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["naas"]).unwrap();
        assert_eq!(config.permit_limit, 120);
        assert_eq!(config.window, Duration::from_secs(60));
        assert!(config.trusted_header.is_none());
        assert!(config.sweep_interval.is_none());
        assert_eq!(config.rate_limit_policy().unwrap(), RateLimitPolicy::default());
    }

    #[test]
    fn test_parse_flags() {
        let config = Config::try_parse_from([
            "naas",
            "--permit-limit",
            "3",
            "--window",
            "30s",
            "--trusted-header",
            "CF-Connecting-IP",
            "--sweep-interval",
            "5m",
        ])
        .unwrap();

        assert_eq!(config.permit_limit, 3);
        assert_eq!(config.window, Duration::from_secs(30));
        assert_eq!(
            config.trusted_header,
            Some(HeaderName::from_static("cf-connecting-ip"))
        );
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(300)));
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_zero_permit_limit_fails() {
        let config = Config::try_parse_from(["naas", "--permit-limit", "0"]).unwrap();
        assert!(matches!(config.check(), Err(NaasError::Configuration(_))));
        assert!(config.rate_limit_policy().is_err());
    }

    #[test]
    fn test_zero_window_fails() {
        let config = Config::try_parse_from(["naas", "--window", "0s"]).unwrap();
        assert!(config.check().is_err());
    }

    #[test]
    fn test_zero_sweep_interval_fails() {
        let config = Config::try_parse_from(["naas", "--sweep-interval", "0s"]).unwrap();
        assert!(config.check().is_err());
    }

    #[test]
    fn test_invalid_window_rejected_by_parser() {
        assert!(Config::try_parse_from(["naas", "--window", "soon"]).is_err());
    }
}
