use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::models::RiskLevel;
use crate::pipeline::features::DeclaredDefaults;

/// Application-level constants
pub const APP_NAME: &str = "Riskwatch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "RISKWATCH_";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8470";
pub const DEFAULT_NOTIFICATION_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,riskwatch=debug,tower_http=info"
}

/// Get the application data directory: ~/Riskwatch/
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

/// Runtime settings. Every field has a default and a `RISKWATCH_*` override.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    pub schema_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Lowest risk level that triggers patient alerts.
    pub alert_threshold: RiskLevel,
    pub notification_timeout_secs: u64,
    pub email_relay_url: Option<String>,
    pub email_relay_token: Option<String>,
    pub email_from: String,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from: Option<String>,
    /// Used only when the model cannot take missing inputs.
    pub declared_defaults: DeclaredDefaults,
}

impl Settings {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let models = data_dir.join("models");
        Self {
            db_path: data_dir.join("riskwatch.db"),
            model_path: models.join("health_risk_forest.json"),
            schema_path: models.join("health_risk.arff"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8470)),
            alert_threshold: RiskLevel::High,
            notification_timeout_secs: DEFAULT_NOTIFICATION_TIMEOUT_SECS,
            email_relay_url: None,
            email_relay_token: None,
            email_from: "alerts@riskwatch.local".to_string(),
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_from: None,
            declared_defaults: DeclaredDefaults::placeholder(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Keys are full variable
    /// names, e.g. `RISKWATCH_DB_PATH`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_dir = match get("DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => app_data_dir()?,
        };
        let mut s = Self::with_data_dir(data_dir);

        if let Some(v) = get("DB_PATH") {
            s.db_path = v.into();
        }
        if let Some(v) = get("MODEL_PATH") {
            s.model_path = v.into();
        }
        if let Some(v) = get("SCHEMA_PATH") {
            s.schema_path = v.into();
        }
        if let Some(v) = get("BIND_ADDR") {
            s.bind_addr = parse_value("BIND_ADDR", &v)?;
        }
        if let Some(v) = get("ALERT_THRESHOLD") {
            s.alert_threshold = parse_value("ALERT_THRESHOLD", &v)?;
        }
        if let Some(v) = get("NOTIFICATION_TIMEOUT_SECS") {
            s.notification_timeout_secs = parse_value("NOTIFICATION_TIMEOUT_SECS", &v)?;
        }
        s.email_relay_url = get("EMAIL_RELAY_URL");
        s.email_relay_token = get("EMAIL_RELAY_TOKEN");
        if let Some(v) = get("EMAIL_FROM") {
            s.email_from = v;
        }
        s.twilio_account_sid = get("TWILIO_ACCOUNT_SID");
        s.twilio_auth_token = get("TWILIO_AUTH_TOKEN");
        s.twilio_from = get("TWILIO_FROM");

        let d = &mut s.declared_defaults;
        for (name, slot) in [
            ("DEFAULT_BLOOD_SUGAR", &mut d.blood_sugar),
            ("DEFAULT_BLOOD_PRESSURE", &mut d.blood_pressure),
            ("DEFAULT_PULSE_RATE", &mut d.pulse_rate),
            ("DEFAULT_CHOLESTEROL", &mut d.cholesterol),
            ("DEFAULT_ECG_SCORE", &mut d.ecg_score),
        ] {
            if let Some(v) = get(name) {
                *slot = parse_value(name, &v)?;
            }
        }

        Ok(s)
    }

    /// Twilio credentials, when all three are present.
    pub fn twilio(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.twilio_account_sid.as_deref()?,
            self.twilio_auth_token.as_deref()?,
            self.twilio_from.as_deref()?,
        ))
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir().unwrap();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Riskwatch"));
    }

    #[test]
    fn defaults_without_overrides() {
        let s = Settings::from_lookup(lookup(&[("RISKWATCH_DATA_DIR", "/srv/rw")])).unwrap();
        assert_eq!(s.db_path, PathBuf::from("/srv/rw/riskwatch.db"));
        assert_eq!(s.model_path, PathBuf::from("/srv/rw/models/health_risk_forest.json"));
        assert_eq!(s.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(s.alert_threshold, RiskLevel::High);
        assert_eq!(s.declared_defaults, DeclaredDefaults::placeholder());
        assert!(s.twilio().is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let s = Settings::from_lookup(lookup(&[
            ("RISKWATCH_DATA_DIR", "/srv/rw"),
            ("RISKWATCH_DB_PATH", "/tmp/x.db"),
            ("RISKWATCH_BIND_ADDR", "0.0.0.0:9000"),
            ("RISKWATCH_ALERT_THRESHOLD", "critical"),
            ("RISKWATCH_NOTIFICATION_TIMEOUT_SECS", "3"),
            ("RISKWATCH_TWILIO_ACCOUNT_SID", "AC1"),
            ("RISKWATCH_TWILIO_AUTH_TOKEN", "tok"),
            ("RISKWATCH_TWILIO_FROM", "+15550000000"),
            ("RISKWATCH_DEFAULT_PULSE_RATE", "72"),
        ]))
        .unwrap();
        assert_eq!(s.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(s.bind_addr.port(), 9000);
        assert_eq!(s.alert_threshold, RiskLevel::Critical);
        assert_eq!(s.notification_timeout_secs, 3);
        assert_eq!(s.twilio(), Some(("AC1", "tok", "+15550000000")));
        assert_eq!(s.declared_defaults.pulse_rate, 72.0);
        assert_eq!(s.declared_defaults.cholesterol, 190.0);
    }

    #[test]
    fn blank_values_are_ignored() {
        let s = Settings::from_lookup(lookup(&[
            ("RISKWATCH_DATA_DIR", "/srv/rw"),
            ("RISKWATCH_EMAIL_RELAY_URL", "  "),
        ]))
        .unwrap();
        assert!(s.email_relay_url.is_none());
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let err = Settings::from_lookup(lookup(&[
            ("RISKWATCH_DATA_DIR", "/srv/rw"),
            ("RISKWATCH_ALERT_THRESHOLD", "severe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "RISKWATCH_ALERT_THRESHOLD"));
    }

    #[test]
    fn invalid_number_is_rejected() {
        assert!(Settings::from_lookup(lookup(&[
            ("RISKWATCH_DATA_DIR", "/srv/rw"),
            ("RISKWATCH_DEFAULT_ECG_SCORE", "high"),
        ]))
        .is_err());
    }

    #[test]
    fn app_name_is_riskwatch() {
        assert_eq!(APP_NAME, "Riskwatch");
    }
}
