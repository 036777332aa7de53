pub mod alerts; // Email + SMS dispatch
pub mod api; // HTTP surface under /api
pub mod config;
pub mod db;
pub mod insights; // Trend + summary over analyzed reports
pub mod models;
pub mod pipeline; // Extraction -> features -> classification
pub mod service;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::alerts::{
    AlertDispatcher, DisabledChannel, EmailSender, HttpEmailSender, NotificationError, SmsSender,
    TwilioSmsSender,
};
use crate::config::{ConfigError, Settings};
use crate::db::{DatabaseError, SqliteStore};
use crate::models::Channel;
use crate::pipeline::classifier::{ClassifierError, RiskClassifier};
use crate::pipeline::features::{FeatureVectorBuilder, ImputationPolicy, InvalidFeatureOrderError};
use crate::pipeline::vitals::VitalExtractor;
use crate::service::ReportAnalyzer;

/// Anything that stops the service from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Classifier failed to load: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Feature schema mismatch: {0}")]
    FeatureOrder(#[from] InvalidFeatureOrderError),

    #[error("Notification channel setup failed: {0}")]
    Notification(#[from] NotificationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Startup task failed: {0}")]
    Task(String),
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Wire the analysis service from settings. Blocking: opens the database,
/// loads the model and builds HTTP clients.
pub fn build_analyzer(settings: &Settings) -> Result<ReportAnalyzer, StartupError> {
    if let Some(parent) = settings.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Arc::new(SqliteStore::open(&settings.db_path)?);
    tracing::info!(path = %settings.db_path.display(), "Database opened");

    let classifier = Arc::new(RiskClassifier::load(
        &settings.model_path,
        &settings.schema_path,
    )?);
    let features =
        FeatureVectorBuilder::for_classifier(&classifier, settings.declared_defaults.clone())?;
    if let ImputationPolicy::DeclaredDefaults(defaults) = features.policy() {
        tracing::warn!(
            ?defaults,
            "Model does not accept missing inputs, unextracted vitals will use declared defaults"
        );
    }

    let email: Arc<dyn EmailSender> = match &settings.email_relay_url {
        Some(url) => Arc::new(HttpEmailSender::new(
            url,
            settings.email_relay_token.clone(),
            &settings.email_from,
            settings.notification_timeout_secs,
        )?),
        None => {
            tracing::warn!("No email relay configured, email alerts disabled");
            Arc::new(DisabledChannel(Channel::Email))
        }
    };
    let sms: Arc<dyn SmsSender> = match settings.twilio() {
        Some((sid, token, from)) => Arc::new(TwilioSmsSender::new(
            sid,
            token,
            from,
            settings.notification_timeout_secs,
        )?),
        None => {
            tracing::warn!("Twilio credentials incomplete, SMS alerts disabled");
            Arc::new(DisabledChannel(Channel::Sms))
        }
    };

    Ok(ReportAnalyzer::new(
        store.clone(),
        store,
        VitalExtractor::new(),
        features,
        classifier,
        AlertDispatcher::new(email, sms, settings.alert_threshold),
    ))
}

/// Start the service and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = Settings::from_env()?;
    let bind_addr = settings.bind_addr;

    let analyzer = tokio::task::spawn_blocking(move || build_analyzer(&settings))
        .await
        .map_err(|e| StartupError::Task(e.to_string()))??;

    let mut server = api::start_api_server(Arc::new(analyzer), bind_addr).await?;

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    server.stopped().await;
    Ok(())
}
