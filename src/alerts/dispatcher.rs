//! Alert dispatch for one classification result.
//!
//! Email and SMS are sent concurrently and independently; a channel that
//! fails or panics only affects its own outcome. Nothing here returns an
//! error: outcomes are logged and reported back for inspection.

use std::sync::Arc;
use std::thread::ScopedJoinHandle;

use serde::Serialize;

use super::channels::{EmailSender, SmsSender};
use super::messages;
use crate::models::{Channel, PatientContact, ReportRecord, RiskLevel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Delivered,
    Failed(String),
    /// Channel was due but had no address to send to.
    Skipped(String),
    /// Risk level below the alert threshold.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub email: ChannelOutcome,
    pub sms: ChannelOutcome,
}

impl DispatchOutcome {
    pub fn not_attempted() -> Self {
        Self {
            email: ChannelOutcome::NotAttempted,
            sms: ChannelOutcome::NotAttempted,
        }
    }

    pub fn attempted(&self) -> bool {
        self.email != ChannelOutcome::NotAttempted || self.sms != ChannelOutcome::NotAttempted
    }
}

pub struct AlertDispatcher {
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
    threshold: RiskLevel,
}

impl AlertDispatcher {
    pub fn new(email: Arc<dyn EmailSender>, sms: Arc<dyn SmsSender>, threshold: RiskLevel) -> Self {
        Self {
            email,
            sms,
            threshold,
        }
    }

    pub fn threshold(&self) -> RiskLevel {
        self.threshold
    }

    pub fn should_alert(&self, level: RiskLevel) -> bool {
        level.reaches(self.threshold)
    }

    /// Notify the patient of `report` if `level` reaches the threshold.
    ///
    /// The email address comes from `contact`, falling back to the patient id
    /// when it is itself an email address. The phone number only comes from
    /// `contact`.
    pub fn dispatch(
        &self,
        report: &ReportRecord,
        level: RiskLevel,
        contact: Option<&PatientContact>,
    ) -> DispatchOutcome {
        if !self.should_alert(level) {
            return DispatchOutcome::not_attempted();
        }

        let email_to = contact
            .and_then(PatientContact::email)
            .map(str::to_string)
            .or_else(|| report.patient_id.contains('@').then(|| report.patient_id.clone()));
        let sms_to = contact.and_then(PatientContact::phone).map(str::to_string);

        let outcome = std::thread::scope(|s| {
            let email = s.spawn(|| self.send_email(report, level, email_to.as_deref()));
            let sms = s.spawn(|| self.send_sms(report, level, sms_to.as_deref()));
            DispatchOutcome {
                email: join_channel(email, Channel::Email),
                sms: join_channel(sms, Channel::Sms),
            }
        });

        tracing::info!(
            report_id = %report.id,
            patient_id = %report.patient_id,
            level = %level,
            email = ?outcome.email,
            sms = ?outcome.sms,
            "Alert dispatched"
        );
        outcome
    }

    fn send_email(&self, report: &ReportRecord, level: RiskLevel, to: Option<&str>) -> ChannelOutcome {
        let Some(to) = to else {
            tracing::warn!(patient_id = %report.patient_id, "No email address on file, email alert skipped");
            return ChannelOutcome::Skipped("no email address".into());
        };
        let subject = messages::email_subject(level);
        let body = messages::email_body(report, level);
        match self.email.send_email(to, &subject, &body) {
            Ok(()) => ChannelOutcome::Delivered,
            Err(e) => {
                tracing::error!(report_id = %report.id, error = %e, "Email alert failed");
                ChannelOutcome::Failed(e.to_string())
            }
        }
    }

    fn send_sms(&self, report: &ReportRecord, level: RiskLevel, to: Option<&str>) -> ChannelOutcome {
        let Some(to) = to else {
            tracing::warn!(patient_id = %report.patient_id, "No phone number on file, SMS alert skipped");
            return ChannelOutcome::Skipped("no phone number".into());
        };
        match self.sms.send_sms(to, &messages::sms_body(level)) {
            Ok(()) => ChannelOutcome::Delivered,
            Err(e) => {
                tracing::error!(report_id = %report.id, error = %e, "SMS alert failed");
                ChannelOutcome::Failed(e.to_string())
            }
        }
    }
}

fn join_channel(handle: ScopedJoinHandle<'_, ChannelOutcome>, channel: Channel) -> ChannelOutcome {
    handle.join().unwrap_or_else(|_| {
        tracing::error!(channel = channel.as_str(), "Notification sender panicked");
        ChannelOutcome::Failed(format!("{} sender panicked", channel.as_str()))
    })
}
