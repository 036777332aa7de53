//! Notification channels.
//!
//! Both HTTP senders use a blocking client with a request timeout, so a slow
//! provider is bounded. The dispatcher runs them on scoped threads.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use super::NotificationError;
use crate::models::Channel;

pub trait EmailSender: Send + Sync {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError>;
}

pub trait SmsSender: Send + Sync {
    fn send_sms(&self, to: &str, body: &str) -> Result<(), NotificationError>;
}

fn build_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, NotificationError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NotificationError::HttpClient(e.to_string()))
}

fn map_send_error(e: reqwest::Error, target: &str, timeout_secs: u64) -> NotificationError {
    if e.is_connect() {
        NotificationError::Connection(target.to_string())
    } else if e.is_timeout() {
        NotificationError::Timeout(timeout_secs)
    } else {
        NotificationError::HttpClient(e.to_string())
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<(), NotificationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().unwrap_or_default();
    Err(NotificationError::Rejected {
        status: status.as_u16(),
        body,
    })
}

// ═══════════════════════════════════════════════════════════
// Email relay
// ═══════════════════════════════════════════════════════════

/// Posts messages as JSON to an HTTP mail relay.
pub struct HttpEmailSender {
    relay_url: String,
    api_token: Option<String>,
    from: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpEmailSender {
    pub fn new(
        relay_url: &str,
        api_token: Option<String>,
        from: &str,
        timeout_secs: u64,
    ) -> Result<Self, NotificationError> {
        Ok(Self {
            relay_url: relay_url.trim_end_matches('/').to_string(),
            api_token,
            from: from.to_string(),
            client: build_client(timeout_secs)?,
            timeout_secs,
        })
    }
}

impl EmailSender for HttpEmailSender {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        let mut request = self.client.post(&self.relay_url).json(&RelayMessage {
            from: &self.from,
            to,
            subject,
            text: body,
        });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|e| map_send_error(e, &self.relay_url, self.timeout_secs))?;
        check_status(response)
    }
}

// ═══════════════════════════════════════════════════════════
// Twilio SMS
// ═══════════════════════════════════════════════════════════

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioSmsSender {
    account_sid: String,
    auth_token: String,
    from: String,
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl TwilioSmsSender {
    pub fn new(
        account_sid: &str,
        auth_token: &str,
        from: &str,
        timeout_secs: u64,
    ) -> Result<Self, NotificationError> {
        Ok(Self {
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from: from.to_string(),
            base_url: TWILIO_API.to_string(),
            client: build_client(timeout_secs)?,
            timeout_secs,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.base_url, self.account_sid)
    }
}

impl SmsSender for TwilioSmsSender {
    fn send_sms(&self, to: &str, body: &str) -> Result<(), NotificationError> {
        let url = self.messages_url();
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from.as_str()), ("Body", body)])
            .send()
            .map_err(|e| map_send_error(e, &self.base_url, self.timeout_secs))?;
        check_status(response)
    }
}

// ═══════════════════════════════════════════════════════════
// Unconfigured + test channels
// ═══════════════════════════════════════════════════════════

/// Stand-in for a channel with no provider credentials. Every send fails
/// with `NotConfigured`.
pub struct DisabledChannel(pub Channel);

impl EmailSender for DisabledChannel {
    fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), NotificationError> {
        Err(NotificationError::NotConfigured(self.0))
    }
}

impl SmsSender for DisabledChannel {
    fn send_sms(&self, _to: &str, _body: &str) -> Result<(), NotificationError> {
        Err(NotificationError::NotConfigured(self.0))
    }
}

/// Records sent emails. Optionally fails every send.
#[derive(Default)]
pub struct MockEmailSender {
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub fail_with: Option<NotificationError>,
}

impl MockEmailSender {
    pub fn failing(err: NotificationError) -> Self {
        Self {
            sent: Mutex::default(),
            fail_with: Some(err),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl EmailSender for MockEmailSender {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to.to_string(), subject.to_string(), body.to_string()));
        }
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Records sent SMS. Optionally fails every send.
#[derive(Default)]
pub struct MockSmsSender {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_with: Option<NotificationError>,
}

impl MockSmsSender {
    pub fn failing(err: NotificationError) -> Self {
        Self {
            sent: Mutex::default(),
            fail_with: Some(err),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl SmsSender for MockSmsSender {
    fn send_sms(&self, to: &str, body: &str) -> Result<(), NotificationError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to.to_string(), body.to_string()));
        }
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
