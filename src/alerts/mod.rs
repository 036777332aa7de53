//! Patient alerting over email and SMS.

pub mod channels;
pub mod dispatcher;
pub mod messages;

pub use channels::{
    DisabledChannel, EmailSender, HttpEmailSender, MockEmailSender, MockSmsSender, SmsSender,
    TwilioSmsSender,
};
pub use dispatcher::{AlertDispatcher, ChannelOutcome, DispatchOutcome};

use thiserror::Error;

use crate::models::Channel;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    #[error("{0:?} channel is not configured")]
    NotConfigured(Channel),

    #[error("Cannot reach {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Provider rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
