use std::{
    fmt::{self, Debug},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};
use tracing::info;

use crate::config::EmailConfig;

pub type MailerError = Box<dyn std::error::Error + Send + Sync>;

/// Mock transport that captures sent emails for testing.
///
/// It can also be told to reject the next few messages so delivery failures
/// can be exercised without a real SMTP server.
#[derive(Clone, Default)]
pub struct MockTransport {
    messages: Arc<Mutex<Vec<Message>>>,
    failures_remaining: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn deliver(&self, message: Message) -> Result<(), MailerError> {
        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();

        if should_fail {
            return Err("mock transport rejected the message".into());
        }

        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }

    /// Get all sent messages
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reject the next `count` messages
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }
}

/// Delivery transport for rendered messages.
#[derive(Clone)]
pub enum Mailer {
    /// Real SMTP transport for production use
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// Mock transport that captures emails for testing
    Mock(MockTransport),
    /// Writes each message to the log instead of sending it
    Log,
}

impl Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smtp(_) => f.debug_tuple("Mailer::Smtp").finish(),
            Self::Mock(_) => f.debug_tuple("Mailer::Mock").finish(),
            Self::Log => f.debug_tuple("Mailer::Log").finish(),
        }
    }
}

impl Mailer {
    /// Build the mailer described by the email configuration.
    pub fn from_config(config: &EmailConfig) -> Result<Self, MailerError> {
        match config {
            EmailConfig::Log => Ok(Self::Log),
            EmailConfig::Mock => Ok(Self::mock()),
            EmailConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
                ..
            } => {
                let mut builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::relay(host)?.port(*port)
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(*port)
                };

                if let (Some(username), Some(password)) = (username, password) {
                    builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
                }

                Ok(Self::Smtp(builder.build()))
            }
        }
    }

    /// Create a new mock mailer for testing
    pub fn mock() -> Self {
        Self::Mock(MockTransport::new())
    }

    /// Send an email. For mock transport, stores the message for later inspection.
    pub async fn send(&self, message: Message) -> Result<(), MailerError> {
        match self {
            Self::Smtp(transport) => {
                transport.send(message).await?;
                Ok(())
            }
            Self::Mock(mock) => mock.deliver(message),
            Self::Log => {
                let recipients: Vec<String> = message
                    .envelope()
                    .to()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                info!(
                    "📨 Would send {} byte message to {:?}",
                    message.formatted().len(),
                    recipients
                );
                Ok(())
            }
        }
    }

    /// Get the mock transport (only available for mock mailer)
    pub fn mock_transport(&self) -> Option<&MockTransport> {
        match self {
            Self::Mock(transport) => Some(transport),
            Self::Smtp(_) | Self::Log => None,
        }
    }
}
