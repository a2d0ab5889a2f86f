use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    Message,
};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{jobs::DispatchError, mailer::Mailer};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

static TEMPLATE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("template id pattern is valid")
});

/// Values available to a template for one dispatch attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchContext {
    pub job_id: Uuid,
    pub job_name: String,
    pub attempt: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSendResult {
    pub template_id: String,
    pub total_dispatched: usize,
}

/// Renders a template for every destination and hands the result to a transport.
///
/// The returned count is the number of dispatch attempts made, not a delivery
/// guarantee; transport-level retries are the transport's own concern.
#[async_trait]
pub trait BulkSender: Send + Sync {
    async fn send_bulk(
        &self,
        template_id: &str,
        destinations: &[String],
        context: &DispatchContext,
    ) -> Result<BulkSendResult, DispatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Message templates, either read from a directory or held in memory.
///
/// A template's first line must be `Subject: ...`; the rest is the body.
/// `{{ name }}` placeholders are filled from the dispatch context and the
/// current recipient (`job_id`, `job_name`, `attempt`, `recipient`).
#[derive(Debug, Clone)]
pub enum Templates {
    /// `<directory>/<template_id>.txt`
    Directory(PathBuf),
    InMemory(Arc<HashMap<String, String>>),
}

impl Templates {
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::Directory(path.into())
    }

    pub fn in_memory<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::InMemory(Arc::new(
            templates
                .into_iter()
                .map(|(id, source)| (id.into(), source.into()))
                .collect(),
        ))
    }

    async fn source(&self, template_id: &str) -> Result<String, DispatchError> {
        if !TEMPLATE_ID.is_match(template_id) {
            return Err(DispatchError::Render(format!(
                "invalid template identifier '{template_id}'"
            )));
        }

        match self {
            Self::Directory(directory) => {
                let path = directory.join(format!("{template_id}.txt"));
                tokio::fs::read_to_string(&path).await.map_err(|e| {
                    DispatchError::Render(format!(
                        "failed to load template {}: {e}",
                        path.display()
                    ))
                })
            }
            Self::InMemory(templates) => templates
                .get(template_id)
                .cloned()
                .ok_or_else(|| DispatchError::Render(format!("unknown template '{template_id}'"))),
        }
    }

    pub async fn render(
        &self,
        template_id: &str,
        values: &HashMap<&str, String>,
    ) -> Result<RenderedEmail, DispatchError> {
        let source = self.source(template_id).await?;
        let (first_line, body) = source.split_once('\n').unwrap_or((source.as_str(), ""));

        let subject = first_line
            .trim_end_matches('\r')
            .strip_prefix("Subject:")
            .ok_or_else(|| {
                DispatchError::Render(format!(
                    "template '{template_id}' must start with a 'Subject:' line"
                ))
            })?
            .trim();

        Ok(RenderedEmail {
            subject: substitute(subject, values)?,
            body: substitute(body, values)?,
        })
    }
}

fn substitute(text: &str, values: &HashMap<&str, String>) -> Result<String, DispatchError> {
    let mut rendered = String::with_capacity(text.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = values.get(name.as_str()).ok_or_else(|| {
            DispatchError::Render(format!("unknown placeholder '{}'", name.as_str()))
        })?;

        rendered.push_str(&text[last..whole.start()]);
        rendered.push_str(value);
        last = whole.end();
    }

    rendered.push_str(&text[last..]);
    Ok(rendered)
}

/// Default [`BulkSender`]: renders with [`Templates`] and delivers through a [`Mailer`].
#[derive(Debug, Clone)]
pub struct EmailSender {
    templates: Templates,
    mailer: Mailer,
    sender: Mailbox,
}

impl EmailSender {
    pub const fn new(templates: Templates, mailer: Mailer, sender: Mailbox) -> Self {
        Self {
            templates,
            mailer,
            sender,
        }
    }

    pub const fn mailer(&self) -> &Mailer {
        &self.mailer
    }

    fn build_message(
        &self,
        recipient: &str,
        email: RenderedEmail,
    ) -> Result<Message, DispatchError> {
        let to: Mailbox = recipient.parse().map_err(|e| {
            DispatchError::Delivery(format!("invalid recipient address '{recipient}': {e}"))
        })?;

        Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| DispatchError::Delivery(format!("failed to build email: {e}")))
    }
}

#[async_trait]
impl BulkSender for EmailSender {
    async fn send_bulk(
        &self,
        template_id: &str,
        destinations: &[String],
        context: &DispatchContext,
    ) -> Result<BulkSendResult, DispatchError> {
        let mut values = HashMap::from([
            ("job_id", context.job_id.to_string()),
            ("job_name", context.job_name.clone()),
            ("attempt", context.attempt.to_string()),
        ]);

        let mut dispatched = 0;
        for recipient in destinations {
            values.insert("recipient", recipient.clone());
            let email = self.templates.render(template_id, &values).await?;
            let message = self.build_message(recipient, email)?;

            self.mailer.send(message).await.map_err(|e| {
                DispatchError::Delivery(format!("failed to send to '{recipient}': {e}"))
            })?;

            debug!("Dispatched template '{}' to {}", template_id, recipient);
            dispatched += 1;
        }

        info!(
            "Template '{}' dispatched to {} recipient(s)",
            template_id, dispatched
        );

        Ok(BulkSendResult {
            template_id: template_id.to_string(),
            total_dispatched: dispatched,
        })
    }
}
