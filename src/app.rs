use std::sync::Arc;

use lettre::message::Mailbox;
use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::{
    config::Config,
    database::setup_database,
    emails::{EmailSender, Templates},
    environment::Environment,
    jobs::{job_store::JobStore, scheduling_service::SchedulingService, worker::Worker},
    mailer::{Mailer, MailerError},
    recipients::CachedRecipientResolver,
};

/// `From` address used when the email transport does not configure one.
pub const DEFAULT_SENDER: &str = "Herald <noreply@localhost>";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database setup failed: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Mailer setup failed: {0}")]
    Mailer(MailerError),
    #[error("Invalid sender address: {0}")]
    Sender(#[from] lettre::address::AddressError),
}

/// Shared handles for one process: configuration plus a migrated database.
#[derive(Clone, Debug)]
pub struct App {
    pub config: Config,
    pub environment: Environment,
    pub db: DatabaseConnection,
}

impl App {
    /// Connect to the configured database and apply pending migrations.
    pub async fn new(environment: Environment, config: Config) -> Result<Self, AppError> {
        let db = setup_database(&config.database).await?;

        Ok(Self {
            config,
            environment,
            db,
        })
    }

    pub fn store(&self) -> JobStore {
        JobStore::new(self.db.clone(), &self.config)
    }

    pub fn scheduling_service(&self) -> SchedulingService {
        SchedulingService::from_store(self.store())
    }

    /// Build a worker wired to the configured recipient cache, templates and mailer.
    pub fn worker(&self) -> Result<Worker, AppError> {
        let mailer = Mailer::from_config(&self.config.email).map_err(AppError::Mailer)?;
        let sender = match self.config.email.sender() {
            Some(sender) => sender.clone(),
            None => DEFAULT_SENDER.parse::<Mailbox>()?,
        };

        let email_sender = EmailSender::new(
            Templates::directory(&self.config.templates.directory),
            mailer,
            sender,
        );
        let resolver = CachedRecipientResolver::new(&self.config.recipients.cache_path);

        Ok(Worker::new(
            self.store(),
            Arc::new(resolver),
            Arc::new(email_sender),
            self.config.worker.clone(),
        ))
    }
}
