use std::sync::Arc;

use sea_orm::{ConnectOptions, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::debug;

use crate::{
    config::{Config, DatabaseConfig, EmailConfig},
    database::migrations::Migrator,
    emails::{BulkSender, EmailSender, Templates},
    jobs::{job_store::JobStore, scheduling_service::SchedulingService, worker::Worker},
    mailer::Mailer,
    recipients::CachedRecipientResolver,
};

static TRACING_INITIALIZED: std::sync::Once = std::sync::Once::new();

/// Initialize tracing for tests
fn init_tracing() {
    TRACING_INITIALIZED.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}

/// Everything a test needs to drive the scheduler against a throwaway database.
pub struct TestUtils {
    pub db: DatabaseConnection,
    pub store: JobStore,
    pub service: SchedulingService,
    pub mailer: Mailer,
    pub templates: Templates,
    pub config: Config,
}

/// Creates a migrated in-memory SQLite database and the components built on it.
///
/// Every call gets its own database. The pool holds exactly one connection,
/// since each new connection to `sqlite::memory:` would open an empty database.
///
/// # Panics
///
/// Panics if the database cannot be opened or migrated.
pub async fn setup_test() -> TestUtils {
    init_tracing();

    let config = Config {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            pool_size: 1,
        },
        email: EmailConfig::Mock,
        ..Config::default()
    };

    debug!("Creating single-connection in-memory database");
    let db = {
        let mut options = ConnectOptions::new(config.database.url.clone());
        options.sqlx_logging(false);
        options.max_connections(1);
        options.min_connections(1);

        sea_orm::Database::connect(options)
            .await
            .expect("Failed to connect to the test database")
    };

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations on the test database");

    let store = JobStore::new(db.clone(), &config);
    let service = SchedulingService::from_store(store.clone());
    let mailer = Mailer::from_config(&config.email).expect("Mock mailer is always available");
    let templates = Templates::in_memory([(
        "welcome",
        "Subject: Welcome {{ recipient }}\nHello from {{ job_name }} (attempt {{ attempt }}).",
    )]);

    TestUtils {
        db,
        store,
        service,
        mailer,
        templates,
        config,
    }
}

impl TestUtils {
    /// A worker that delivers through the mock mailer and resolves filters
    /// against the built-in sample recipients.
    pub fn worker(&self) -> Worker {
        let sender = EmailSender::new(
            self.templates.clone(),
            self.mailer.clone(),
            "Herald <noreply@example.com>"
                .parse()
                .expect("Test sender address is valid"),
        );
        self.worker_with_sender(Arc::new(sender))
    }

    pub fn worker_with_sender(&self, sender: Arc<dyn BulkSender>) -> Worker {
        Worker::new(
            self.store.clone(),
            Arc::new(CachedRecipientResolver::new(
                "tests/fixtures/does-not-exist.json",
            )),
            sender,
            self.config.worker.clone(),
        )
    }

    /// Messages captured by the mock mailer.
    ///
    /// # Panics
    ///
    /// Panics if the mailer is not the mock transport.
    pub fn sent_emails(&self) -> Vec<lettre::Message> {
        self.mailer
            .mock_transport()
            .expect("Mock mailer should be used in tests")
            .messages()
    }
}
