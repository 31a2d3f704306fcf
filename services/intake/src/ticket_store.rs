use crate::config::DatabaseConfig;
use crate::pipeline::{BackendError, TicketTable};
use crate::ticket::RepairTicket;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

/// Ticket table in PostgreSQL
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    /// Create a new ticket store with connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .connect(&config.url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl TicketTable for PgTicketStore {
    #[instrument(skip(self, ticket), fields(device = %ticket.device, has_photo = ticket.photo_url.is_some()))]
    async fn insert(&self, ticket: &RepairTicket) -> Result<i64, BackendError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO tickets (name, email, phone, device, photo_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&ticket.name)
        .bind(&ticket.email)
        .bind(&ticket.phone)
        .bind(&ticket.device)
        .bind(&ticket.photo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| backend_error(&e))?;

        debug!(ticket_id = id, "Ticket row inserted");
        Ok(id)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| backend_error(&e))?;
        Ok(())
    }
}

/// Prefer the server-provided message for database errors
fn backend_error(err: &sqlx::Error) -> BackendError {
    match err.as_database_error() {
        Some(db_err) => BackendError::new(db_err.message()),
        None => BackendError::new(err.to_string()),
    }
}
