//! Upload-then-insert submission pipeline.
//!
//! A submission performs at most two remote calls, strictly in order:
//!
//! 1. If a photo is attached, upload it to the photo bucket and derive its
//!    public URL.
//! 2. Insert one ticket row referencing that URL (or `NULL`).
//!
//! Either step failing ends the submission. A failed insert after a
//! successful upload leaves the uploaded object unreferenced; it is logged
//! and counted but not deleted.

use crate::ticket::{PhotoFile, RepairTicket, TicketFields};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Length of the random part of generated object names
const SUFFIX_LEN: usize = 11;

/// Error reported by a storage or database backend, carrying its message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a submission did not persist a ticket
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Photo upload failed: {0}")]
    Upload(BackendError),

    #[error("Ticket insert failed: {0}")]
    Insert(BackendError),
}

/// Object storage holding ticket photos
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Upload a photo to `path` inside the photo bucket
    async fn upload(&self, path: &str, photo: &PhotoFile) -> Result<(), BackendError>;

    /// Public URL of the object at `path`
    fn public_url(&self, path: &str) -> String;
}

/// Remote table receiving ticket rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketTable: Send + Sync {
    /// Insert one ticket, returning its id
    async fn insert(&self, ticket: &RepairTicket) -> Result<i64, BackendError>;

    /// Check the table is reachable
    async fn ping(&self) -> Result<(), BackendError>;
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketReceipt {
    pub ticket_id: i64,
    pub photo_path: Option<String>,
    pub photo_url: Option<String>,
}

/// Runs the upload-then-insert sequence for one ticket
pub struct SubmissionPipeline {
    storage: Arc<dyn PhotoStorage>,
    table: Arc<dyn TicketTable>,
    key_prefix: String,
}

impl SubmissionPipeline {
    pub fn new(
        storage: Arc<dyn PhotoStorage>,
        table: Arc<dyn TicketTable>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            table,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn table(&self) -> &Arc<dyn TicketTable> {
        &self.table
    }

    /// Submit one ticket
    #[instrument(skip_all, fields(has_photo = photo.is_some()))]
    pub async fn submit(
        &self,
        fields: &TicketFields,
        photo: Option<&PhotoFile>,
    ) -> Result<TicketReceipt, SubmitError> {
        let mut photo_path = None;
        let mut photo_url = None;

        if let Some(photo) = photo {
            let path = photo_object_path(&self.key_prefix, photo, Utc::now(), &random_suffix());

            debug!(path = %path, size_bytes = photo.data.len(), "Uploading ticket photo");

            if let Err(e) = self.storage.upload(&path, photo).await {
                warn!(path = %path, error = %e, "Photo upload failed");
                metrics::counter!("intake.submissions.failed", "stage" => "upload").increment(1);
                return Err(SubmitError::Upload(e));
            }

            metrics::counter!("intake.photos.uploaded").increment(1);
            photo_url = Some(self.storage.public_url(&path));
            photo_path = Some(path);
        }

        let ticket = fields.clone().into_ticket(photo_url.clone());

        let ticket_id = match self.table.insert(&ticket).await {
            Ok(id) => id,
            Err(e) => {
                metrics::counter!("intake.submissions.failed", "stage" => "insert").increment(1);
                if let Some(ref path) = photo_path {
                    // Nothing references this object anymore.
                    warn!(path = %path, error = %e, "Ticket insert failed, uploaded photo is orphaned");
                    metrics::counter!("intake.photos.orphaned").increment(1);
                } else {
                    warn!(error = %e, "Ticket insert failed");
                }
                return Err(SubmitError::Insert(e));
            }
        };

        metrics::counter!("intake.tickets.created").increment(1);
        info!(ticket_id = ticket_id, photo_path = ?photo_path, "Ticket created");

        Ok(TicketReceipt {
            ticket_id,
            photo_path,
            photo_url,
        })
    }
}

/// Generate the object path for a photo
/// Format: {prefix}/{unix_millis}_{suffix}.{ext}
pub fn photo_object_path(
    prefix: &str,
    photo: &PhotoFile,
    now: DateTime<Utc>,
    suffix: &str,
) -> String {
    let ext = sanitize_path_component(photo.extension());
    let ext = if ext.is_empty() { "bin".to_string() } else { ext };

    format!(
        "{prefix}/{millis}_{suffix}.{ext}",
        prefix = prefix.trim_matches('/'),
        millis = now.timestamp_millis(),
        suffix = suffix,
        ext = ext
    )
}

/// Random lowercase alphanumeric suffix for object names
fn random_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(SUFFIX_LEN);
    suffix
}

/// Sanitize a path component to prevent path traversal
fn sanitize_path_component(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
