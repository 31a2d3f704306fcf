//! Intake form state.
//!
//! `IntakeForm` owns everything a single form instance tracks between edits:
//! the four text values, the selected photo with its preview, and whether a
//! submission is currently running.

use crate::pipeline::{SubmissionPipeline, SubmitError};
use crate::ticket::{PhotoFile, TicketField, TicketFields, UnknownField};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fmt;

/// Message shown to the user once a submission finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Created { ticket_id: i64 },
    UploadFailed(String),
    SaveFailed(String),
}

impl Notification {
    pub fn is_success(&self) -> bool {
        matches!(self, Notification::Created { .. })
    }
}

impl From<SubmitError> for Notification {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Upload(e) => Notification::UploadFailed(e.message),
            SubmitError::Insert(e) => Notification::SaveFailed(e.message),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Created { .. } => f.write_str("Ticket created successfully!"),
            Notification::UploadFailed(msg) => write!(f, "Error uploading photo: {msg}"),
            Notification::SaveFailed(msg) => write!(f, "Error saving ticket: {msg}"),
        }
    }
}

/// In-progress state of one intake form
#[derive(Debug, Clone, Default)]
pub struct IntakeForm {
    fields: TicketFields,
    photo: Option<PhotoFile>,
    preview: Option<String>,
    submitting: bool,
}

impl IntakeForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &TicketFields {
        &self.fields
    }

    pub fn field(&self, field: TicketField) -> &str {
        self.fields.get(field)
    }

    /// Update the field whose input is called `name`
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), UnknownField> {
        let field: TicketField = name.parse()?;
        self.fields.set(field, value.into());
        Ok(())
    }

    /// Select a photo, or clear the selection with `None`
    pub fn select_photo(&mut self, photo: Option<PhotoFile>) {
        self.preview = photo.as_ref().map(preview_data_url);
        self.photo = photo;
    }

    pub fn photo(&self) -> Option<&PhotoFile> {
        self.photo.as_ref()
    }

    /// `data:` URL of the selected photo
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && (self.photo.is_none() || self.preview.is_some())
    }

    /// Run the submission pipeline for the current values.
    ///
    /// On success every field, the photo and its preview are cleared. On
    /// failure the form is left exactly as it was so the user can retry.
    pub async fn submit(&mut self, pipeline: &SubmissionPipeline) -> Notification {
        self.submitting = true;
        let result = pipeline.submit(&self.fields, self.photo.as_ref()).await;
        self.submitting = false;

        match result {
            Ok(receipt) => {
                self.reset();
                Notification::Created {
                    ticket_id: receipt.ticket_id,
                }
            }
            Err(e) => e.into(),
        }
    }

    fn reset(&mut self) {
        self.fields = TicketFields::default();
        self.photo = None;
        self.preview = None;
    }
}

fn preview_data_url(photo: &PhotoFile) -> String {
    format!("data:{};base64,{}", photo.mime_type(), BASE64.encode(&photo.data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{is_ticket_path, jane, jpeg, pipeline, PUBLIC_BASE};
    use crate::pipeline::{BackendError, MockPhotoStorage, MockTicketTable};

    fn filled_form() -> IntakeForm {
        let mut form = IntakeForm::new();
        form.set_field("name", "Jane Doe").unwrap();
        form.set_field("email", "jane@example.com").unwrap();
        form.set_field("phone", "555-1234").unwrap();
        form.set_field("device", "Laptop").unwrap();
        form
    }

    #[test]
    fn test_set_field_changes_only_named_field() {
        let mut form = filled_form();
        let before = form.fields().clone();

        form.set_field("phone", "555-9999").unwrap();

        assert_eq!(form.field(TicketField::Phone), "555-9999");
        assert_eq!(form.fields().name, before.name);
        assert_eq!(form.fields().email, before.email);
        assert_eq!(form.fields().device, before.device);
    }

    #[test]
    fn test_set_unknown_field_is_rejected() {
        let mut form = filled_form();
        let before = form.fields().clone();

        let err = form.set_field("address", "Main St").unwrap_err();

        assert_eq!(err, UnknownField("address".to_string()));
        assert_eq!(form.fields(), &before);
    }

    #[test]
    fn test_select_photo_renders_preview() {
        let mut form = IntakeForm::new();
        assert!(form.preview().is_none());

        form.select_photo(Some(jpeg()));

        assert_eq!(form.preview(), Some("data:image/jpeg;base64,/9j/"));
        assert!(form.can_submit());
    }

    #[test]
    fn test_cancelled_selection_clears_preview() {
        let mut form = IntakeForm::new();
        form.select_photo(Some(jpeg()));

        form.select_photo(None);

        assert!(form.photo().is_none());
        assert!(form.preview().is_none());
    }

    #[tokio::test]
    async fn test_successful_submit_resets_form() {
        let mut table = MockTicketTable::new();
        table
            .expect_insert()
            .withf(|ticket| *ticket == jane().into_ticket(None))
            .times(1)
            .returning(|_| Ok(42));
        let mut storage = MockPhotoStorage::new();
        storage.expect_upload().never();

        let mut form = filled_form();
        let notification = form.submit(&pipeline(storage, table)).await;

        assert_eq!(notification, Notification::Created { ticket_id: 42 });
        assert_eq!(notification.to_string(), "Ticket created successfully!");
        assert_eq!(form.fields(), &TicketFields::default());
        assert!(form.photo().is_none());
        assert!(form.preview().is_none());
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_with_photo_resets_preview() {
        let mut storage = MockPhotoStorage::new();
        storage
            .expect_upload()
            .withf(|path, _| is_ticket_path(path))
            .times(1)
            .returning(|_, _| Ok(()));
        storage
            .expect_public_url()
            .returning(|path| format!("{PUBLIC_BASE}/{path}"));
        let mut table = MockTicketTable::new();
        table
            .expect_insert()
            .withf(|ticket| ticket.photo_url.is_some())
            .times(1)
            .returning(|_| Ok(1));

        let mut form = filled_form();
        form.select_photo(Some(jpeg()));
        let notification = form.submit(&pipeline(storage, table)).await;

        assert!(notification.is_success());
        assert!(form.photo().is_none());
        assert!(form.preview().is_none());
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_form() {
        let mut storage = MockPhotoStorage::new();
        storage
            .expect_upload()
            .returning(|_, _| Err(BackendError::new("The resource already exists")));
        let mut table = MockTicketTable::new();
        table.expect_insert().never();

        let mut form = filled_form();
        form.select_photo(Some(jpeg()));
        let before = form.fields().clone();

        let notification = form.submit(&pipeline(storage, table)).await;

        assert_eq!(
            notification.to_string(),
            "Error uploading photo: The resource already exists"
        );
        assert_eq!(form.fields(), &before);
        assert_eq!(form.photo(), Some(&jpeg()));
        assert!(form.preview().is_some());
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_insert_failure_keeps_form() {
        let mut storage = MockPhotoStorage::new();
        storage.expect_upload().returning(|_, _| Ok(()));
        storage
            .expect_public_url()
            .returning(|path| format!("{PUBLIC_BASE}/{path}"));
        let mut table = MockTicketTable::new();
        table
            .expect_insert()
            .returning(|_| Err(BackendError::new("connection reset")));

        let mut form = filled_form();
        form.select_photo(Some(jpeg()));
        let before = form.fields().clone();

        let notification = form.submit(&pipeline(storage, table)).await;

        assert_eq!(
            notification,
            Notification::SaveFailed("connection reset".to_string())
        );
        assert_eq!(form.fields(), &before);
        assert!(form.photo().is_some());
        assert!(form.can_submit());
    }
}
