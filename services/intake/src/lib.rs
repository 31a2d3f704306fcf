//! Repair Intake Service
//!
//! Single-page intake form for customer repair requests. A customer enters
//! name, email, phone and device type and may attach a photo. On submit the
//! photo is uploaded to an S3-compatible bucket and one ticket row
//! referencing its public URL is inserted into PostgreSQL.
//!
//! ## Architecture
//!
//! ```text
//!  Browser                 Intake Service                    Backends
//! ┌──────────┐  POST     ┌──────────────┐
//! │ Intake   │ ────────▶ │ IntakeForm   │
//! │ form     │           └──────────────┘
//! └──────────┘                  │ submit
//!      ▲                        ▼
//!      │ page +          ┌──────────────┐ 1. upload   ┌──────────────┐
//!      │ notification    │ Submission   │ ──────────▶ │ photos/      │
//!      └──────────────── │ Pipeline     │             │   tickets/   │
//!                        └──────────────┘             └──────────────┘
//!                               │ 2. insert
//!                               ▼
//!                        ┌──────────────┐
//!                        │ tickets      │
//!                        └──────────────┘
//! ```

pub mod config;
pub mod form;
pub mod photo_store;
pub mod pipeline;
pub mod render;
pub mod ticket;
pub mod ticket_store;
pub mod web;

pub use config::Config;
pub use form::{IntakeForm, Notification};
pub use photo_store::S3PhotoStore;
pub use pipeline::{
    BackendError, PhotoStorage, SubmissionPipeline, SubmitError, TicketReceipt, TicketTable,
};
pub use ticket::{Device, PhotoFile, RepairTicket, TicketField, TicketFields};
pub use ticket_store::PgTicketStore;
pub use web::AppState;
