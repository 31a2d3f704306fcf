//! Repair ticket data model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Device category a repair request is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Phone,
    Tablet,
    Laptop,
    Desktop,
    Other,
}

impl Device {
    /// All devices in the order they are offered on the form
    pub const ALL: [Device; 5] = [
        Device::Phone,
        Device::Tablet,
        Device::Laptop,
        Device::Desktop,
        Device::Other,
    ];

    /// Label shown on the form and stored in the `device` column
    pub fn label(&self) -> &'static str {
        match self {
            Device::Phone => "Phone",
            Device::Tablet => "Tablet",
            Device::Laptop => "Laptop",
            Device::Desktop => "Desktop",
            Device::Other => "Other",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown device: {0}")]
pub struct UnknownDevice(pub String);

impl FromStr for Device {
    type Err = UnknownDevice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Device::ALL
            .into_iter()
            .find(|d| d.label() == s)
            .ok_or_else(|| UnknownDevice(s.to_string()))
    }
}

/// Editable text/select attributes of a ticket, keyed by input name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketField {
    Name,
    Email,
    Phone,
    Device,
}

impl TicketField {
    pub const ALL: [TicketField; 4] = [
        TicketField::Name,
        TicketField::Email,
        TicketField::Phone,
        TicketField::Device,
    ];

    /// HTML input name
    pub fn input_name(&self) -> &'static str {
        match self {
            TicketField::Name => "name",
            TicketField::Email => "email",
            TicketField::Phone => "phone",
            TicketField::Device => "device",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown form field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for TicketField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketField::ALL
            .into_iter()
            .find(|f| f.input_name() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// The four text values of a ticket as entered on the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub device: String,
}

impl TicketFields {
    pub fn get(&self, field: TicketField) -> &str {
        match field {
            TicketField::Name => &self.name,
            TicketField::Email => &self.email,
            TicketField::Phone => &self.phone,
            TicketField::Device => &self.device,
        }
    }

    pub fn set(&mut self, field: TicketField, value: String) {
        match field {
            TicketField::Name => self.name = value,
            TicketField::Email => self.email = value,
            TicketField::Phone => self.phone = value,
            TicketField::Device => self.device = value,
        }
    }

    /// Build the record to insert, referencing the uploaded photo if any
    pub fn into_ticket(self, photo_url: Option<String>) -> RepairTicket {
        RepairTicket {
            name: self.name,
            email: self.email,
            phone: self.phone,
            device: self.device,
            photo_url,
        }
    }
}

/// Row inserted into the `tickets` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairTicket {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub device: String,
    pub photo_url: Option<String>,
}

/// A photo selected on the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    /// Original file name as sent by the browser
    pub file_name: String,
    /// Declared content type, if any
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl PhotoFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            data,
        }
    }

    /// Extension after the last `.` of the file name; the whole name when it has no dot
    pub fn extension(&self) -> &str {
        self.file_name.rsplit('.').next().unwrap_or_default()
    }

    /// Declared content type, falling back to the extension
    pub fn mime_type(&self) -> String {
        match self.content_type.as_deref() {
            Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
            _ => content_type_for_extension(self.extension()).to_string(),
        }
    }
}

/// Get content type for an image extension
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "application/octet-stream",
    }
}
