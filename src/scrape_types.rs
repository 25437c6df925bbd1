//! Core records passed between the collector, the extractor and the sinks.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::utils::constants::{ACCESS_RESTRICTED_TEXT, ERROR_TEXT_MAX_CHARS, NOT_FOUND_TEXT};
use crate::utils::safe_truncate_chars;

/// A product link discovered on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedLink {
    pub url: String,
    /// Zero-based first-seen position
    pub discovery_order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Terminal classification of one product page visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Success,
    OutOfStock,
    Error,
    AccessDenied,
}

impl ExtractionStatus {
    pub const ALL: [Self; 4] = [
        Self::Success,
        Self::OutOfStock,
        Self::Error,
        Self::AccessDenied,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::OutOfStock => "out_of_stock",
            Self::Error => "error",
            Self::AccessDenied => "access_denied",
        }
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of one extracted text field.
///
/// `Skipped` means the extractor never looked (empty cell); `NotFound` means it
/// looked and found nothing. Only `NotFound` makes a result retry-worthy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field {
    Value(String),
    NotFound,
    Restricted,
    /// Failure text for the attempt that produced this record
    Error(String),
    #[default]
    Skipped,
}

impl Field {
    /// Wrap text that already passed validation
    pub fn value(text: impl Into<String>) -> Self {
        Self::Value(text.into())
    }

    /// `Value` when present, `NotFound` otherwise
    #[must_use]
    pub fn found_or_not(text: Option<String>) -> Self {
        text.map_or(Self::NotFound, Self::Value)
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.write_str(v),
            Self::NotFound => f.write_str(NOT_FOUND_TEXT),
            Self::Restricted => f.write_str(ACCESS_RESTRICTED_TEXT),
            Self::Error(msg) => write!(f, "Error: {msg}"),
            Self::Skipped => Ok(()),
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of extracting one product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub url: String,
    pub product_name: Field,
    pub seller_name: Field,
    pub company_name: Field,
    pub tax_id: Field,
    pub status: ExtractionStatus,
    pub image_url: Field,
    /// Full extraction attempts spent on this URL
    pub attempts: u32,
}

impl ExtractionResult {
    /// Empty success record; the extractor fills fields as it goes
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            product_name: Field::Skipped,
            seller_name: Field::Skipped,
            company_name: Field::Skipped,
            tax_id: Field::Skipped,
            status: ExtractionStatus::Success,
            image_url: Field::Skipped,
            attempts: 0,
        }
    }

    /// Blocked page: every text field carries the restricted sentinel
    #[must_use]
    pub fn access_denied(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            product_name: Field::Restricted,
            seller_name: Field::Restricted,
            company_name: Field::Restricted,
            tax_id: Field::Restricted,
            status: ExtractionStatus::AccessDenied,
            image_url: Field::Restricted,
            attempts: 0,
        }
    }

    /// Attempt that failed with an unexpected error; long messages are cut
    #[must_use]
    pub fn failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            url: url.into(),
            product_name: Field::NotFound,
            seller_name: Field::Error(safe_truncate_chars(&message, ERROR_TEXT_MAX_CHARS).to_string()),
            company_name: Field::NotFound,
            tax_id: Field::NotFound,
            status: ExtractionStatus::Error,
            image_url: Field::NotFound,
            attempts: 0,
        }
    }

    /// Still blocked or failing once in-place retries are spent
    #[must_use]
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self.status,
            ExtractionStatus::AccessDenied | ExtractionStatus::Error
        )
    }

    /// Cells in sink column order
    #[must_use]
    pub fn to_row(&self) -> [String; 7] {
        [
            self.url.clone(),
            self.product_name.to_string(),
            self.seller_name.to_string(),
            self.company_name.to_string(),
            self.tax_id.to_string(),
            self.status.to_string(),
            self.image_url.to_string(),
        ]
    }
}

/// Column headers matching `ExtractionResult::to_row`
pub const RESULT_COLUMNS: [&str; 7] = [
    "url",
    "product_name",
    "seller_name",
    "company_name",
    "tax_id",
    "status",
    "image_url",
];
