use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    M,
    F,
}

impl Sex {
    pub fn code(&self) -> &'static str {
        match self {
            Self::M => "M",
            Self::F => "F",
        }
    }

    pub fn from_code(code: &str) -> Option<Sex> {
        match code {
            "M" => Some(Self::M),
            "F" => Some(Self::F),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Laterality {
    Unilaterale,
    Bilaterale,
}

impl Laterality {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unilaterale => "Unilatérale",
            Self::Bilaterale => "Bilatérale",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistanceTypeConfig {
    pub id: i64,
    pub name: String,
    pub laterality_required: bool,
    pub schooling_required: bool,
}

#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub assistance: AssistanceTypeConfig,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Campaign {
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.start_date.map_or(true, |s| s <= day) && self.end_date.map_or(true, |e| day <= e)
    }
}

/// Failure to turn a raw cell into a typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationError(pub String);

impl fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed field that may be absent or may have failed normalization.
pub type Normalized<T> = std::result::Result<Option<T>, NormalizationError>;

/// Typed candidate produced from one spreadsheet row, before business rules.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub row_number: usize,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    /// Canonical code when recognised, otherwise the uppercased input.
    pub sex: Option<String>,
    pub birth_date: Normalized<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub laterality: Normalized<Laterality>,
    pub schooling: Option<bool>,
}

/// A row that passed validation, bound to its destination campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct BeneficiaryDraft {
    pub row_number: usize,
    pub campaign_id: i64,
    pub assistance_type_id: i64,
    pub last_name: String,
    pub first_name: String,
    pub sex: Sex,
    pub birth_date: Option<NaiveDate>,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub laterality: Option<Laterality>,
    pub schooling: Option<bool>,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ImportedBeneficiary {
    pub id: i64,
    pub campaign_id: i64,
    pub assistance_type_id: i64,
    pub last_name: String,
    pub first_name: String,
    pub sex: String,
    pub birth_date: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub laterality: Option<String>,
    pub schooling: Option<bool>,
    pub not_from_campaign: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
