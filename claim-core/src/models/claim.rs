use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Which calculation path produced a claim's figures.
///
/// Simple claims deduct retention from the amount due; itemized claims
/// stop at the GST-inclusive total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    #[default]
    Simple,
    Itemized,
}

impl ClaimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Itemized => "itemized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(Self::Simple),
            "itemized" => Some(Self::Itemized),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: i64,
    pub project_id: i64,
    pub number: String,
    pub kind: ClaimKind,
    pub status: ClaimStatus,

    // Header
    pub month_ending: Option<DateTime<Utc>>,
    pub period_from: Option<DateTime<Utc>>,
    pub period_to: Option<DateTime<Utc>>,
    pub contact_person: Option<String>,
    pub subcontract_reference: Option<String>,
    pub description: Option<String>,

    // User-provided values
    pub percent_complete: Decimal,
    pub previous_claim: Decimal,
    pub payment_received: Decimal,

    // Calculated values
    pub this_claim: Decimal,
    pub total_works_completed: Decimal,
    pub deductions: Decimal,
    pub sub_total: Decimal,
    pub gst: Decimal,
    pub total_inc_gst: Decimal,
    pub retention_held: Decimal,
    pub amount_due: Decimal,

    pub created_at: DateTime<Utc>,
}

/// For creating new claims (no id or timestamps)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaim {
    pub project_id: i64,
    pub number: String,
    pub kind: ClaimKind,
    pub status: ClaimStatus,
    pub month_ending: Option<DateTime<Utc>>,
    pub period_from: Option<DateTime<Utc>>,
    pub period_to: Option<DateTime<Utc>>,
    pub contact_person: Option<String>,
    pub subcontract_reference: Option<String>,
    pub description: Option<String>,
    pub percent_complete: Decimal,
    pub previous_claim: Decimal,
    pub payment_received: Decimal,
    pub this_claim: Decimal,
    pub total_works_completed: Decimal,
    pub deductions: Decimal,
    pub sub_total: Decimal,
    pub gst: Decimal,
    pub total_inc_gst: Decimal,
    pub retention_held: Decimal,
    pub amount_due: Decimal,
}

/// Descriptive fields shared by both claim forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimHeader {
    pub number: String,
    pub status: ClaimStatus,
    pub month_ending: Option<DateTime<Utc>>,
    pub period_from: Option<DateTime<Utc>>,
    pub period_to: Option<DateTime<Utc>>,
    pub contact_person: Option<String>,
    pub subcontract_reference: Option<String>,
    pub description: Option<String>,
}

impl ClaimHeader {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            ..Default::default()
        }
    }
}
