use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimItem {
    pub id: i64,
    pub claim_id: i64,
    pub description: String,
    pub contract_value: Decimal,
    pub percent_complete: Decimal,
    pub claim_to_date: Decimal,
    pub previous_claim: Decimal,
    pub this_claim: Decimal,
    pub left_to_claim: Decimal,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaimItem {
    pub claim_id: i64,
    pub description: String,
    pub contract_value: Decimal,
    pub percent_complete: Decimal,
    pub claim_to_date: Decimal,
    pub previous_claim: Decimal,
    pub this_claim: Decimal,
    pub left_to_claim: Decimal,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl VariationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub id: i64,
    pub claim_id: i64,
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub variation_value: Decimal,
    pub subtotal: Decimal,
    pub status: VariationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariation {
    pub claim_id: i64,
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub variation_value: Decimal,
    pub subtotal: Decimal,
    pub status: VariationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub id: i64,
    pub claim_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCredit {
    pub claim_id: i64,
    pub description: String,
    pub amount: Decimal,
}

/// Metadata for a file supporting a claim. The bytes live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub claim_id: i64,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttachment {
    pub claim_id: i64,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
}
