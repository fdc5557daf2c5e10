//! Validation of raw claim form input.
//!
//! Forms hold exactly what the user typed. `validate` turns a form into the
//! typed worksheet input, or a [`ValidationError`] listing every offending
//! field. Nothing is computed from a form that fails validation.
//!
//! Numbers accept a comma thousands separator (`"1,234.56"`). Blank optional
//! amounts read as zero.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::calculations::common::{MAX_AMOUNT, within_amount_range};
use crate::calculations::{
    ClaimItemInput, CreditInput, ItemizedClaimInput, SimpleClaimInput, VariationInput,
};
use crate::models::{ClaimHeader, ClaimStatus};

/// One rejected field, e.g. `items[2].percent_complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid claim input: {}", join(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parses a decimal, ignoring surrounding whitespace and comma separators.
pub fn parse_decimal(text: &str) -> Result<Decimal, rust_decimal::Error> {
    text.trim().replace(',', "").parse()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimHeaderForm {
    pub number: String,
    /// Blank means `draft`.
    pub status: String,
    /// `YYYY-MM-DD`
    pub month_ending: String,
    pub contact_person: String,
    pub subcontract_reference: String,
    pub description: String,
}

impl ClaimHeaderForm {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            ..Default::default()
        }
    }

    fn check(
        &self,
        checker: &mut Checker,
    ) -> ClaimHeader {
        let number = checker.required_text("number", &self.number);
        ClaimHeader {
            number,
            status: checker.status("status", &self.status),
            month_ending: checker.optional_date("month_ending", &self.month_ending),
            contact_person: optional_text(&self.contact_person),
            subcontract_reference: optional_text(&self.subcontract_reference),
            description: optional_text(&self.description),
            period_from: None,
            period_to: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleClaimForm {
    pub header: ClaimHeaderForm,
    pub percent_complete: String,
    pub previous_claim: String,
}

impl SimpleClaimForm {
    pub fn validate(&self) -> Result<(ClaimHeader, SimpleClaimInput), ValidationError> {
        let mut checker = Checker::default();
        let header = self.header.check(&mut checker);
        let percent_complete = checker.percent("percent_complete", &self.percent_complete, true);
        let previous_claim = checker.amount("previous_claim", &self.previous_claim, false);
        let previous_claim = checker.non_negative("previous_claim", previous_claim);

        checker.finish((
            header,
            SimpleClaimInput {
                percent_complete,
                previous_claim,
            },
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimItemForm {
    pub description: String,
    pub contract_value: String,
    pub percent_complete: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationForm {
    pub description: String,
    pub quantity: String,
    pub rate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditForm {
    pub description: String,
    pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemizedClaimForm {
    pub header: ClaimHeaderForm,
    pub items: Vec<ClaimItemForm>,
    pub variations: Vec<VariationForm>,
    pub credits: Vec<CreditForm>,
    pub payment_received: String,
}

impl ItemizedClaimForm {
    pub fn validate(&self) -> Result<(ClaimHeader, ItemizedClaimInput), ValidationError> {
        let mut checker = Checker::default();
        let header = self.header.check(&mut checker);

        if self.items.is_empty() {
            checker.reject("items", "at least one claim item is required");
        }

        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let field = |name: &str| format!("items[{i}].{name}");
                let contract_value =
                    checker.amount(&field("contract_value"), &row.contract_value, true);
                ClaimItemInput {
                    description: checker.required_text(&field("description"), &row.description),
                    contract_value: checker.non_negative(&field("contract_value"), contract_value),
                    percent_complete: checker.percent(
                        &field("percent_complete"),
                        &row.percent_complete,
                        false,
                    ),
                }
            })
            .collect();

        let variations = self
            .variations
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let field = |name: &str| format!("variations[{i}].{name}");
                let description = checker.required_text(&field("description"), &row.description);
                let quantity = checker.amount(&field("quantity"), &row.quantity, false);
                let rate = checker.amount(&field("rate"), &row.rate, false);
                // Both factors are in range, so the product cannot overflow.
                if !within_amount_range(quantity * rate) {
                    checker.reject(&field("rate"), "quantity × rate exceeds the supported range");
                }
                VariationInput {
                    description,
                    quantity,
                    rate,
                }
            })
            .collect();

        let credits = self
            .credits
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let field = |name: &str| format!("credits[{i}].{name}");
                CreditInput {
                    description: checker.required_text(&field("description"), &row.description),
                    amount: checker.amount(&field("amount"), &row.amount, false),
                }
            })
            .collect();

        let payment_received = checker.amount("payment_received", &self.payment_received, false);

        checker.finish((
            header,
            ItemizedClaimInput {
                items,
                variations,
                credits,
                payment_received,
            },
        ))
    }
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Collects field errors while substituting zero for rejected values.
#[derive(Debug, Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn reject(
        &mut self,
        field: &str,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn required_text(
        &mut self,
        field: &str,
        value: &str,
    ) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.reject(field, "is required");
        }
        trimmed.to_string()
    }

    fn amount(
        &mut self,
        field: &str,
        value: &str,
        required: bool,
    ) -> Decimal {
        if value.trim().is_empty() {
            if required {
                self.reject(field, "is required");
            }
            return Decimal::ZERO;
        }
        match parse_decimal(value) {
            Ok(amount) if within_amount_range(amount) => amount,
            Ok(_) => {
                self.reject(field, format!("must be between -{MAX_AMOUNT} and {MAX_AMOUNT}"));
                Decimal::ZERO
            }
            Err(_) => {
                self.reject(field, format!("'{}' is not a number", value.trim()));
                Decimal::ZERO
            }
        }
    }

    fn non_negative(
        &mut self,
        field: &str,
        amount: Decimal,
    ) -> Decimal {
        if amount < Decimal::ZERO {
            self.reject(field, "must not be negative");
        }
        amount
    }

    fn percent(
        &mut self,
        field: &str,
        value: &str,
        required: bool,
    ) -> Decimal {
        let percent = self.amount(field, value, required);
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            self.reject(field, "must be between 0 and 100");
        }
        percent
    }

    fn status(
        &mut self,
        field: &str,
        value: &str,
    ) -> ClaimStatus {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return ClaimStatus::default();
        }
        ClaimStatus::parse(&trimmed.to_ascii_lowercase()).unwrap_or_else(|| {
            self.reject(field, format!("'{trimmed}' is not a claim status"));
            ClaimStatus::default()
        })
    }

    fn optional_date(
        &mut self,
        field: &str,
        value: &str,
    ) -> Option<DateTime<Utc>> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => Some(date.and_time(chrono::NaiveTime::MIN).and_utc()),
            Err(_) => {
                self.reject(field, format!("'{trimmed}' is not a YYYY-MM-DD date"));
                None
            }
        }
    }

    fn finish<T>(
        self,
        value: T,
    ) -> Result<T, ValidationError> {
        if self.errors.is_empty() {
            return Ok(value);
        }
        let error = ValidationError {
            errors: self.errors,
        };
        warn!(%error, "claim input rejected");
        Err(error)
    }
}
