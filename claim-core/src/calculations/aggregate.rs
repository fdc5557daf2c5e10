//! Line-item aggregation for itemized progress claims.
//!
//! Each row's derived figures are rounded to cents for display and storage.
//! The totals are taken from the exact, unrounded row values and rounded once,
//! so they can differ by a few cents from adding up the stored rows. Summing
//! rounded rows instead lets half-cent rows drift upward without bound.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{percent_of, round_currency};

/// One row of the schedule of works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimItemInput {
    pub description: String,
    pub contract_value: Decimal,
    /// Percent complete to date, `0..=100` when entered through a form.
    pub percent_complete: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationInput {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditInput {
    pub description: String,
    pub amount: Decimal,
}

/// Derived figures for a single claim item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimItemLine {
    pub description: String,
    pub contract_value: Decimal,
    pub percent_complete: Decimal,
    /// `contract_value × percent_complete / 100`.
    pub this_claim: Decimal,
    /// `contract_value − this_claim`.
    pub left_to_claim: Decimal,
    pub sort_order: i32,
}

impl ClaimItemLine {
    pub fn from_input(
        input: &ClaimItemInput,
        sort_order: i32,
    ) -> Self {
        let this_claim = round_currency(percent_of(input.contract_value, input.percent_complete));
        Self {
            description: input.description.clone(),
            contract_value: round_currency(input.contract_value),
            percent_complete: input.percent_complete,
            this_claim,
            left_to_claim: round_currency(input.contract_value - this_claim),
            sort_order,
        }
    }
}

/// Derived figures for a single variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationLine {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    /// `quantity × rate`.
    pub variation_value: Decimal,
}

impl VariationLine {
    pub fn from_input(input: &VariationInput) -> Self {
        Self {
            description: input.description.clone(),
            quantity: input.quantity,
            rate: input.rate,
            variation_value: round_currency(input.quantity * input.rate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLine {
    pub description: String,
    pub amount: Decimal,
}

impl CreditLine {
    pub fn from_input(input: &CreditInput) -> Self {
        Self {
            description: input.description.clone(),
            amount: round_currency(input.amount),
        }
    }
}

/// Every row of an itemized claim with its derived figures, plus the sums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemTotals {
    pub items: Vec<ClaimItemLine>,
    pub variations: Vec<VariationLine>,
    pub credits: Vec<CreditLine>,
    pub total_works_completed: Decimal,
    pub total_variations: Decimal,
    pub total_credits: Decimal,
}

/// Sums claim items, variations and credits.
///
/// The aggregator does no validation: an out-of-range percentage or a
/// negative quantity flows through the arithmetic unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineItemAggregator;

impl LineItemAggregator {
    /// ```
    /// use rust_decimal_macros::dec;
    /// use claim_core::calculations::{ClaimItemInput, LineItemAggregator};
    ///
    /// let items = vec![
    ///     ClaimItemInput {
    ///         description: "FOOTINGS".into(),
    ///         contract_value: dec!(500000),
    ///         percent_complete: dec!(100),
    ///     },
    ///     ClaimItemInput {
    ///         description: "WAREHOUSE".into(),
    ///         contract_value: dec!(300000),
    ///         percent_complete: dec!(50),
    ///     },
    /// ];
    ///
    /// let totals = LineItemAggregator.aggregate(&items, &[], &[]);
    /// assert_eq!(totals.total_works_completed, dec!(650000));
    /// assert_eq!(totals.items[1].left_to_claim, dec!(150000));
    /// ```
    pub fn aggregate(
        &self,
        items: &[ClaimItemInput],
        variations: &[VariationInput],
        credits: &[CreditInput],
    ) -> LineItemTotals {
        let total_works_completed = round_currency(
            items
                .iter()
                .map(|item| percent_of(item.contract_value, item.percent_complete))
                .sum(),
        );
        let total_variations = round_currency(
            variations
                .iter()
                .map(|variation| variation.quantity * variation.rate)
                .sum(),
        );
        let total_credits = round_currency(credits.iter().map(|credit| credit.amount).sum());

        let items: Vec<ClaimItemLine> = items
            .iter()
            .zip(0..)
            .map(|(item, sort_order)| ClaimItemLine::from_input(item, sort_order))
            .collect();
        let variations: Vec<VariationLine> =
            variations.iter().map(VariationLine::from_input).collect();
        let credits: Vec<CreditLine> = credits.iter().map(CreditLine::from_input).collect();

        LineItemTotals {
            total_works_completed,
            total_variations,
            total_credits,
            items,
            variations,
            credits,
        }
    }
}
