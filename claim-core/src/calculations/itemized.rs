//! Itemized progress claim worksheet.
//!
//! | Line | Description |
//! |------|-------------|
//! | 1    | Total works completed (Σ contract value × % complete) |
//! | 2    | Total variations (Σ quantity × rate) |
//! | 3    | Total credits (Σ amount) |
//! | 4    | Payment already received |
//! | 5    | Sub-total (Line 1 + Line 2 − Line 3 − Line 4) |
//! | 6    | GST (Line 5 × GST rate) |
//! | 7    | Total including GST (Line 5 + Line 6) |
//!
//! Retention is not deducted on this worksheet. The sub-total is not floored
//! and goes negative when credits and payments exceed the work claimed.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use claim_core::calculations::{
//!     ClaimItemInput, ItemizedClaimInput, ItemizedClaimWorksheet, ProjectRates,
//! };
//!
//! let input = ItemizedClaimInput {
//!     items: vec![
//!         ClaimItemInput {
//!             description: "FOOTINGS".into(),
//!             contract_value: dec!(500000),
//!             percent_complete: dec!(100),
//!         },
//!         ClaimItemInput {
//!             description: "WAREHOUSE".into(),
//!             contract_value: dec!(300000),
//!             percent_complete: dec!(50),
//!         },
//!     ],
//!     variations: vec![],
//!     credits: vec![],
//!     payment_received: dec!(0),
//! };
//!
//! let worksheet = ItemizedClaimWorksheet::new(ProjectRates::default());
//! let result = worksheet.calculate(&input);
//!
//! assert_eq!(result.sub_total, dec!(650000));
//! assert_eq!(result.gst, dec!(65000));
//! assert_eq!(result.total_inc_gst, dec!(715000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::aggregate::{
    ClaimItemInput, CreditInput, LineItemAggregator, LineItemTotals, VariationInput,
};
use crate::calculations::common::round_currency;
use crate::calculations::rates::ProjectRates;

/// Typed inputs of the itemized claim form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemizedClaimInput {
    pub items: Vec<ClaimItemInput>,
    pub variations: Vec<VariationInput>,
    pub credits: Vec<CreditInput>,
    /// Payments already received against this contract.
    pub payment_received: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemizedClaimResult {
    /// Per-row figures and the three column totals.
    pub lines: LineItemTotals,
    pub payment_received: Decimal,
    pub sub_total: Decimal,
    pub gst: Decimal,
    pub total_inc_gst: Decimal,
}

impl ItemizedClaimResult {
    pub fn total_works_completed(&self) -> Decimal {
        self.lines.total_works_completed
    }

    pub fn total_variations(&self) -> Decimal {
        self.lines.total_variations
    }

    pub fn total_credits(&self) -> Decimal {
        self.lines.total_credits
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ItemizedClaimWorksheet {
    rates: ProjectRates,
}

impl ItemizedClaimWorksheet {
    pub fn new(rates: ProjectRates) -> Self {
        Self { rates }
    }

    /// Recomputes every line from scratch. Calling it twice with the same
    /// input yields the same result.
    pub fn calculate(
        &self,
        input: &ItemizedClaimInput,
    ) -> ItemizedClaimResult {
        let lines = LineItemAggregator.aggregate(&input.items, &input.variations, &input.credits);
        let payment_received = round_currency(input.payment_received);

        let sub_total = self.sub_total(&lines, payment_received);
        let gst = self.gst(sub_total);
        let total_inc_gst = sub_total + gst;

        debug!(
            items = lines.items.len(),
            variations = lines.variations.len(),
            credits = lines.credits.len(),
            %sub_total,
            %total_inc_gst,
            "itemized claim recalculated"
        );

        ItemizedClaimResult {
            lines,
            payment_received,
            sub_total,
            gst,
            total_inc_gst,
        }
    }

    fn sub_total(
        &self,
        lines: &LineItemTotals,
        payment_received: Decimal,
    ) -> Decimal {
        round_currency(
            lines.total_works_completed + lines.total_variations
                - lines.total_credits
                - payment_received,
        )
    }

    fn gst(
        &self,
        sub_total: Decimal,
    ) -> Decimal {
        round_currency(sub_total * self.rates.gst)
    }
}
