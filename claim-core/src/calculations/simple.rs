//! Simple (single-line) progress claim worksheet.
//!
//! | Line | Description |
//! |------|-------------|
//! | 1    | Contract work to date (contract value × % complete) |
//! | 2    | Previous claims |
//! | 3    | This claim, ex GST (Line 1 − Line 2, minimum 0) |
//! | 4    | GST (Line 3 × GST rate) |
//! | 5    | Total including GST (Line 3 + Line 4) |
//! | 6    | Retention held (Line 3 × retention rate) |
//! | 7    | Amount due (Line 5 − Line 6) |
//!
//! Line 3 is floored at zero. Line 7 is not: when retention exceeds the
//! GST-inclusive claim the negative amount is reported as-is.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use claim_core::calculations::{ProjectRates, SimpleClaimInput, SimpleClaimWorksheet};
//!
//! let worksheet = SimpleClaimWorksheet::new(dec!(1500000), ProjectRates::default());
//! let result = worksheet.calculate(&SimpleClaimInput {
//!     percent_complete: dec!(75),
//!     previous_claim: dec!(0),
//! });
//!
//! assert_eq!(result.contract_work, dec!(1125000));
//! assert_eq!(result.this_claim, dec!(1125000));
//! assert_eq!(result.gst, dec!(112500));
//! assert_eq!(result.total_inc_gst, dec!(1237500));
//! assert_eq!(result.retention_held, dec!(56250));
//! assert_eq!(result.amount_due, dec!(1181250));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::common::{percent_of, round_currency};
use crate::calculations::rates::ProjectRates;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleClaimInput {
    /// Percent of the whole contract complete to date.
    pub percent_complete: Decimal,
    /// Amount claimed before this claim.
    pub previous_claim: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleClaimResult {
    pub contract_work: Decimal,
    pub previous_claim: Decimal,
    /// This claim excluding GST.
    pub this_claim: Decimal,
    pub gst: Decimal,
    pub total_inc_gst: Decimal,
    pub retention_held: Decimal,
    pub amount_due: Decimal,
}

impl SimpleClaimResult {
    /// Ex-GST total of this claim; the same figure as `this_claim`.
    pub fn total_ex_gst(&self) -> Decimal {
        self.this_claim
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimpleClaimWorksheet {
    total_value: Decimal,
    rates: ProjectRates,
}

impl SimpleClaimWorksheet {
    /// `total_value` is the project's ex-GST contract value.
    pub fn new(
        total_value: Decimal,
        rates: ProjectRates,
    ) -> Self {
        Self { total_value, rates }
    }

    pub fn calculate(
        &self,
        input: &SimpleClaimInput,
    ) -> SimpleClaimResult {
        let contract_work = self.contract_work(input.percent_complete);
        let previous_claim = round_currency(input.previous_claim);
        let this_claim = self.this_claim(contract_work, previous_claim);
        let gst = round_currency(this_claim * self.rates.gst);
        let total_inc_gst = this_claim + gst;
        let retention_held = round_currency(this_claim * self.rates.retention);
        let amount_due = total_inc_gst - retention_held;

        debug!(
            percent_complete = %input.percent_complete,
            %this_claim,
            %amount_due,
            "simple claim recalculated"
        );

        SimpleClaimResult {
            contract_work,
            previous_claim,
            this_claim,
            gst,
            total_inc_gst,
            retention_held,
            amount_due,
        }
    }

    fn contract_work(
        &self,
        percent_complete: Decimal,
    ) -> Decimal {
        round_currency(percent_of(self.total_value, percent_complete))
    }

    fn this_claim(
        &self,
        contract_work: Decimal,
        previous_claim: Decimal,
    ) -> Decimal {
        (contract_work - previous_claim).max(round_currency(Decimal::ZERO))
    }
}
