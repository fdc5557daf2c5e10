//! Live recalculation for the simple claim form.
//!
//! The calculator owns one draft. Every setter re-runs the
//! [`SimpleClaimWorksheet`] from the current inputs and stores the result
//! back into the draft, so the figures on screen always match the inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::rates::{ProjectRates, RateError};
use crate::calculations::simple::{SimpleClaimInput, SimpleClaimResult, SimpleClaimWorksheet};
use crate::models::Project;

/// Inputs and derived figures of a simple claim before it is submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleClaimDraft {
    /// `None` until the user has entered a percentage.
    pub percent_complete: Option<Decimal>,
    pub previous_claim: Decimal,
    /// Populated whenever `percent_complete` is set.
    pub result: Option<SimpleClaimResult>,
}

impl SimpleClaimDraft {
    pub fn input(&self) -> Option<SimpleClaimInput> {
        self.percent_complete.map(|percent_complete| SimpleClaimInput {
            percent_complete,
            previous_claim: self.previous_claim,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SimpleClaimCalculator {
    total_value: Decimal,
    rates: ProjectRates,
    draft: SimpleClaimDraft,
}

impl SimpleClaimCalculator {
    pub fn new(
        total_value: Decimal,
        rates: ProjectRates,
    ) -> Self {
        Self {
            total_value,
            rates,
            draft: SimpleClaimDraft::default(),
        }
    }

    pub fn for_project(project: &Project) -> Result<Self, RateError> {
        Ok(Self::new(
            project.total_value,
            ProjectRates::for_project(project)?,
        ))
    }

    pub fn draft(&self) -> &SimpleClaimDraft {
        &self.draft
    }

    pub fn into_draft(self) -> SimpleClaimDraft {
        self.draft
    }

    pub fn set_percent_complete(
        &mut self,
        percent_complete: Option<Decimal>,
    ) -> Option<&SimpleClaimResult> {
        self.draft.percent_complete = percent_complete;
        self.recalculate()
    }

    pub fn set_previous_claim(
        &mut self,
        previous_claim: Decimal,
    ) -> Option<&SimpleClaimResult> {
        self.draft.previous_claim = previous_claim;
        self.recalculate()
    }

    /// Applies a change to the owning project's value or rates.
    pub fn set_project_terms(
        &mut self,
        total_value: Decimal,
        rates: ProjectRates,
    ) -> Option<&SimpleClaimResult> {
        self.total_value = total_value;
        self.rates = rates;
        self.recalculate()
    }

    pub fn set_rates(
        &mut self,
        rates: ProjectRates,
    ) -> Option<&SimpleClaimResult> {
        self.rates = rates;
        self.recalculate()
    }

    /// Recomputes the derived figures from the current draft inputs.
    pub fn recalculate(&mut self) -> Option<&SimpleClaimResult> {
        let worksheet = SimpleClaimWorksheet::new(self.total_value, self.rates);
        self.draft.result = self.draft.input().map(|input| worksheet.calculate(&input));
        self.draft.result.as_ref()
    }
}
