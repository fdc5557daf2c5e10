//! Progress claim calculations.
//!
//! Two worksheets share the rate resolver and rounding helpers: the simple
//! worksheet claims a percentage of the whole contract and deducts
//! retention, the itemized worksheet sums a schedule of works with
//! variations and credits and stops at the GST-inclusive total.

pub mod aggregate;
pub mod calculator;
pub mod common;
pub mod itemized;
pub mod rates;
pub mod simple;

pub use aggregate::{
    ClaimItemInput, ClaimItemLine, CreditInput, CreditLine, LineItemAggregator, LineItemTotals,
    VariationInput, VariationLine,
};
pub use calculator::{SimpleClaimCalculator, SimpleClaimDraft};
pub use itemized::{ItemizedClaimInput, ItemizedClaimResult, ItemizedClaimWorksheet};
pub use rates::{ProjectRates, RateError};
pub use simple::{SimpleClaimInput, SimpleClaimResult, SimpleClaimWorksheet};
