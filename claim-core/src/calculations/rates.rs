//! Rate resolution: turns a project's GST and retention percentages into
//! the fractional rates the worksheets multiply by.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::calculations::common::{MAX_AMOUNT, percent_to_rate, within_amount_range};
use crate::models::{DEFAULT_GST_RATE, DEFAULT_RETENTION_RATE, Project};

/// Errors raised while resolving project rates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateError {
    /// The rate text was not a decimal number.
    #[error("{field} rate '{value}' is not a number")]
    NotANumber { field: &'static str, value: String },

    /// The percentage is below zero.
    #[error("{field} rate must not be negative, got {value}")]
    Negative { field: &'static str, value: Decimal },

    /// The percentage is above [`MAX_RATE_PERCENT`].
    #[error("{field} rate must be at most {max} percent, got {value}")]
    TooLarge {
        field: &'static str,
        value: Decimal,
        max: Decimal,
    },

    /// The project's contract value is outside `±MAX_AMOUNT`.
    #[error("project total value {value} is outside the supported range of ±{max}")]
    TotalValueOutOfRange { value: Decimal, max: Decimal },
}

/// Highest rate percentage accepted. Rates between 100 and this are unusual
/// but allowed.
pub const MAX_RATE_PERCENT: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Fractional GST and retention rates (`0.10` for 10 %).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRates {
    pub gst: Decimal,
    pub retention: Decimal,
}

impl Default for ProjectRates {
    fn default() -> Self {
        Self {
            gst: percent_to_rate(DEFAULT_GST_RATE),
            retention: percent_to_rate(DEFAULT_RETENTION_RATE),
        }
    }
}

impl ProjectRates {
    /// Resolves rates from percentages, rejecting negative values.
    ///
    /// Percentages above 100 are unusual but accepted with a warning.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use claim_core::calculations::ProjectRates;
    ///
    /// let rates = ProjectRates::from_percentages(dec!(10.00), dec!(5.00)).unwrap();
    /// assert_eq!(rates.gst, dec!(0.10));
    /// assert_eq!(rates.retention, dec!(0.05));
    /// ```
    pub fn from_percentages(
        gst_percent: Decimal,
        retention_percent: Decimal,
    ) -> Result<Self, RateError> {
        Ok(Self {
            gst: percent_to_rate(check_rate("GST", gst_percent)?),
            retention: percent_to_rate(check_rate("retention", retention_percent)?),
        })
    }

    /// Resolves rates from a stored project, also checking that its total
    /// value is in range for the worksheets.
    pub fn for_project(project: &Project) -> Result<Self, RateError> {
        if !within_amount_range(project.total_value) {
            return Err(RateError::TotalValueOutOfRange {
                value: project.total_value,
                max: MAX_AMOUNT,
            });
        }
        Self::from_percentages(project.gst_rate, project.retention_rate)
    }

    /// Resolves rates from percentage strings such as `"10.00"`.
    ///
    /// A missing (blank) value falls back to the default rate for that field.
    pub fn parse(
        gst_percent: Option<&str>,
        retention_percent: Option<&str>,
    ) -> Result<Self, RateError> {
        let gst = parse_percent("GST", gst_percent, DEFAULT_GST_RATE)?;
        let retention = parse_percent("retention", retention_percent, DEFAULT_RETENTION_RATE)?;
        Self::from_percentages(gst, retention)
    }
}

fn parse_percent(
    field: &'static str,
    value: Option<&str>,
    default: Decimal,
) -> Result<Decimal, RateError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(text) => text.parse().map_err(|_| RateError::NotANumber {
            field,
            value: text.to_string(),
        }),
    }
}

fn check_rate(
    field: &'static str,
    percent: Decimal,
) -> Result<Decimal, RateError> {
    if percent < Decimal::ZERO {
        return Err(RateError::Negative {
            field,
            value: percent,
        });
    }
    if percent > MAX_RATE_PERCENT {
        return Err(RateError::TooLarge {
            field,
            value: percent,
            max: MAX_RATE_PERCENT,
        });
    }
    if percent > Decimal::ONE_HUNDRED {
        warn!(field, %percent, "rate above 100 percent");
    }
    Ok(percent)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn default_rates_are_ten_and_five_percent() {
        let rates = ProjectRates::default();

        assert_eq!(rates.gst, dec!(0.10));
        assert_eq!(rates.retention, dec!(0.05));
    }

    #[test]
    fn parse_reads_percentage_strings() {
        let rates = ProjectRates::parse(Some("15.00"), Some("2.5")).unwrap();

        assert_eq!(rates.gst, dec!(0.15));
        assert_eq!(rates.retention, dec!(0.025));
    }

    #[test]
    fn parse_defaults_missing_rates() {
        let rates = ProjectRates::parse(None, Some("  ")).unwrap();

        assert_eq!(rates, ProjectRates::default());
    }

    #[test]
    fn parse_rejects_non_numeric_rate() {
        let result = ProjectRates::parse(Some("ten"), None);

        assert_eq!(
            result,
            Err(RateError::NotANumber {
                field: "GST",
                value: "ten".to_string(),
            })
        );
    }

    #[test]
    fn negative_rate_is_rejected() {
        let result = ProjectRates::from_percentages(dec!(10), dec!(-1));

        assert_eq!(
            result,
            Err(RateError::Negative {
                field: "retention",
                value: dec!(-1),
            })
        );
    }

    #[test]
    fn zero_and_hundred_percent_are_accepted() {
        let rates = ProjectRates::from_percentages(dec!(0), dec!(100)).unwrap();

        assert_eq!(rates.gst, dec!(0));
        assert_eq!(rates.retention, dec!(1));
    }

    #[test]
    fn rate_above_hundred_percent_is_accepted() {
        let rates = ProjectRates::from_percentages(dec!(10), dec!(125)).unwrap();

        assert_eq!(rates.retention, dec!(1.25));
    }

    #[test]
    fn rate_above_the_cap_is_rejected() {
        let result = ProjectRates::from_percentages(dec!(1000000000000), dec!(5));

        assert_eq!(
            result,
            Err(RateError::TooLarge {
                field: "GST",
                value: dec!(1000000000000),
                max: MAX_RATE_PERCENT,
            })
        );
        assert!(ProjectRates::from_percentages(dec!(1000), dec!(5)).is_ok());
    }

    #[test]
    fn project_with_huge_total_value_is_rejected() {
        let project = Project {
            id: 1,
            name: "Runaway".to_string(),
            description: None,
            total_value: Decimal::MAX,
            gst_rate: dec!(10),
            retention_rate: dec!(5),
            status: Default::default(),
            retention_schedule: Default::default(),
            created_at: chrono::Utc::now(),
        };

        assert_eq!(
            ProjectRates::for_project(&project),
            Err(RateError::TotalValueOutOfRange {
                value: Decimal::MAX,
                max: MAX_AMOUNT,
            })
        );
    }
}
