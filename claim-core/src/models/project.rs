use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// GST percentage applied when a project does not specify one.
pub const DEFAULT_GST_RATE: Decimal = Decimal::from_parts(1000, 0, 0, false, 2);

/// Retention percentage applied when a project does not specify one.
pub const DEFAULT_RETENTION_RATE: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "on_hold" => Some(Self::OnHold),
            _ => None,
        }
    }
}

/// Retention release policy attached to a project.
///
/// These values describe when held retention is collected and released.
/// None of the claim arithmetic reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionSchedule {
    /// Percentage of each claim withheld as retention.
    pub per_claim_percent: Option<Decimal>,
    /// Retention stops being collected once this percentage of the contract
    /// value is held.
    pub collect_until_percent: Option<Decimal>,
    /// Share of held retention released at practical completion.
    pub first_release_percent: Option<Decimal>,
    pub first_release_timing: Option<String>,
    /// Share released at the end of the defects liability period.
    pub final_release_percent: Option<Decimal>,
    pub final_release_timing: Option<String>,
    /// Length of the defects liability period.
    pub dlp_months: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,

    /// Contract value excluding GST.
    pub total_value: Decimal,
    /// GST as a percentage, e.g. `10.00`.
    pub gst_rate: Decimal,
    /// Retention as a percentage, e.g. `5.00`.
    pub retention_rate: Decimal,
    pub status: ProjectStatus,
    pub retention_schedule: RetentionSchedule,

    pub created_at: DateTime<Utc>,
}

/// For creating new projects (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub total_value: Decimal,
    pub gst_rate: Decimal,
    pub retention_rate: Decimal,
    pub status: ProjectStatus,
    pub retention_schedule: RetentionSchedule,
}

impl NewProject {
    /// A project with the default GST and retention rates.
    pub fn new(
        name: impl Into<String>,
        total_value: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            total_value,
            gst_rate: DEFAULT_GST_RATE,
            retention_rate: DEFAULT_RETENTION_RATE,
            status: ProjectStatus::Active,
            retention_schedule: RetentionSchedule::default(),
        }
    }
}
