use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Progress claim calculator for construction contracts.
///
/// Computes simple (percent of contract) and itemized (schedule of works)
/// progress claims against a stored project and optionally submits them.
#[derive(Debug, Parser)]
#[command(name = "progress-claims", version)]
pub struct Cli {
    /// Database backend to use (`sqlite` or `memory`).
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `claims.db`) or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// TOML configuration file. Defaults to `progress-claims.toml` when
    /// present in the working directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print records as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage projects.
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Compute, submit and inspect claims.
    #[command(subcommand)]
    Claim(ClaimCommand),

    /// Record supporting files against a claim.
    #[command(subcommand)]
    Attachment(AttachmentCommand),
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Create a project.
    Add(ProjectAddArgs),
    /// Change a project's details, rates, status or retention schedule.
    /// Fields without a flag keep their stored value.
    Update(ProjectUpdateArgs),
    /// List all projects.
    List,
    /// Show one project with its claims.
    Show { id: i64 },
    /// Delete a project and every claim under it.
    Delete { id: i64 },
}

#[derive(Debug, Args)]
pub struct ProjectAddArgs {
    #[arg(long)]
    pub name: String,

    /// Contract value excluding GST.
    #[arg(long)]
    pub total_value: String,

    /// GST percentage, e.g. `10`. At most two decimal places.
    #[arg(long)]
    pub gst_rate: Option<String>,

    /// Retention percentage, e.g. `5`. At most two decimal places.
    #[arg(long)]
    pub retention_rate: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProjectUpdateArgs {
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    /// Contract value excluding GST.
    #[arg(long)]
    pub total_value: Option<String>,

    /// GST percentage. At most two decimal places.
    #[arg(long)]
    pub gst_rate: Option<String>,

    /// Retention percentage. At most two decimal places.
    #[arg(long)]
    pub retention_rate: Option<String>,

    /// `active`, `completed` or `on_hold`.
    #[arg(long)]
    pub status: Option<String>,

    /// New description; an empty string clears it.
    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub retention: RetentionScheduleArgs,
}

/// Retention release policy. An empty value clears the field.
#[derive(Debug, Default, Args)]
pub struct RetentionScheduleArgs {
    /// Percentage of each claim withheld.
    #[arg(long)]
    pub retention_per_claim: Option<String>,

    /// Stop collecting once this percentage of the contract is held.
    #[arg(long)]
    pub retention_collect_until: Option<String>,

    /// Share released at practical completion.
    #[arg(long)]
    pub retention_first_release: Option<String>,

    #[arg(long)]
    pub retention_first_release_timing: Option<String>,

    /// Share released when the defects liability period ends.
    #[arg(long)]
    pub retention_final_release: Option<String>,

    #[arg(long)]
    pub retention_final_release_timing: Option<String>,

    /// Defects liability period in months.
    #[arg(long)]
    pub dlp_months: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ClaimCommand {
    /// Claim a percentage of the whole contract.
    Simple(SimpleClaimArgs),
    /// Claim against a schedule of works loaded from a CSV sheet.
    Itemized(ItemizedClaimArgs),
    /// List a project's claims, newest first.
    List {
        #[arg(long)]
        project: i64,
    },
    /// List the most recent claims across all projects.
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Show a claim with its rows and attachments.
    Show { id: i64 },
    /// Change a claim's status (draft, pending, approved, rejected).
    Status { id: i64, status: String },
}

/// Descriptive fields shared by both claim kinds.
#[derive(Debug, Args)]
pub struct ClaimHeaderArgs {
    /// Claim number, e.g. `PC-04`.
    #[arg(long)]
    pub number: String,

    #[arg(long, default_value = "pending")]
    pub status: String,

    /// Month ending date as `YYYY-MM-DD`.
    #[arg(long)]
    pub month_ending: Option<String>,

    #[arg(long)]
    pub contact: Option<String>,

    /// Subcontract reference.
    #[arg(long)]
    pub reference: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Args)]
pub struct SimpleClaimArgs {
    #[arg(long)]
    pub project: i64,

    #[command(flatten)]
    pub header: ClaimHeaderArgs,

    /// Percent of the contract complete to date.
    #[arg(long)]
    pub percent: String,

    /// Amount claimed previously.
    #[arg(long)]
    pub previous: Option<String>,

    /// Store the claim instead of only printing the preview.
    #[arg(long)]
    pub submit: bool,
}

#[derive(Debug, Args)]
pub struct ItemizedClaimArgs {
    #[arg(long)]
    pub project: i64,

    #[command(flatten)]
    pub header: ClaimHeaderArgs,

    /// CSV sheet of items, variations and credits.
    #[arg(long)]
    pub sheet: PathBuf,

    /// Payments already received.
    #[arg(long)]
    pub payment_received: Option<String>,

    /// Store the claim instead of only printing the preview.
    #[arg(long)]
    pub submit: bool,
}

#[derive(Debug, Subcommand)]
pub enum AttachmentCommand {
    /// Record a file against a claim.
    Add {
        #[arg(long)]
        claim: i64,
        #[arg(long)]
        file_name: String,
        #[arg(long)]
        url: String,
        /// Size in bytes.
        #[arg(long)]
        size: i64,
    },
    /// List a claim's attachments.
    List {
        #[arg(long)]
        claim: i64,
    },
}
