//! Command handlers. Each returns the text to print so the handlers can be
//! driven from tests without capturing stdout.

use std::fmt::Display;

use anyhow::{Context, Result, anyhow, bail, ensure};
use claim_core::calculations::ProjectRates;
use claim_core::calculations::common::{MAX_AMOUNT, round_currency, within_amount_range};
use claim_core::db::{MemoryRepositoryFactory, RepositoryRegistry};
use claim_core::input::{ClaimHeaderForm, SimpleClaimForm, parse_decimal};
use claim_core::submission::{ClaimSubmitter, SubmittedClaim};
use claim_core::{
    ClaimRepository, ClaimStatus, DEFAULT_GST_RATE, DEFAULT_RETENTION_RATE, NewAttachment,
    NewProject, Project, ProjectStatus, RetentionSchedule,
};
use claim_db_sqlite::SqliteRepositoryFactory;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{
    AttachmentCommand, ClaimCommand, ClaimHeaderArgs, Command, ItemizedClaimArgs,
    ProjectAddArgs, ProjectCommand, ProjectUpdateArgs, RetentionScheduleArgs, SimpleClaimArgs,
};
use crate::config::AppConfig;
use crate::display::{
    AttachmentTable, ClaimDetail, ClaimTable, ItemizedPreview, ProjectDetail, ProjectTable,
    SimplePreview,
};
use crate::sheet_loader;

/// Registry with every backend this binary ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(MemoryRepositoryFactory));
    registry
}

pub async fn run(
    repo: &dyn ClaimRepository,
    config: &AppConfig,
    command: Command,
    json: bool,
) -> Result<String> {
    let out = Output { json };
    match command {
        Command::Project(cmd) => run_project(repo, config, cmd, out).await,
        Command::Claim(cmd) => run_claim(repo, cmd, out).await,
        Command::Attachment(cmd) => run_attachment(repo, cmd, out).await,
    }
}

#[derive(Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn render<T: Serialize + ?Sized>(
        self,
        value: &T,
        text: impl Display,
    ) -> Result<String> {
        if self.json {
            serde_json::to_string_pretty(value).context("Failed to serialize output")
        } else {
            Ok(text.to_string())
        }
    }
}

async fn run_project(
    repo: &dyn ClaimRepository,
    config: &AppConfig,
    cmd: ProjectCommand,
    out: Output,
) -> Result<String> {
    match cmd {
        ProjectCommand::Add(args) => {
            let project = repo.create_project(new_project(config, args)?).await?;
            info!(project_id = project.id, name = %project.name, "project created");
            out.render(&project, ProjectDetail { project: &project, claims: &[] })
        }
        ProjectCommand::Update(args) => {
            let id = args.id;
            let mut project = repo
                .get_project(id)
                .await
                .with_context(|| format!("project {id}"))?;
            apply_update(&mut project, args)?;
            repo.update_project(&project)
                .await
                .with_context(|| format!("project {id}"))?;
            info!(project_id = id, status = project.status.as_str(), "project updated");
            let claims = repo.list_claims_for_project(id).await?;
            out.render(&project, ProjectDetail { project: &project, claims: &claims })
        }
        ProjectCommand::List => {
            let projects = repo.list_projects().await?;
            out.render(&projects, ProjectTable(&projects))
        }
        ProjectCommand::Show { id } => {
            let project = repo
                .get_project(id)
                .await
                .with_context(|| format!("project {id}"))?;
            let claims = repo.list_claims_for_project(id).await?;
            out.render(&project, ProjectDetail { project: &project, claims: &claims })
        }
        ProjectCommand::Delete { id } => {
            repo.delete_project(id)
                .await
                .with_context(|| format!("project {id}"))?;
            info!(project_id = id, "project deleted");
            Ok(format!("Deleted project {id} and its claims.\n"))
        }
    }
}

/// Builds the new project, taking each rate from the flag, then the config
/// file, then the built-in default.
fn new_project(
    config: &AppConfig,
    args: ProjectAddArgs,
) -> Result<NewProject> {
    let name = project_name(&args.name)?;
    let total_value = contract_value(&args.total_value)?;

    let gst_rate = resolve_rate(
        "GST rate",
        args.gst_rate.as_deref(),
        config.defaults.gst_rate,
        DEFAULT_GST_RATE,
    )?;
    let retention_rate = resolve_rate(
        "retention rate",
        args.retention_rate.as_deref(),
        config.defaults.retention_rate,
        DEFAULT_RETENTION_RATE,
    )?;
    ProjectRates::from_percentages(gst_rate, retention_rate)?;

    let mut project = NewProject::new(name, total_value);
    project.gst_rate = gst_rate;
    project.retention_rate = retention_rate;
    project.description = args.description.as_deref().and_then(trimmed);
    Ok(project)
}

/// Applies the given flags to a stored project. Changed fields pass the same
/// checks as `new_project`; the rest keep their stored value.
fn apply_update(
    project: &mut Project,
    args: ProjectUpdateArgs,
) -> Result<()> {
    if let Some(name) = &args.name {
        project.name = project_name(name)?;
    }
    if let Some(text) = &args.total_value {
        project.total_value = contract_value(text)?;
    }
    if let Some(text) = &args.gst_rate {
        project.gst_rate = parse_rate("GST rate", text)?;
    }
    if let Some(text) = &args.retention_rate {
        project.retention_rate = parse_rate("retention rate", text)?;
    }
    ProjectRates::from_percentages(project.gst_rate, project.retention_rate)?;

    if let Some(text) = &args.status {
        project.status = ProjectStatus::parse(&text.trim().to_ascii_lowercase().replace('-', "_"))
            .ok_or_else(|| {
                anyhow!("unknown project status '{text}', expected active, completed or on_hold")
            })?;
    }
    if let Some(text) = &args.description {
        project.description = trimmed(text);
    }
    apply_retention(&mut project.retention_schedule, &args.retention)
}

fn apply_retention(
    schedule: &mut RetentionSchedule,
    args: &RetentionScheduleArgs,
) -> Result<()> {
    let shares = [
        (&args.retention_per_claim, "retention per claim", &mut schedule.per_claim_percent),
        (&args.retention_collect_until, "retention limit", &mut schedule.collect_until_percent),
        (&args.retention_first_release, "first release", &mut schedule.first_release_percent),
        (&args.retention_final_release, "final release", &mut schedule.final_release_percent),
    ];
    for (flag, label, field) in shares {
        if let Some(text) = flag {
            *field = retention_share(label, text)?;
        }
    }

    if let Some(text) = &args.retention_first_release_timing {
        schedule.first_release_timing = trimmed(text);
    }
    if let Some(text) = &args.retention_final_release_timing {
        schedule.final_release_timing = trimmed(text);
    }
    if let Some(text) = &args.dlp_months {
        schedule.dlp_months = match text.trim() {
            "" => None,
            months => {
                let months: i32 = months.parse().map_err(|_| {
                    anyhow!("defects liability period '{months}' is not a whole number of months")
                })?;
                ensure!(months >= 0, "defects liability period must not be negative");
                Some(months)
            }
        };
    }
    Ok(())
}

/// A retention percentage in `0..=100`, or `None` when blank.
fn retention_share(
    label: &str,
    text: &str,
) -> Result<Option<Decimal>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let percent = parse_rate(label, text)?;
    ensure!(
        (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&percent),
        "{label} must be between 0 and 100, got {percent}"
    );
    Ok(Some(percent))
}

fn project_name(text: &str) -> Result<String> {
    let name = text.trim();
    ensure!(!name.is_empty(), "project name must not be blank");
    Ok(name.to_string())
}

fn contract_value(text: &str) -> Result<Decimal> {
    let total_value = parse_amount("total value", text)?;
    ensure!(
        total_value >= Decimal::ZERO,
        "total value must not be negative, got {total_value}"
    );
    ensure!(
        within_amount_range(total_value),
        "total value must be at most {MAX_AMOUNT}, got {total_value}"
    );
    Ok(round_currency(total_value))
}

fn resolve_rate(
    label: &str,
    flag: Option<&str>,
    configured: Option<Decimal>,
    default: Decimal,
) -> Result<Decimal> {
    match flag {
        Some(text) => parse_rate(label, text),
        None => whole_cents(label, configured.unwrap_or(default)),
    }
}

fn parse_rate(
    label: &str,
    text: &str,
) -> Result<Decimal> {
    whole_cents(label, parse_amount(label, text)?)
}

/// Rates are stored with two decimal places; finer values are refused
/// rather than rounded.
fn whole_cents(
    label: &str,
    percent: Decimal,
) -> Result<Decimal> {
    ensure!(
        percent.normalize().scale() <= 2,
        "{label} {percent} has more than two decimal places"
    );
    Ok(round_currency(percent))
}

fn trimmed(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_amount(
    label: &str,
    text: &str,
) -> Result<Decimal> {
    parse_decimal(text).map_err(|_| anyhow!("{label} '{}' is not a number", text.trim()))
}

async fn run_claim(
    repo: &dyn ClaimRepository,
    cmd: ClaimCommand,
    out: Output,
) -> Result<String> {
    match cmd {
        ClaimCommand::Simple(args) => simple_claim(repo, args, out).await,
        ClaimCommand::Itemized(args) => itemized_claim(repo, args, out).await,
        ClaimCommand::List { project } => {
            let claims = repo
                .list_claims_for_project(project)
                .await
                .with_context(|| format!("claims for project {project}"))?;
            out.render(&claims, ClaimTable(&claims))
        }
        ClaimCommand::Recent { limit } => {
            let claims = repo.list_recent_claims(limit).await?;
            out.render(&claims, ClaimTable(&claims))
        }
        ClaimCommand::Show { id } => show_claim(repo, id, out).await,
        ClaimCommand::Status { id, status } => {
            let parsed = ClaimStatus::parse(&status.trim().to_ascii_lowercase())
                .ok_or_else(|| {
                    anyhow!(
                        "unknown claim status '{status}', expected draft, pending, approved or rejected"
                    )
                })?;
            repo.update_claim_status(id, parsed)
                .await
                .with_context(|| format!("claim {id}"))?;
            info!(claim_id = id, status = parsed.as_str(), "claim status changed");
            show_claim(repo, id, out).await
        }
    }
}

fn header_form(args: ClaimHeaderArgs) -> ClaimHeaderForm {
    ClaimHeaderForm {
        number: args.number,
        status: args.status,
        month_ending: args.month_ending.unwrap_or_default(),
        contact_person: args.contact.unwrap_or_default(),
        subcontract_reference: args.reference.unwrap_or_default(),
        description: args.description.unwrap_or_default(),
    }
}

async fn simple_claim(
    repo: &dyn ClaimRepository,
    args: SimpleClaimArgs,
    out: Output,
) -> Result<String> {
    let form = SimpleClaimForm {
        header: header_form(args.header),
        percent_complete: args.percent,
        previous_claim: args.previous.unwrap_or_default(),
    };

    let submitter = ClaimSubmitter::new(repo);
    let (prepared, result) = submitter.prepare_simple(args.project, &form).await?;
    if !args.submit {
        debug!(project_id = args.project, "simple claim preview only");
        return out.render(&result, SimplePreview(&result));
    }

    let submitted = submitter.submit(prepared).await?;
    render_submitted(&submitted, out)
}

async fn itemized_claim(
    repo: &dyn ClaimRepository,
    args: ItemizedClaimArgs,
    out: Output,
) -> Result<String> {
    let sheet = sheet_loader::load_from_file(&args.sheet)?;
    let form = sheet.into_form(
        header_form(args.header),
        args.payment_received.unwrap_or_default(),
    );

    let submitter = ClaimSubmitter::new(repo);
    let (prepared, result) = submitter.prepare_itemized(args.project, &form).await?;
    if !args.submit {
        debug!(project_id = args.project, "itemized claim preview only");
        return out.render(&result, ItemizedPreview(&result));
    }

    let submitted = submitter.submit(prepared).await?;
    render_submitted(&submitted, out)
}

fn render_submitted(
    submitted: &SubmittedClaim,
    out: Output,
) -> Result<String> {
    let detail = ClaimDetail {
        claim: &submitted.claim,
        items: &submitted.items,
        variations: &submitted.variations,
        credits: &submitted.credits,
        attachments: &[],
    };
    out.render(
        submitted,
        format!("Submitted claim {}.\n\n{detail}", submitted.claim.id),
    )
}

/// Stored claim plus every row recorded against it.
#[derive(Serialize)]
struct ClaimRecord {
    #[serde(flatten)]
    submitted: SubmittedClaim,
    attachments: Vec<claim_core::Attachment>,
}

async fn show_claim(
    repo: &dyn ClaimRepository,
    id: i64,
    out: Output,
) -> Result<String> {
    let claim = repo
        .get_claim(id)
        .await
        .with_context(|| format!("claim {id}"))?;
    let record = ClaimRecord {
        submitted: SubmittedClaim {
            items: repo.list_claim_items(id).await?,
            variations: repo.list_variations(id).await?,
            credits: repo.list_credits(id).await?,
            claim,
        },
        attachments: repo.list_attachments(id).await?,
    };
    let detail = ClaimDetail {
        claim: &record.submitted.claim,
        items: &record.submitted.items,
        variations: &record.submitted.variations,
        credits: &record.submitted.credits,
        attachments: &record.attachments,
    };
    out.render(&record, detail)
}

async fn run_attachment(
    repo: &dyn ClaimRepository,
    cmd: AttachmentCommand,
    out: Output,
) -> Result<String> {
    match cmd {
        AttachmentCommand::Add {
            claim,
            file_name,
            url,
            size,
        } => {
            let file_name = file_name.trim().to_string();
            if file_name.is_empty() {
                bail!("file name must not be blank");
            }
            ensure!(size >= 0, "file size must not be negative, got {size}");
            let attachment = repo
                .create_attachment(NewAttachment {
                    claim_id: claim,
                    file_name,
                    file_url: url.trim().to_string(),
                    file_size: size,
                })
                .await
                .with_context(|| format!("attachment for claim {claim}"))?;
            info!(claim_id = claim, attachment_id = attachment.id, "attachment recorded");
            out.render(&attachment, AttachmentTable(std::slice::from_ref(&attachment)))
        }
        AttachmentCommand::List { claim } => {
            repo.get_claim(claim)
                .await
                .with_context(|| format!("claim {claim}"))?;
            let attachments = repo.list_attachments(claim).await?;
            out.render(&attachments, AttachmentTable(&attachments))
        }
    }
}
