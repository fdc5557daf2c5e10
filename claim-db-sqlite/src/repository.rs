use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use claim_core::{
    Attachment, Claim, ClaimItem, ClaimKind, ClaimRepository, ClaimStatus, Credit, NewAttachment,
    NewClaim, NewClaimItem, NewCredit, NewProject, NewVariation, Project, ProjectStatus,
    RepositoryError, RetentionSchedule, Variation, VariationStatus,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Decode, Row, Sqlite, Type};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

const PROJECT_COLUMNS: &str = "id, name, description, total_value, gst_rate, retention_rate,
    status, retention_per_claim_percent, retention_collect_until_percent,
    retention_first_release_percent, retention_first_release_timing,
    retention_final_release_percent, retention_final_release_timing,
    retention_dlp_months, created_at";

const CLAIM_COLUMNS: &str = "id, project_id, number, kind, status, month_ending, period_from,
    period_to, contact_person, subcontract_reference, description, percent_complete,
    previous_claim, payment_received, this_claim, total_works_completed, deductions,
    sub_total, gst, total_inc_gst, retention_held, amount_due, created_at";

const CLAIM_ITEM_COLUMNS: &str = "id, claim_id, description, contract_value, percent_complete,
    claim_to_date, previous_claim, this_claim, left_to_claim, sort_order, created_at";

const VARIATION_COLUMNS: &str =
    "id, claim_id, description, quantity, rate, variation_value, subtotal, status, created_at";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens the database named by `connection_string`.
    ///
    /// Accepts `:memory:`, a `sqlite:` URL, or a bare file path. Files are
    /// created when missing. Foreign keys are always enforced.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let in_memory = matches!(connection_string, ":memory:" | "sqlite::memory:");
        let base = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else if connection_string.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(connection_string)
                .with_context(|| format!("Invalid database URL: {}", connection_string))?
        } else {
            SqliteConnectOptions::new().filename(connection_string)
        };
        let options = base.create_if_missing(true).foreign_keys(true);

        // Every connection to `:memory:` is a separate database.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", connection_string))?;
        info!(database = connection_string, "connected to sqlite");
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        debug!("database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn get<'r, T>(
    row: &'r SqliteRow,
    column: &str,
) -> Result<T, RepositoryError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))
}

fn parse_enum<T>(
    row: &SqliteRow,
    column: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, RepositoryError> {
    let text: String = get(row, column)?;
    parse(&text).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid {} value: {}", column, text))
    })
}

/// `UPDATE`/`DELETE` that touched nothing means the row does not exist.
fn require_row(rows_affected: u64) -> Result<(), RepositoryError> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

fn row_to_project(row: &SqliteRow) -> Result<Project, RepositoryError> {
    Ok(Project {
        id: get(row, "id")?,
        name: get(row, "name")?,
        description: get(row, "description")?,
        total_value: get_decimal(row, "total_value")?,
        gst_rate: get_decimal(row, "gst_rate")?,
        retention_rate: get_decimal(row, "retention_rate")?,
        status: parse_enum(row, "status", ProjectStatus::parse)?,
        retention_schedule: RetentionSchedule {
            per_claim_percent: get_optional_decimal(row, "retention_per_claim_percent")?,
            collect_until_percent: get_optional_decimal(row, "retention_collect_until_percent")?,
            first_release_percent: get_optional_decimal(row, "retention_first_release_percent")?,
            first_release_timing: get(row, "retention_first_release_timing")?,
            final_release_percent: get_optional_decimal(row, "retention_final_release_percent")?,
            final_release_timing: get(row, "retention_final_release_timing")?,
            dlp_months: get(row, "retention_dlp_months")?,
        },
        created_at: get(row, "created_at")?,
    })
}

fn row_to_claim(row: &SqliteRow) -> Result<Claim, RepositoryError> {
    Ok(Claim {
        id: get(row, "id")?,
        project_id: get(row, "project_id")?,
        number: get(row, "number")?,
        kind: parse_enum(row, "kind", ClaimKind::parse)?,
        status: parse_enum(row, "status", ClaimStatus::parse)?,
        month_ending: get(row, "month_ending")?,
        period_from: get(row, "period_from")?,
        period_to: get(row, "period_to")?,
        contact_person: get(row, "contact_person")?,
        subcontract_reference: get(row, "subcontract_reference")?,
        description: get(row, "description")?,
        percent_complete: get_decimal(row, "percent_complete")?,
        previous_claim: get_decimal(row, "previous_claim")?,
        payment_received: get_decimal(row, "payment_received")?,
        this_claim: get_decimal(row, "this_claim")?,
        total_works_completed: get_decimal(row, "total_works_completed")?,
        deductions: get_decimal(row, "deductions")?,
        sub_total: get_decimal(row, "sub_total")?,
        gst: get_decimal(row, "gst")?,
        total_inc_gst: get_decimal(row, "total_inc_gst")?,
        retention_held: get_decimal(row, "retention_held")?,
        amount_due: get_decimal(row, "amount_due")?,
        created_at: get(row, "created_at")?,
    })
}

fn row_to_claim_item(row: &SqliteRow) -> Result<ClaimItem, RepositoryError> {
    Ok(ClaimItem {
        id: get(row, "id")?,
        claim_id: get(row, "claim_id")?,
        description: get(row, "description")?,
        contract_value: get_decimal(row, "contract_value")?,
        percent_complete: get_decimal(row, "percent_complete")?,
        claim_to_date: get_decimal(row, "claim_to_date")?,
        previous_claim: get_decimal(row, "previous_claim")?,
        this_claim: get_decimal(row, "this_claim")?,
        left_to_claim: get_decimal(row, "left_to_claim")?,
        sort_order: get(row, "sort_order")?,
        created_at: get(row, "created_at")?,
    })
}

fn row_to_variation(row: &SqliteRow) -> Result<Variation, RepositoryError> {
    Ok(Variation {
        id: get(row, "id")?,
        claim_id: get(row, "claim_id")?,
        description: get(row, "description")?,
        quantity: get_decimal(row, "quantity")?,
        rate: get_decimal(row, "rate")?,
        variation_value: get_decimal(row, "variation_value")?,
        subtotal: get_decimal(row, "subtotal")?,
        status: parse_enum(row, "status", VariationStatus::parse)?,
        created_at: get(row, "created_at")?,
    })
}

fn row_to_credit(row: &SqliteRow) -> Result<Credit, RepositoryError> {
    Ok(Credit {
        id: get(row, "id")?,
        claim_id: get(row, "claim_id")?,
        description: get(row, "description")?,
        amount: get_decimal(row, "amount")?,
        created_at: get(row, "created_at")?,
    })
}

fn row_to_attachment(row: &SqliteRow) -> Result<Attachment, RepositoryError> {
    Ok(Attachment {
        id: get(row, "id")?,
        claim_id: get(row, "claim_id")?,
        file_name: get(row, "file_name")?,
        file_url: get(row, "file_url")?,
        file_size: get(row, "file_size")?,
        created_at: get(row, "created_at")?,
    })
}

impl SqliteRepository {
    async fn fetch_one_by_id<T>(
        &self,
        table: &str,
        columns: &str,
        id: i64,
        map: fn(&SqliteRow) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let sql = format!("SELECT {columns} FROM {table} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;
        map(&row)
    }

    async fn fetch_for_claim<T>(
        &self,
        table: &str,
        columns: &str,
        order_by: &str,
        claim_id: i64,
        map: fn(&SqliteRow) -> Result<T, RepositoryError>,
    ) -> Result<Vec<T>, RepositoryError> {
        let sql = format!("SELECT {columns} FROM {table} WHERE claim_id = ? ORDER BY {order_by}");
        let rows = sqlx::query(&sql)
            .bind(claim_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(map).collect()
    }
}

#[async_trait]
impl ClaimRepository for SqliteRepository {
    async fn create_project(
        &self,
        project: NewProject,
    ) -> Result<Project, RepositoryError> {
        let schedule = &project.retention_schedule;
        let result = sqlx::query(
            "INSERT INTO projects (
                name, description, total_value, gst_rate, retention_rate, status,
                retention_per_claim_percent, retention_collect_until_percent,
                retention_first_release_percent, retention_first_release_timing,
                retention_final_release_percent, retention_final_release_timing,
                retention_dlp_months, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(decimal_to_text(project.total_value))
        .bind(decimal_to_text(project.gst_rate))
        .bind(decimal_to_text(project.retention_rate))
        .bind(project.status.as_str())
        .bind(schedule.per_claim_percent.map(decimal_to_text))
        .bind(schedule.collect_until_percent.map(decimal_to_text))
        .bind(schedule.first_release_percent.map(decimal_to_text))
        .bind(&schedule.first_release_timing)
        .bind(schedule.final_release_percent.map(decimal_to_text))
        .bind(&schedule.final_release_timing)
        .bind(schedule.dlp_months)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_project(result.last_insert_rowid()).await
    }

    async fn get_project(
        &self,
        id: i64,
    ) -> Result<Project, RepositoryError> {
        self.fetch_one_by_id("projects", PROJECT_COLUMNS, id, row_to_project)
            .await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, RepositoryError> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name, id");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_project).collect()
    }

    async fn update_project(
        &self,
        project: &Project,
    ) -> Result<(), RepositoryError> {
        let schedule = &project.retention_schedule;
        let result = sqlx::query(
            "UPDATE projects SET
                name = ?, description = ?, total_value = ?, gst_rate = ?,
                retention_rate = ?, status = ?,
                retention_per_claim_percent = ?, retention_collect_until_percent = ?,
                retention_first_release_percent = ?, retention_first_release_timing = ?,
                retention_final_release_percent = ?, retention_final_release_timing = ?,
                retention_dlp_months = ?
             WHERE id = ?",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(decimal_to_text(project.total_value))
        .bind(decimal_to_text(project.gst_rate))
        .bind(decimal_to_text(project.retention_rate))
        .bind(project.status.as_str())
        .bind(schedule.per_claim_percent.map(decimal_to_text))
        .bind(schedule.collect_until_percent.map(decimal_to_text))
        .bind(schedule.first_release_percent.map(decimal_to_text))
        .bind(&schedule.first_release_timing)
        .bind(schedule.final_release_percent.map(decimal_to_text))
        .bind(&schedule.final_release_timing)
        .bind(schedule.dlp_months)
        .bind(project.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        require_row(result.rows_affected())
    }

    async fn delete_project(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        require_row(result.rows_affected())
    }

    async fn create_claim(
        &self,
        claim: NewClaim,
    ) -> Result<Claim, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO claims (
                project_id, number, kind, status, month_ending, period_from, period_to,
                contact_person, subcontract_reference, description, percent_complete,
                previous_claim, payment_received, this_claim, total_works_completed,
                deductions, sub_total, gst, total_inc_gst, retention_held, amount_due,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(claim.project_id)
        .bind(&claim.number)
        .bind(claim.kind.as_str())
        .bind(claim.status.as_str())
        .bind(claim.month_ending)
        .bind(claim.period_from)
        .bind(claim.period_to)
        .bind(&claim.contact_person)
        .bind(&claim.subcontract_reference)
        .bind(&claim.description)
        .bind(decimal_to_text(claim.percent_complete))
        .bind(decimal_to_text(claim.previous_claim))
        .bind(decimal_to_text(claim.payment_received))
        .bind(decimal_to_text(claim.this_claim))
        .bind(decimal_to_text(claim.total_works_completed))
        .bind(decimal_to_text(claim.deductions))
        .bind(decimal_to_text(claim.sub_total))
        .bind(decimal_to_text(claim.gst))
        .bind(decimal_to_text(claim.total_inc_gst))
        .bind(decimal_to_text(claim.retention_held))
        .bind(decimal_to_text(claim.amount_due))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_claim(result.last_insert_rowid()).await
    }

    async fn get_claim(
        &self,
        id: i64,
    ) -> Result<Claim, RepositoryError> {
        self.fetch_one_by_id("claims", CLAIM_COLUMNS, id, row_to_claim)
            .await
    }

    async fn list_claims_for_project(
        &self,
        project_id: i64,
    ) -> Result<Vec<Claim>, RepositoryError> {
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE project_id = ?
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_claim).collect()
    }

    async fn list_recent_claims(
        &self,
        limit: u32,
    ) -> Result<Vec<Claim>, RepositoryError> {
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_claim).collect()
    }

    async fn update_claim_status(
        &self,
        id: i64,
        status: ClaimStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE claims SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        require_row(result.rows_affected())
    }

    async fn delete_claim(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM claims WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        require_row(result.rows_affected())
    }

    async fn create_claim_item(
        &self,
        item: NewClaimItem,
    ) -> Result<ClaimItem, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO claim_items (
                claim_id, description, contract_value, percent_complete, claim_to_date,
                previous_claim, this_claim, left_to_claim, sort_order, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(item.claim_id)
        .bind(&item.description)
        .bind(decimal_to_text(item.contract_value))
        .bind(decimal_to_text(item.percent_complete))
        .bind(decimal_to_text(item.claim_to_date))
        .bind(decimal_to_text(item.previous_claim))
        .bind(decimal_to_text(item.this_claim))
        .bind(decimal_to_text(item.left_to_claim))
        .bind(item.sort_order)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.fetch_one_by_id(
            "claim_items",
            CLAIM_ITEM_COLUMNS,
            result.last_insert_rowid(),
            row_to_claim_item,
        )
        .await
    }

    async fn list_claim_items(
        &self,
        claim_id: i64,
    ) -> Result<Vec<ClaimItem>, RepositoryError> {
        self.fetch_for_claim(
            "claim_items",
            CLAIM_ITEM_COLUMNS,
            "sort_order, id",
            claim_id,
            row_to_claim_item,
        )
        .await
    }

    async fn create_variation(
        &self,
        variation: NewVariation,
    ) -> Result<Variation, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO variations (
                claim_id, description, quantity, rate, variation_value, subtotal, status,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(variation.claim_id)
        .bind(&variation.description)
        .bind(decimal_to_text(variation.quantity))
        .bind(decimal_to_text(variation.rate))
        .bind(decimal_to_text(variation.variation_value))
        .bind(decimal_to_text(variation.subtotal))
        .bind(variation.status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.fetch_one_by_id(
            "variations",
            VARIATION_COLUMNS,
            result.last_insert_rowid(),
            row_to_variation,
        )
        .await
    }

    async fn list_variations(
        &self,
        claim_id: i64,
    ) -> Result<Vec<Variation>, RepositoryError> {
        self.fetch_for_claim("variations", VARIATION_COLUMNS, "id", claim_id, row_to_variation)
            .await
    }

    async fn create_credit(
        &self,
        credit: NewCredit,
    ) -> Result<Credit, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO credits (claim_id, description, amount, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(credit.claim_id)
        .bind(&credit.description)
        .bind(decimal_to_text(credit.amount))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.fetch_one_by_id(
            "credits",
            "id, claim_id, description, amount, created_at",
            result.last_insert_rowid(),
            row_to_credit,
        )
        .await
    }

    async fn list_credits(
        &self,
        claim_id: i64,
    ) -> Result<Vec<Credit>, RepositoryError> {
        self.fetch_for_claim(
            "credits",
            "id, claim_id, description, amount, created_at",
            "id",
            claim_id,
            row_to_credit,
        )
        .await
    }

    async fn create_attachment(
        &self,
        attachment: NewAttachment,
    ) -> Result<Attachment, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO attachments (claim_id, file_name, file_url, file_size, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(attachment.claim_id)
        .bind(&attachment.file_name)
        .bind(&attachment.file_url)
        .bind(attachment.file_size)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.fetch_one_by_id(
            "attachments",
            "id, claim_id, file_name, file_url, file_size, created_at",
            result.last_insert_rowid(),
            row_to_attachment,
        )
        .await
    }

    async fn list_attachments(
        &self,
        claim_id: i64,
    ) -> Result<Vec<Attachment>, RepositoryError> {
        self.fetch_for_claim(
            "attachments",
            "id, claim_id, file_name, file_url, file_size, created_at",
            "id",
            claim_id,
            row_to_attachment,
        )
        .await
    }
}
