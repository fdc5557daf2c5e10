//! Process-local [`ClaimRepository`] backed by ordered maps.
//!
//! Nothing survives the process. Useful for previews and as a test double.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{ClaimRepository, RepositoryError};
use crate::models::{
    Attachment, Claim, ClaimItem, ClaimStatus, Credit, NewAttachment, NewClaim, NewClaimItem,
    NewCredit, NewProject, NewVariation, Project, Variation,
};

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    projects: BTreeMap<i64, Project>,
    claims: BTreeMap<i64, Claim>,
    items: BTreeMap<i64, ClaimItem>,
    variations: BTreeMap<i64, Variation>,
    credits: BTreeMap<i64, Credit>,
    attachments: BTreeMap<i64, Attachment>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn require_project(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        if self.projects.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::Database(format!(
                "foreign key violation: project {id} does not exist"
            )))
        }
    }

    fn require_claim(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        if self.claims.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::Database(format!(
                "foreign key violation: claim {id} does not exist"
            )))
        }
    }

    fn remove_claim_rows(
        &mut self,
        claim_id: i64,
    ) {
        self.items.retain(|_, row| row.claim_id != claim_id);
        self.variations.retain(|_, row| row.claim_id != claim_id);
        self.credits.retain(|_, row| row.claim_id != claim_id);
        self.attachments.retain(|_, row| row.claim_id != claim_id);
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }
}

/// Newest first; ids are assigned in creation order.
fn newest_first(mut claims: Vec<Claim>) -> Vec<Claim> {
    claims.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    claims
}

#[async_trait]
impl ClaimRepository for MemoryRepository {
    async fn create_project(
        &self,
        project: NewProject,
    ) -> Result<Project, RepositoryError> {
        let mut tables = self.tables()?;
        let id = tables.next_id();
        let record = Project {
            id,
            name: project.name,
            description: project.description,
            total_value: project.total_value,
            gst_rate: project.gst_rate,
            retention_rate: project.retention_rate,
            status: project.status,
            retention_schedule: project.retention_schedule,
            created_at: Utc::now(),
        };
        tables.projects.insert(id, record.clone());
        Ok(record)
    }

    async fn get_project(
        &self,
        id: i64,
    ) -> Result<Project, RepositoryError> {
        self.tables()?
            .projects
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, RepositoryError> {
        let mut projects: Vec<Project> = self.tables()?.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(projects)
    }

    async fn update_project(
        &self,
        project: &Project,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let stored = tables
            .projects
            .get_mut(&project.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = Project {
            created_at: stored.created_at,
            ..project.clone()
        };
        Ok(())
    }

    async fn delete_project(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        tables
            .projects
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        let claim_ids: Vec<i64> = tables
            .claims
            .values()
            .filter(|claim| claim.project_id == id)
            .map(|claim| claim.id)
            .collect();
        for claim_id in claim_ids {
            tables.claims.remove(&claim_id);
            tables.remove_claim_rows(claim_id);
        }
        Ok(())
    }

    async fn create_claim(
        &self,
        claim: NewClaim,
    ) -> Result<Claim, RepositoryError> {
        let mut tables = self.tables()?;
        tables.require_project(claim.project_id)?;
        let id = tables.next_id();
        let record = Claim {
            id,
            project_id: claim.project_id,
            number: claim.number,
            kind: claim.kind,
            status: claim.status,
            month_ending: claim.month_ending,
            period_from: claim.period_from,
            period_to: claim.period_to,
            contact_person: claim.contact_person,
            subcontract_reference: claim.subcontract_reference,
            description: claim.description,
            percent_complete: claim.percent_complete,
            previous_claim: claim.previous_claim,
            payment_received: claim.payment_received,
            this_claim: claim.this_claim,
            total_works_completed: claim.total_works_completed,
            deductions: claim.deductions,
            sub_total: claim.sub_total,
            gst: claim.gst,
            total_inc_gst: claim.total_inc_gst,
            retention_held: claim.retention_held,
            amount_due: claim.amount_due,
            created_at: Utc::now(),
        };
        tables.claims.insert(id, record.clone());
        Ok(record)
    }

    async fn get_claim(
        &self,
        id: i64,
    ) -> Result<Claim, RepositoryError> {
        self.tables()?
            .claims
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_claims_for_project(
        &self,
        project_id: i64,
    ) -> Result<Vec<Claim>, RepositoryError> {
        let claims = self
            .tables()?
            .claims
            .values()
            .filter(|claim| claim.project_id == project_id)
            .cloned()
            .collect();
        Ok(newest_first(claims))
    }

    async fn list_recent_claims(
        &self,
        limit: u32,
    ) -> Result<Vec<Claim>, RepositoryError> {
        let claims = self.tables()?.claims.values().cloned().collect();
        let mut claims = newest_first(claims);
        claims.truncate(limit as usize);
        Ok(claims)
    }

    async fn update_claim_status(
        &self,
        id: i64,
        status: ClaimStatus,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let claim = tables
            .claims
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        claim.status = status;
        Ok(())
    }

    async fn delete_claim(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        tables.claims.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.remove_claim_rows(id);
        Ok(())
    }

    async fn create_claim_item(
        &self,
        item: NewClaimItem,
    ) -> Result<ClaimItem, RepositoryError> {
        let mut tables = self.tables()?;
        tables.require_claim(item.claim_id)?;
        let id = tables.next_id();
        let record = ClaimItem {
            id,
            claim_id: item.claim_id,
            description: item.description,
            contract_value: item.contract_value,
            percent_complete: item.percent_complete,
            claim_to_date: item.claim_to_date,
            previous_claim: item.previous_claim,
            this_claim: item.this_claim,
            left_to_claim: item.left_to_claim,
            sort_order: item.sort_order,
            created_at: Utc::now(),
        };
        tables.items.insert(id, record.clone());
        Ok(record)
    }

    async fn list_claim_items(
        &self,
        claim_id: i64,
    ) -> Result<Vec<ClaimItem>, RepositoryError> {
        let mut items: Vec<ClaimItem> = self
            .tables()?
            .items
            .values()
            .filter(|item| item.claim_id == claim_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.sort_order, item.id));
        Ok(items)
    }

    async fn create_variation(
        &self,
        variation: NewVariation,
    ) -> Result<Variation, RepositoryError> {
        let mut tables = self.tables()?;
        tables.require_claim(variation.claim_id)?;
        let id = tables.next_id();
        let record = Variation {
            id,
            claim_id: variation.claim_id,
            description: variation.description,
            quantity: variation.quantity,
            rate: variation.rate,
            variation_value: variation.variation_value,
            subtotal: variation.subtotal,
            status: variation.status,
            created_at: Utc::now(),
        };
        tables.variations.insert(id, record.clone());
        Ok(record)
    }

    async fn list_variations(
        &self,
        claim_id: i64,
    ) -> Result<Vec<Variation>, RepositoryError> {
        Ok(self
            .tables()?
            .variations
            .values()
            .filter(|row| row.claim_id == claim_id)
            .cloned()
            .collect())
    }

    async fn create_credit(
        &self,
        credit: NewCredit,
    ) -> Result<Credit, RepositoryError> {
        let mut tables = self.tables()?;
        tables.require_claim(credit.claim_id)?;
        let id = tables.next_id();
        let record = Credit {
            id,
            claim_id: credit.claim_id,
            description: credit.description,
            amount: credit.amount,
            created_at: Utc::now(),
        };
        tables.credits.insert(id, record.clone());
        Ok(record)
    }

    async fn list_credits(
        &self,
        claim_id: i64,
    ) -> Result<Vec<Credit>, RepositoryError> {
        Ok(self
            .tables()?
            .credits
            .values()
            .filter(|row| row.claim_id == claim_id)
            .cloned()
            .collect())
    }

    async fn create_attachment(
        &self,
        attachment: NewAttachment,
    ) -> Result<Attachment, RepositoryError> {
        let mut tables = self.tables()?;
        tables.require_claim(attachment.claim_id)?;
        let id = tables.next_id();
        let record = Attachment {
            id,
            claim_id: attachment.claim_id,
            file_name: attachment.file_name,
            file_url: attachment.file_url,
            file_size: attachment.file_size,
            created_at: Utc::now(),
        };
        tables.attachments.insert(id, record.clone());
        Ok(record)
    }

    async fn list_attachments(
        &self,
        claim_id: i64,
    ) -> Result<Vec<Attachment>, RepositoryError> {
        Ok(self
            .tables()?
            .attachments
            .values()
            .filter(|row| row.claim_id == claim_id)
            .cloned()
            .collect())
    }
}

/// Registers [`MemoryRepository`] as the `"memory"` backend.
pub struct MemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn ClaimRepository>, RepositoryError> {
        Ok(Box::new(MemoryRepository::new()))
    }
}
