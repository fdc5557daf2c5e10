//! Turning a validated claim into stored records.
//!
//! The store offers no transactions, so a claim and its rows are created one
//! call at a time: claim, items, variations, credits. When a later create
//! fails the submitter deletes the claim again, which removes any rows
//! already written beneath it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::calculations::{
    ClaimItemLine, CreditLine, ItemizedClaimInput, ItemizedClaimResult, ItemizedClaimWorksheet,
    ProjectRates, RateError, SimpleClaimInput, SimpleClaimResult, SimpleClaimWorksheet,
    VariationLine,
};
use crate::db::repository::{ClaimRepository, RepositoryError};
use crate::input::{ItemizedClaimForm, SimpleClaimForm, ValidationError};
use crate::models::{
    Claim, ClaimHeader, ClaimItem, ClaimKind, Credit, NewClaim, NewClaimItem, NewCredit,
    NewVariation, Project, Variation, VariationStatus,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Rate(#[from] RateError),

    /// Nothing was written.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// A row failed after the claim was created; the claim was removed again.
    #[error("claim submission failed and was rolled back: {source}")]
    RolledBack { source: RepositoryError },

    /// A row failed and removing the partial claim failed too.
    #[error("claim {claim_id} is partially saved ({source}); removing it failed: {cleanup}")]
    Incomplete {
        claim_id: i64,
        source: RepositoryError,
        cleanup: RepositoryError,
    },
}

/// A computed claim ready to be written, with the rows that belong to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedClaim {
    pub claim: NewClaim,
    pub items: Vec<ClaimItemLine>,
    pub variations: Vec<VariationLine>,
    pub credits: Vec<CreditLine>,
}

impl PreparedClaim {
    /// `total_works_completed` records the contract work to date.
    pub fn simple(
        project: &Project,
        header: ClaimHeader,
        input: &SimpleClaimInput,
    ) -> Result<(Self, SimpleClaimResult), RateError> {
        let rates = ProjectRates::for_project(project)?;
        let result = SimpleClaimWorksheet::new(project.total_value, rates).calculate(input);

        let claim = NewClaim {
            kind: ClaimKind::Simple,
            percent_complete: input.percent_complete,
            previous_claim: result.previous_claim,
            this_claim: result.this_claim,
            total_works_completed: result.contract_work,
            sub_total: result.this_claim,
            gst: result.gst,
            total_inc_gst: result.total_inc_gst,
            retention_held: result.retention_held,
            amount_due: result.amount_due,
            ..claim_from_header(project.id, header)
        };

        let prepared = Self {
            claim,
            items: Vec::new(),
            variations: Vec::new(),
            credits: Vec::new(),
        };
        Ok((prepared, result))
    }

    /// `deductions` records the credit total. Retention and amount due stay
    /// at zero.
    pub fn itemized(
        project: &Project,
        header: ClaimHeader,
        input: &ItemizedClaimInput,
    ) -> Result<(Self, ItemizedClaimResult), RateError> {
        let rates = ProjectRates::for_project(project)?;
        let result = ItemizedClaimWorksheet::new(rates).calculate(input);

        let claim = NewClaim {
            kind: ClaimKind::Itemized,
            payment_received: result.payment_received,
            total_works_completed: result.total_works_completed(),
            deductions: result.total_credits(),
            sub_total: result.sub_total,
            gst: result.gst,
            total_inc_gst: result.total_inc_gst,
            ..claim_from_header(project.id, header)
        };

        let prepared = Self {
            claim,
            items: result.lines.items.clone(),
            variations: result.lines.variations.clone(),
            credits: result.lines.credits.clone(),
        };
        Ok((prepared, result))
    }
}

fn claim_from_header(
    project_id: i64,
    header: ClaimHeader,
) -> NewClaim {
    let zero = Decimal::new(0, 2);
    NewClaim {
        project_id,
        number: header.number,
        status: header.status,
        month_ending: header.month_ending,
        period_from: header.period_from,
        period_to: header.period_to,
        contact_person: header.contact_person,
        subcontract_reference: header.subcontract_reference,
        description: header.description,
        percent_complete: zero,
        previous_claim: zero,
        payment_received: zero,
        this_claim: zero,
        total_works_completed: zero,
        deductions: zero,
        sub_total: zero,
        gst: zero,
        total_inc_gst: zero,
        retention_held: zero,
        amount_due: zero,
        ..Default::default()
    }
}

/// Everything written for one claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedClaim {
    pub claim: Claim,
    pub items: Vec<ClaimItem>,
    pub variations: Vec<Variation>,
    pub credits: Vec<Credit>,
}

pub struct ClaimSubmitter<'a> {
    repo: &'a dyn ClaimRepository,
}

impl<'a> ClaimSubmitter<'a> {
    pub fn new(repo: &'a dyn ClaimRepository) -> Self {
        Self { repo }
    }

    /// Loads the project, validates the form and computes the claim.
    pub async fn prepare_simple(
        &self,
        project_id: i64,
        form: &SimpleClaimForm,
    ) -> Result<(PreparedClaim, SimpleClaimResult), SubmissionError> {
        let project = self.repo.get_project(project_id).await?;
        let (header, input) = form.validate()?;
        Ok(PreparedClaim::simple(&project, header, &input)?)
    }

    /// Loads the project, validates the form and computes the claim.
    pub async fn prepare_itemized(
        &self,
        project_id: i64,
        form: &ItemizedClaimForm,
    ) -> Result<(PreparedClaim, ItemizedClaimResult), SubmissionError> {
        let project = self.repo.get_project(project_id).await?;
        let (header, input) = form.validate()?;
        Ok(PreparedClaim::itemized(&project, header, &input)?)
    }

    /// Writes the claim and then each of its rows in order.
    pub async fn submit(
        &self,
        prepared: PreparedClaim,
    ) -> Result<SubmittedClaim, SubmissionError> {
        let PreparedClaim {
            claim,
            items,
            variations,
            credits,
        } = prepared;

        let claim = self.repo.create_claim(claim).await?;
        info!(
            claim_id = claim.id,
            project_id = claim.project_id,
            number = %claim.number,
            kind = claim.kind.as_str(),
            "claim created"
        );

        match self.write_rows(claim.id, items, variations, credits).await {
            Ok((items, variations, credits)) => {
                info!(
                    claim_id = claim.id,
                    items = items.len(),
                    variations = variations.len(),
                    credits = credits.len(),
                    "claim submitted"
                );
                Ok(SubmittedClaim {
                    claim,
                    items,
                    variations,
                    credits,
                })
            }
            Err(source) => Err(self.roll_back(claim.id, source).await),
        }
    }

    async fn write_rows(
        &self,
        claim_id: i64,
        items: Vec<ClaimItemLine>,
        variations: Vec<VariationLine>,
        credits: Vec<CreditLine>,
    ) -> Result<(Vec<ClaimItem>, Vec<Variation>, Vec<Credit>), RepositoryError> {
        let mut stored_items = Vec::with_capacity(items.len());
        for line in items {
            let item = self.repo.create_claim_item(claim_item_row(claim_id, line)).await?;
            stored_items.push(item);
        }

        let mut stored_variations = Vec::with_capacity(variations.len());
        for line in variations {
            let variation = self
                .repo
                .create_variation(NewVariation {
                    claim_id,
                    description: line.description,
                    quantity: line.quantity,
                    rate: line.rate,
                    variation_value: line.variation_value,
                    subtotal: line.variation_value,
                    status: VariationStatus::Pending,
                })
                .await?;
            stored_variations.push(variation);
        }

        let mut stored_credits = Vec::with_capacity(credits.len());
        for line in credits {
            let credit = self
                .repo
                .create_credit(NewCredit {
                    claim_id,
                    description: line.description,
                    amount: line.amount,
                })
                .await?;
            stored_credits.push(credit);
        }

        Ok((stored_items, stored_variations, stored_credits))
    }

    async fn roll_back(
        &self,
        claim_id: i64,
        source: RepositoryError,
    ) -> SubmissionError {
        warn!(claim_id, error = %source, "claim row failed, removing partial claim");
        match self.repo.delete_claim(claim_id).await {
            Ok(()) => SubmissionError::RolledBack { source },
            Err(cleanup) => {
                warn!(claim_id, error = %cleanup, "partial claim could not be removed");
                SubmissionError::Incomplete {
                    claim_id,
                    source,
                    cleanup,
                }
            }
        }
    }
}

/// New items start with nothing previously claimed.
fn claim_item_row(
    claim_id: i64,
    line: ClaimItemLine,
) -> NewClaimItem {
    NewClaimItem {
        claim_id,
        description: line.description,
        contract_value: line.contract_value,
        percent_complete: line.percent_complete,
        claim_to_date: line.this_claim,
        previous_claim: Decimal::new(0, 2),
        this_claim: line.this_claim,
        left_to_claim: line.left_to_claim,
        sort_order: line.sort_order,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use crate::db::MemoryRepository;
    use crate::input::{ClaimHeaderForm, ClaimItemForm, CreditForm, VariationForm};
    use crate::models::{
        Attachment, ClaimStatus, NewAttachment, NewProject,
    };

    use super::*;

    // ── flaky repository ─────────────────────────────────────────────────
    /// Delegates to a [`MemoryRepository`] but fails every create after the
    /// first `creates_allowed`, and optionally every delete.
    struct FlakyRepository {
        inner: MemoryRepository,
        creates_allowed: usize,
        creates: AtomicUsize,
        fail_deletes: bool,
    }

    impl FlakyRepository {
        fn new(
            creates_allowed: usize,
            fail_deletes: bool,
        ) -> Self {
            Self {
                inner: MemoryRepository::new(),
                creates_allowed,
                creates: AtomicUsize::new(0),
                fail_deletes,
            }
        }

        fn check_create(&self) -> Result<(), RepositoryError> {
            if self.creates.fetch_add(1, Ordering::SeqCst) >= self.creates_allowed {
                Err(RepositoryError::Database("disk full".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ClaimRepository for FlakyRepository {
        async fn create_project(&self, p: NewProject) -> Result<Project, RepositoryError> {
            self.inner.create_project(p).await
        }
        async fn get_project(&self, id: i64) -> Result<Project, RepositoryError> {
            self.inner.get_project(id).await
        }
        async fn list_projects(&self) -> Result<Vec<Project>, RepositoryError> {
            self.inner.list_projects().await
        }
        async fn update_project(&self, p: &Project) -> Result<(), RepositoryError> {
            self.inner.update_project(p).await
        }
        async fn delete_project(&self, id: i64) -> Result<(), RepositoryError> {
            self.inner.delete_project(id).await
        }
        async fn create_claim(&self, c: NewClaim) -> Result<Claim, RepositoryError> {
            self.check_create()?;
            self.inner.create_claim(c).await
        }
        async fn get_claim(&self, id: i64) -> Result<Claim, RepositoryError> {
            self.inner.get_claim(id).await
        }
        async fn list_claims_for_project(&self, id: i64) -> Result<Vec<Claim>, RepositoryError> {
            self.inner.list_claims_for_project(id).await
        }
        async fn list_recent_claims(&self, limit: u32) -> Result<Vec<Claim>, RepositoryError> {
            self.inner.list_recent_claims(limit).await
        }
        async fn update_claim_status(
            &self,
            id: i64,
            status: ClaimStatus,
        ) -> Result<(), RepositoryError> {
            self.inner.update_claim_status(id, status).await
        }
        async fn delete_claim(&self, id: i64) -> Result<(), RepositoryError> {
            if self.fail_deletes {
                return Err(RepositoryError::Connection("connection reset".to_string()));
            }
            self.inner.delete_claim(id).await
        }
        async fn create_claim_item(&self, i: NewClaimItem) -> Result<ClaimItem, RepositoryError> {
            self.check_create()?;
            self.inner.create_claim_item(i).await
        }
        async fn list_claim_items(&self, id: i64) -> Result<Vec<ClaimItem>, RepositoryError> {
            self.inner.list_claim_items(id).await
        }
        async fn create_variation(&self, v: NewVariation) -> Result<Variation, RepositoryError> {
            self.check_create()?;
            self.inner.create_variation(v).await
        }
        async fn list_variations(&self, id: i64) -> Result<Vec<Variation>, RepositoryError> {
            self.inner.list_variations(id).await
        }
        async fn create_credit(&self, c: NewCredit) -> Result<Credit, RepositoryError> {
            self.check_create()?;
            self.inner.create_credit(c).await
        }
        async fn list_credits(&self, id: i64) -> Result<Vec<Credit>, RepositoryError> {
            self.inner.list_credits(id).await
        }
        async fn create_attachment(
            &self,
            a: NewAttachment,
        ) -> Result<Attachment, RepositoryError> {
            self.check_create()?;
            self.inner.create_attachment(a).await
        }
        async fn list_attachments(&self, id: i64) -> Result<Vec<Attachment>, RepositoryError> {
            self.inner.list_attachments(id).await
        }
    }

    // ── helpers ──────────────────────────────────────────────────────────
    async fn project(repo: &dyn ClaimRepository) -> Project {
        repo.create_project(NewProject::new("Logistics hub", dec!(1500000)))
            .await
            .unwrap()
    }

    fn simple_form(percent: &str) -> SimpleClaimForm {
        SimpleClaimForm {
            header: ClaimHeaderForm::new("PC-01"),
            percent_complete: percent.to_string(),
            previous_claim: String::new(),
        }
    }

    fn itemized_form() -> ItemizedClaimForm {
        let item = |description: &str, contract_value: &str, percent: &str| ClaimItemForm {
            description: description.to_string(),
            contract_value: contract_value.to_string(),
            percent_complete: percent.to_string(),
        };
        ItemizedClaimForm {
            header: ClaimHeaderForm::new("PC-02"),
            items: vec![
                item("FOOTINGS", "500000", "100"),
                item("WAREHOUSE", "300000", "50"),
            ],
            variations: vec![VariationForm {
                description: "Extra bollards".to_string(),
                quantity: "4".to_string(),
                rate: "250".to_string(),
            }],
            credits: vec![CreditForm {
                description: "Skip bin".to_string(),
                amount: "500".to_string(),
            }],
            payment_received: String::new(),
        }
    }

    // ── preparation ──────────────────────────────────────────────────────
    #[tokio::test]
    async fn simple_claim_carries_every_derived_figure() {
        let repo = MemoryRepository::new();
        let project = project(&repo).await;
        let submitter = ClaimSubmitter::new(&repo);

        let (prepared, result) = submitter
            .prepare_simple(project.id, &simple_form("75"))
            .await
            .unwrap();

        assert_eq!(prepared.claim.kind, ClaimKind::Simple);
        assert_eq!(prepared.claim.project_id, project.id);
        assert_eq!(prepared.claim.number, "PC-01");
        assert_eq!(prepared.claim.this_claim, result.this_claim);
        assert_eq!(prepared.claim.gst, dec!(112500));
        assert_eq!(prepared.claim.total_inc_gst, dec!(1237500));
        assert_eq!(prepared.claim.retention_held, dec!(56250));
        assert_eq!(prepared.claim.amount_due, dec!(1181250));
        assert_eq!(prepared.claim.payment_received.to_string(), "0.00");
        assert!(prepared.items.is_empty());
    }

    #[tokio::test]
    async fn itemized_claim_leaves_retention_at_zero() {
        let repo = MemoryRepository::new();
        let project = project(&repo).await;
        let submitter = ClaimSubmitter::new(&repo);

        let (prepared, _) = submitter
            .prepare_itemized(project.id, &itemized_form())
            .await
            .unwrap();

        assert_eq!(prepared.claim.kind, ClaimKind::Itemized);
        assert_eq!(prepared.claim.total_works_completed, dec!(650000));
        assert_eq!(prepared.claim.deductions, dec!(500));
        assert_eq!(prepared.claim.sub_total, dec!(650500));
        assert_eq!(prepared.claim.gst, dec!(65050));
        assert_eq!(prepared.claim.total_inc_gst, dec!(715550));
        assert_eq!(prepared.claim.retention_held, dec!(0));
        assert_eq!(prepared.claim.amount_due, dec!(0));
    }

    #[tokio::test]
    async fn unknown_project_is_a_repository_error() {
        let repo = MemoryRepository::new();

        let err = ClaimSubmitter::new(&repo)
            .prepare_simple(99, &simple_form("75"))
            .await
            .unwrap_err();

        assert_eq!(err, SubmissionError::Repository(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn invalid_form_is_rejected_before_calculation() {
        let repo = MemoryRepository::new();
        let project = project(&repo).await;

        let err = ClaimSubmitter::new(&repo)
            .prepare_simple(project.id, &simple_form("abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn negative_project_rate_is_a_rate_error() {
        let repo = MemoryRepository::new();
        let mut new_project = NewProject::new("Bad terms", dec!(1000));
        new_project.gst_rate = dec!(-10);
        let project = repo.create_project(new_project).await.unwrap();

        let err = ClaimSubmitter::new(&repo)
            .prepare_simple(project.id, &simple_form("10"))
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Rate(RateError::Negative { .. })));
    }

    #[tokio::test]
    async fn oversized_project_value_is_refused_before_calculating() {
        let repo = MemoryRepository::new();
        let project = repo
            .create_project(NewProject::new("Runaway", dec!(100000000000000000)))
            .await
            .unwrap();

        let err = ClaimSubmitter::new(&repo)
            .prepare_simple(project.id, &simple_form("100"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubmissionError::Rate(RateError::TotalValueOutOfRange { .. })
        ));
    }

    // ── submission ───────────────────────────────────────────────────────
    #[tokio::test]
    async fn itemized_submission_writes_claim_then_rows() {
        let repo = MemoryRepository::new();
        let project = project(&repo).await;
        let submitter = ClaimSubmitter::new(&repo);
        let (prepared, _) = submitter
            .prepare_itemized(project.id, &itemized_form())
            .await
            .unwrap();

        let submitted = submitter.submit(prepared).await.unwrap();
        let claim_id = submitted.claim.id;

        assert_eq!(repo.get_claim(claim_id).await.unwrap(), submitted.claim);
        assert_eq!(repo.list_claim_items(claim_id).await.unwrap(), submitted.items);
        assert_eq!(repo.list_variations(claim_id).await.unwrap(), submitted.variations);
        assert_eq!(repo.list_credits(claim_id).await.unwrap(), submitted.credits);

        let warehouse = &submitted.items[1];
        assert_eq!(warehouse.sort_order, 1);
        assert_eq!(warehouse.claim_to_date, dec!(150000));
        assert_eq!(warehouse.this_claim, dec!(150000));
        assert_eq!(warehouse.left_to_claim, dec!(150000));
        assert_eq!(warehouse.previous_claim, dec!(0));
        assert_eq!(submitted.variations[0].subtotal, dec!(1000));
        assert_eq!(submitted.variations[0].status, VariationStatus::Pending);
    }

    #[tokio::test]
    async fn failure_creating_the_claim_writes_nothing() {
        let repo = FlakyRepository::new(0, false);
        let project = project(&repo).await;
        let submitter = ClaimSubmitter::new(&repo);
        let (prepared, _) = submitter
            .prepare_simple(project.id, &simple_form("75"))
            .await
            .unwrap();

        let err = submitter.submit(prepared).await.unwrap_err();

        assert_eq!(
            err,
            SubmissionError::Repository(RepositoryError::Database("disk full".to_string()))
        );
        assert!(repo.list_recent_claims(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_mid_rows_rolls_the_claim_back() {
        // claim + two items succeed, the variation fails
        let repo = FlakyRepository::new(3, false);
        let project = project(&repo).await;
        let submitter = ClaimSubmitter::new(&repo);
        let (prepared, _) = submitter
            .prepare_itemized(project.id, &itemized_form())
            .await
            .unwrap();

        let err = submitter.submit(prepared).await.unwrap_err();

        assert_eq!(
            err,
            SubmissionError::RolledBack {
                source: RepositoryError::Database("disk full".to_string()),
            }
        );
        assert!(repo.list_claims_for_project(project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_rollback_reports_the_partial_claim() {
        let repo = FlakyRepository::new(1, true);
        let project = project(&repo).await;
        let submitter = ClaimSubmitter::new(&repo);
        let (prepared, _) = submitter
            .prepare_itemized(project.id, &itemized_form())
            .await
            .unwrap();

        let err = submitter.submit(prepared).await.unwrap_err();

        let stored = repo.list_claims_for_project(project.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(
            err,
            SubmissionError::Incomplete {
                claim_id: stored[0].id,
                source: RepositoryError::Database("disk full".to_string()),
                cleanup: RepositoryError::Connection("connection reset".to_string()),
            }
        );
    }
}
