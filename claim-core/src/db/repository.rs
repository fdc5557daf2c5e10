use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Attachment, Claim, ClaimItem, ClaimStatus, Credit, NewAttachment, NewClaim, NewClaimItem,
    NewCredit, NewProject, NewVariation, Project, Variation,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for projects, claims and the rows attached to a claim.
///
/// Create operations return the stored record with its assigned id and
/// `created_at`. Deleting a project or a claim removes everything beneath it.
#[async_trait]
pub trait ClaimRepository: Send + Sync {
    // Projects
    async fn create_project(&self, project: NewProject) -> Result<Project, RepositoryError>;
    async fn get_project(&self, id: i64) -> Result<Project, RepositoryError>;
    async fn list_projects(&self) -> Result<Vec<Project>, RepositoryError>;
    async fn update_project(&self, project: &Project) -> Result<(), RepositoryError>;
    async fn delete_project(&self, id: i64) -> Result<(), RepositoryError>;

    // Claims
    async fn create_claim(&self, claim: NewClaim) -> Result<Claim, RepositoryError>;
    async fn get_claim(&self, id: i64) -> Result<Claim, RepositoryError>;

    /// Claims of one project, newest first.
    async fn list_claims_for_project(
        &self,
        project_id: i64,
    ) -> Result<Vec<Claim>, RepositoryError>;

    /// Most recent claims across all projects, newest first.
    async fn list_recent_claims(&self, limit: u32) -> Result<Vec<Claim>, RepositoryError>;

    async fn update_claim_status(
        &self,
        id: i64,
        status: ClaimStatus,
    ) -> Result<(), RepositoryError>;
    async fn delete_claim(&self, id: i64) -> Result<(), RepositoryError>;

    // Schedule of works
    async fn create_claim_item(&self, item: NewClaimItem) -> Result<ClaimItem, RepositoryError>;

    /// Items of one claim ordered by `sort_order`.
    async fn list_claim_items(&self, claim_id: i64) -> Result<Vec<ClaimItem>, RepositoryError>;

    // Variations and credits
    async fn create_variation(
        &self,
        variation: NewVariation,
    ) -> Result<Variation, RepositoryError>;
    async fn list_variations(&self, claim_id: i64) -> Result<Vec<Variation>, RepositoryError>;
    async fn create_credit(&self, credit: NewCredit) -> Result<Credit, RepositoryError>;
    async fn list_credits(&self, claim_id: i64) -> Result<Vec<Credit>, RepositoryError>;

    // Attachments
    async fn create_attachment(
        &self,
        attachment: NewAttachment,
    ) -> Result<Attachment, RepositoryError>;
    async fn list_attachments(&self, claim_id: i64) -> Result<Vec<Attachment>, RepositoryError>;
}
