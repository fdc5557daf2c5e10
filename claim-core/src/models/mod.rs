mod claim;
mod line_items;
mod project;

pub use claim::{Claim, ClaimHeader, ClaimKind, ClaimStatus, NewClaim};
pub use line_items::{
    Attachment, ClaimItem, Credit, NewAttachment, NewClaimItem, NewCredit, NewVariation,
    Variation, VariationStatus,
};
pub use project::{
    DEFAULT_GST_RATE, DEFAULT_RETENTION_RATE, NewProject, Project, ProjectStatus,
    RetentionSchedule,
};
