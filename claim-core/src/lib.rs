pub mod calculations;
pub mod db;
pub mod input;
pub mod models;
pub mod submission;

pub use db::repository::{ClaimRepository, RepositoryError};
pub use models::*;
