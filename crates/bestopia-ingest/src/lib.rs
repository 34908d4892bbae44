//! The review ingestion pipeline: TSV parsing, reviewer assignment, rating
//! synthesis, atomic persistence, and best-effort enrichment.

use bestopia_store::StoreError;
use thiserror::Error;

pub mod draft;
pub mod plan;
pub mod pipeline;
pub mod rating;
pub mod reviewers;
pub mod tsv;

pub use draft::{draft_review, DraftedProduct, ReviewDraft};
pub use pipeline::{IngestPipeline, DEFAULT_ENRICH_LIMIT};
pub use plan::{build_plan, ReviewSubmission};
pub use reviewers::ReviewerPools;

pub const CRATE_NAME: &str = "bestopia-ingest";

#[derive(Debug, Error)]
pub enum IngestError {
    /// Bad input, caught before any transaction is opened.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Any datastore failure during the transactional phase; the whole write
    /// was rolled back.
    #[error("failed to persist review: {0}")]
    Persist(#[from] StoreError),
    /// The drafting collaborator failed or returned an unusable shape; no
    /// partial draft is surfaced.
    #[error("drafting failed: {0}")]
    Draft(String),
}
