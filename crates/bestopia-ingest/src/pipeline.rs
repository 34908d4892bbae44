//! The ingestion orchestrator: plan, persist atomically, then best-effort
//! enrichment of a bounded product prefix.

use std::sync::Arc;

use bestopia_adapters::ProductEnricher;
use bestopia_core::PersistedReview;
use bestopia_store::ReviewStore;
use tracing::{info, warn};

use crate::plan::{build_plan, ReviewSubmission};
use crate::reviewers::ReviewerPools;
use crate::IngestError;

/// How many products of a batch get an enrichment lookup. Bounds the
/// external calls' latency contribution to the request.
pub const DEFAULT_ENRICH_LIMIT: usize = 4;

pub struct IngestPipeline {
    store: Arc<dyn ReviewStore>,
    enricher: Arc<dyn ProductEnricher>,
    pools: ReviewerPools,
    enrich_limit: usize,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn ReviewStore>,
        enricher: Arc<dyn ProductEnricher>,
        pools: ReviewerPools,
    ) -> Self {
        Self {
            store,
            enricher,
            pools,
            enrich_limit: DEFAULT_ENRICH_LIMIT,
        }
    }

    pub fn with_enrich_limit(mut self, limit: usize) -> Self {
        self.enrich_limit = limit;
        self
    }

    /// Run one full ingestion. The review, its products, and their product
    /// reviews are committed atomically before any enrichment call; each
    /// enrichment failure is logged and swallowed.
    pub async fn ingest(
        &self,
        submission: &ReviewSubmission,
    ) -> Result<PersistedReview, IngestError> {
        let plan = build_plan(submission, &self.pools, &mut rand::thread_rng())?;
        let cover_was_empty = submission.cover_photo.trim().is_empty();

        let mut persisted = self.store.persist_review(&plan).await?;
        info!(
            review = %persisted.review.slug,
            products = persisted.products.len(),
            "review persisted"
        );

        let limit = self.enrich_limit.min(persisted.products.len());
        for position in 0..limit {
            let (product_id, name) = {
                let product = &persisted.products[position];
                (product.id, product.name.clone())
            };
            match self.enricher.enrich(&name).await {
                Ok(enrichment) => {
                    if let Err(err) = self
                        .store
                        .update_product_links(
                            product_id,
                            &enrichment.image_url,
                            &enrichment.product_page,
                        )
                        .await
                    {
                        warn!(product = %name, error = %err, "failed to record enrichment");
                        continue;
                    }
                    let product = &mut persisted.products[position];
                    product.image_url = enrichment.image_url.clone();
                    product.product_page = enrichment.product_page.clone();
                    if position == 0 && cover_was_empty {
                        match self
                            .store
                            .update_review_cover(persisted.review.id, &enrichment.image_url)
                            .await
                        {
                            Ok(()) => {
                                persisted.review.cover_photo = enrichment.image_url.clone();
                            }
                            Err(err) => {
                                warn!(
                                    review = persisted.review.id,
                                    error = %err,
                                    "failed to update cover photo"
                                );
                            }
                        }
                    }
                }
                Err(err) => warn!(product = %name, error = %err, "product enrichment failed"),
            }
        }

        Ok(persisted)
    }
}
