//! LLM-assisted drafting: produce candidate review content for human review
//! before a separate, explicit ingestion call. Read-only against the store.

use bestopia_adapters::{DraftError, DraftingClient};
use serde::{Deserialize, Serialize};

use crate::{tsv, IngestError};

pub const DEFAULT_SHORTLIST_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftedProduct {
    pub name: String,
    pub description: String,
}

/// Drafted-but-not-persisted review content. `review_texts` is
/// position-aligned with `products`, the same correlation ingestion uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub title: String,
    pub subtitle: String,
    pub introduction: String,
    pub products: Vec<DraftedProduct>,
    pub review_texts: Vec<String>,
}

impl ReviewDraft {
    /// The product shortlist re-serialized with the ingestion TSV
    /// convention, ready to paste into the create-review form.
    pub fn details_tsv(&self) -> String {
        let mut out = String::from("name\tdescription");
        for product in &self.products {
            out.push('\n');
            out.push_str(&product.name);
            out.push('\t');
            out.push_str(&product.description);
        }
        out
    }

    /// The drafted review texts re-serialized the same way.
    pub fn reviews_tsv(&self) -> String {
        let mut out = String::from("review_text");
        for text in &self.review_texts {
            out.push('\n');
            out.push_str(text);
        }
        out
    }
}

fn overview_prompt(category: &str, count: usize) -> String {
    format!(
        "You are drafting a buying-guide article about the best {category}. \
         Respond with exactly two tab-separated blocks separated by a line of ten dashes \
         (----------). \
         Block 1: a header line `title\tsubtitle\tintroduction` followed by one data line \
         with a catchy article title, a one-sentence subtitle, and a two-to-three sentence \
         introduction. \
         Block 2: a header line `name\tdescription` followed by {count} data lines, one per \
         recommended product, with the exact retail product name and a two-sentence \
         description. \
         Keep every value on a single line, never use tab characters inside a value, and do \
         not wrap the response in code fences."
    )
}

fn reviews_prompt(products: &[DraftedProduct]) -> String {
    let mut listing = String::new();
    for (idx, product) in products.iter().enumerate() {
        listing.push_str(&format!(
            "{}. {} - {}\n",
            idx + 1,
            product.name,
            product.description
        ));
    }
    format!(
        "Write one enthusiastic buyer review for each product below, in order. \
         Respond with a single tab-separated block: a header line `review_text` followed by \
         one data line per product. Keep each review on a single line with no tab \
         characters and no code fences.\n\nProducts:\n{listing}"
    )
}

/// Draft a full review for a product category: one call for the overview and
/// shortlist, a second for per-product review texts.
pub async fn draft_review(
    client: &dyn DraftingClient,
    category: &str,
) -> Result<ReviewDraft, IngestError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(IngestError::Validation("category is required".to_string()));
    }

    let overview_text = client
        .complete(&overview_prompt(category, DEFAULT_SHORTLIST_SIZE))
        .await
        .map_err(draft_err)?;
    let tasks = tsv::parse_tasks(&overview_text);

    let overview = tasks
        .get("task1")
        .and_then(|block| block.records.first())
        .ok_or_else(|| IngestError::Draft("response is missing the overview block".to_string()))?;
    let title = overview.get("title").cloned().unwrap_or_default();
    if title.is_empty() {
        return Err(IngestError::Draft("overview block has no title".to_string()));
    }
    let subtitle = overview.get("subtitle").cloned().unwrap_or_default();
    let introduction = overview.get("introduction").cloned().unwrap_or_default();

    let shortlist = tasks.get("task2").ok_or_else(|| {
        IngestError::Draft("response is missing the product shortlist block".to_string())
    })?;
    let products: Vec<DraftedProduct> = shortlist
        .records
        .iter()
        .filter_map(|record| {
            let name = record.get("name").cloned().unwrap_or_default();
            if name.is_empty() {
                return None;
            }
            Some(DraftedProduct {
                name,
                description: record.get("description").cloned().unwrap_or_default(),
            })
        })
        .collect();
    if products.is_empty() {
        return Err(IngestError::Draft(
            "product shortlist block has no usable rows".to_string(),
        ));
    }

    let reviews_text = client
        .complete(&reviews_prompt(&products))
        .await
        .map_err(draft_err)?;
    let review_tasks = tsv::parse_tasks(&reviews_text);
    let review_block = review_tasks
        .get("task1")
        .ok_or_else(|| IngestError::Draft("response is missing the reviews block".to_string()))?;
    let review_texts = review_block
        .records
        .iter()
        .map(|record| record.get("review_text").cloned().unwrap_or_default())
        .collect();

    Ok(ReviewDraft {
        title,
        subtitle,
        introduction,
        products,
        review_texts,
    })
}

fn draft_err(err: DraftError) -> IngestError {
    IngestError::Draft(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<Vec<Result<String, DraftError>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<String, DraftError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl DraftingClient for ScriptedClient {
        async fn complete(&self, _prompt: &str) -> Result<String, DraftError> {
            self.responses.lock().unwrap().remove(0)
        }
    }

    const OVERVIEW: &str = "title\tsubtitle\tintroduction\n\
        Best Mice of 2026\tOur favourite pointers\tWe tested a pile of mice.\n\
        ----------\n\
        name\tdescription\n\
        Mouse A\tFast and light.\n\
        Mouse B\tComfortable all day.";

    const REVIEWS: &str = "review_text\nLove it.\nVery comfy.";

    #[tokio::test]
    async fn drafts_overview_shortlist_and_reviews() {
        let client =
            ScriptedClient::new(vec![Ok(OVERVIEW.to_string()), Ok(REVIEWS.to_string())]);
        let draft = draft_review(&client, "computer mice").await.unwrap();
        assert_eq!(draft.title, "Best Mice of 2026");
        assert_eq!(draft.products.len(), 2);
        assert_eq!(draft.products[1].name, "Mouse B");
        assert_eq!(draft.review_texts, vec!["Love it.", "Very comfy."]);
    }

    #[tokio::test]
    async fn drafted_tsv_reparses_into_the_same_rows() {
        let client =
            ScriptedClient::new(vec![Ok(OVERVIEW.to_string()), Ok(REVIEWS.to_string())]);
        let draft = draft_review(&client, "computer mice").await.unwrap();
        let reparsed = tsv::parse_block(&draft.details_tsv());
        assert_eq!(reparsed.records.len(), draft.products.len());
        assert_eq!(reparsed.records[0]["name"], "Mouse A");
        let reviews = tsv::parse_block(&draft.reviews_tsv());
        assert_eq!(reviews.records.len(), 2);
    }

    #[tokio::test]
    async fn missing_shortlist_block_is_a_draft_error() {
        let client = ScriptedClient::new(vec![Ok(
            "title\tsubtitle\tintroduction\nA title\tsub\tintro".to_string(),
        )]);
        let err = draft_review(&client, "mice").await.unwrap_err();
        assert!(matches!(err, IngestError::Draft(msg) if msg.contains("shortlist")));
    }

    #[tokio::test]
    async fn collaborator_failure_yields_no_partial_draft() {
        let client = ScriptedClient::new(vec![Err(DraftError::EmptyResponse)]);
        let err = draft_review(&client, "mice").await.unwrap_err();
        assert!(matches!(err, IngestError::Draft(_)));
    }

    #[tokio::test]
    async fn blank_category_is_a_validation_error() {
        let client = ScriptedClient::new(vec![]);
        let err = draft_review(&client, "   ").await.unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }
}
