//! Core domain model for Bestopia.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "bestopia-core";

/// A published comparison page: narrative text plus a ranked set of products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub subtitle: String,
    pub introduction: String,
    pub cover_photo: String,
    pub tags: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One item under review, owned by exactly one [`Review`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub review_id: i64,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub product_page: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single simulated-reviewer opinion attached to one [`Product`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReview {
    pub id: i64,
    pub product_id: i64,
    pub user_id: i64,
    pub rating: f64,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product review joined with its reviewer identity for page rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayedProductReview {
    pub id: i64,
    pub user_id: i64,
    pub rating: f64,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    pub display_name: String,
    pub avatar: String,
}

/// Which reviewer identity pool ingestion should draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderPreference {
    #[default]
    All,
    Woman,
    Man,
}

/// Review fields as planned by the ingestion pipeline, before any id exists.
///
/// `slug_base` is the collision-unaware slug derived from the title; the
/// store is responsible for reserving a free variant of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub slug_base: String,
    pub title: String,
    pub subtitle: String,
    pub introduction: String,
    pub cover_photo: String,
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedProductReview {
    pub user_id: i64,
    pub rating: f64,
    pub review_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedProduct {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub product_page: String,
    pub review: Option<PlannedProductReview>,
}

/// The full write set for one ingestion call. Persisted atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPlan {
    pub review: NewReview,
    pub products: Vec<PlannedProduct>,
}

/// What the store hands back after committing a [`ReviewPlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedReview {
    pub review: Review,
    pub products: Vec<Product>,
}

/// Derive a URL slug from a review title: lowercase, with every run of
/// non-alphanumeric characters collapsed into a single hyphen.
pub fn slugify(title: &str) -> String {
    title
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Best Mice"), "best-mice");
        assert_eq!(slugify("Top 5 TVs of 2026!"), "top-5-tvs-of-2026");
    }

    #[test]
    fn slugify_collapses_punctuation_runs() {
        assert_eq!(slugify("Budget -- Gaming // Laptops"), "budget-gaming-laptops");
        assert_eq!(slugify("  padded   title  "), "padded-title");
    }

    #[test]
    fn slugify_of_symbols_only_is_empty() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn gender_preference_deserializes_lowercase() {
        let pref: GenderPreference = serde_json::from_str("\"woman\"").unwrap();
        assert_eq!(pref, GenderPreference::Woman);
        let default: GenderPreference = GenderPreference::default();
        assert_eq!(default, GenderPreference::All);
    }
}
