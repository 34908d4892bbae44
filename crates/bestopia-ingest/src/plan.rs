//! Pure plan building: raw submission text in, a full [`ReviewPlan`] out.
//! No I/O happens here; every validation failure surfaces before a
//! transaction is ever opened.

use std::collections::HashMap;

use bestopia_core::{
    slugify, GenderPreference, NewReview, PlannedProduct, PlannedProductReview, ReviewPlan,
};
use rand::Rng;

use crate::rating::RatingLadder;
use crate::reviewers::ReviewerPools;
use crate::{tsv, IngestError};

/// Raw ingestion input as submitted by the admin.
#[derive(Debug, Clone, Default)]
pub struct ReviewSubmission {
    pub title: String,
    pub subtitle: String,
    pub introduction: String,
    pub cover_photo: String,
    pub tags: String,
    pub product_details: String,
    pub product_reviews: String,
    pub gender: GenderPreference,
}

/// Parse both TSV blocks, correlate product-review rows with product rows by
/// position, assign reviewer identities and ratings, and derive the slug and
/// effective cover photo.
pub fn build_plan<R: Rng>(
    submission: &ReviewSubmission,
    pools: &ReviewerPools,
    rng: &mut R,
) -> Result<ReviewPlan, IngestError> {
    let title = required(&submission.title, "title")?;
    let subtitle = required(&submission.subtitle, "subtitle")?;
    let introduction = required(&submission.introduction, "introduction")?;
    let details_text = required(&submission.product_details, "productDetails")?;
    let reviews_text = required(&submission.product_reviews, "productReviews")?;

    let details = tsv::parse_block(details_text);
    if details.records.is_empty() {
        return Err(IngestError::Validation(
            "productDetails must contain a header row and at least one data row".to_string(),
        ));
    }
    let review_rows = tsv::parse_block(reviews_text);

    let mut ladder = RatingLadder::new();
    let mut products = Vec::with_capacity(details.records.len());
    for (position, record) in details.records.iter().enumerate() {
        let name = field(record, "name");
        if name.is_empty() {
            return Err(IngestError::Validation(format!(
                "product row {} is missing a name",
                position + 1
            )));
        }
        // Row i of the review block belongs to product i; excess review rows
        // are ignored, missing ones leave the product without a review.
        let review = review_rows
            .records
            .get(position)
            .map(|row| PlannedProductReview {
                user_id: pools.assign(submission.gender, rng),
                rating: ladder.rate(position, rng),
                review_text: field(row, "review_text"),
            });
        products.push(PlannedProduct {
            name,
            description: field(record, "description"),
            image_url: field(record, "image_url"),
            product_page: field(record, "product_page"),
            review,
        });
    }

    let explicit_cover = submission.cover_photo.trim();
    let cover_photo = if explicit_cover.is_empty() {
        products[0].image_url.clone()
    } else {
        explicit_cover.to_string()
    };

    Ok(ReviewPlan {
        review: NewReview {
            slug_base: slugify(title),
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            introduction: introduction.to_string(),
            cover_photo,
            tags: submission.tags.trim().to_string(),
        },
        products,
    })
}

fn required<'a>(value: &'a str, label: &str) -> Result<&'a str, IngestError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IngestError::Validation(format!("{label} is required")));
    }
    Ok(trimmed)
}

fn field(record: &HashMap<String, String>, key: &str) -> String {
    record.get(key).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn submission() -> ReviewSubmission {
        ReviewSubmission {
            title: "Best Mice".to_string(),
            subtitle: "Our favourite pointers".to_string(),
            introduction: "We tested a pile of mice.".to_string(),
            product_details: "name\tdescription\nMouse A\tGreat mouse".to_string(),
            product_reviews: "review_text\nSolid choice.".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn single_product_plan_matches_the_worked_example() {
        let pools = ReviewerPools::default();
        let plan = build_plan(&submission(), &pools, &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(plan.review.slug_base, "best-mice");
        assert_eq!(plan.products.len(), 1);
        assert_eq!(plan.products[0].name, "Mouse A");
        let review = plan.products[0].review.as_ref().unwrap();
        assert_eq!(review.rating, 5.0);
        assert_eq!(review.review_text, "Solid choice.");
        assert!(pools.women.contains(&review.user_id) || pools.men.contains(&review.user_id));
    }

    #[test]
    fn missing_required_field_is_a_validation_error() {
        let mut sub = submission();
        sub.introduction = "   ".to_string();
        let err = build_plan(&sub, &ReviewerPools::default(), &mut StepRng::new(0, 0))
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(msg) if msg.contains("introduction")));
    }

    #[test]
    fn header_only_details_block_is_rejected() {
        let mut sub = submission();
        sub.product_details = "name\tdescription".to_string();
        let err = build_plan(&sub, &ReviewerPools::default(), &mut StepRng::new(0, 0))
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn nameless_product_row_is_rejected() {
        let mut sub = submission();
        sub.product_details = "name\tdescription\n\tno name here".to_string();
        let err = build_plan(&sub, &ReviewerPools::default(), &mut StepRng::new(0, 0))
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(msg) if msg.contains("row 1")));
    }

    #[test]
    fn five_products_get_position_correlated_reviews_and_ladder_ratings() {
        let mut sub = submission();
        sub.product_details = "name\tdescription\timage_url\n\
                               A\tfirst\thttps://img/a.jpg\n\
                               B\tsecond\thttps://img/b.jpg\n\
                               C\tthird\t\n\
                               D\tfourth\t\n\
                               E\tfifth\t"
            .to_string();
        sub.product_reviews = "review_text\nr0\nr1\nr2\nr3\nr4".to_string();
        let plan =
            build_plan(&sub, &ReviewerPools::default(), &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(plan.products.len(), 5);
        let ratings: Vec<f64> = plan
            .products
            .iter()
            .map(|p| p.review.as_ref().unwrap().rating)
            .collect();
        assert_eq!(ratings, vec![5.0, 5.0, 5.0, 4.9, 4.8]);
        assert_eq!(plan.products[3].review.as_ref().unwrap().review_text, "r3");
    }

    #[test]
    fn shorter_review_block_leaves_trailing_products_unreviewed() {
        let mut sub = submission();
        sub.product_details = "name\nA\nB\nC".to_string();
        sub.product_reviews = "review_text\nonly one".to_string();
        let plan =
            build_plan(&sub, &ReviewerPools::default(), &mut StepRng::new(0, 0)).unwrap();
        assert!(plan.products[0].review.is_some());
        assert!(plan.products[1].review.is_none());
        assert!(plan.products[2].review.is_none());
    }

    #[test]
    fn excess_review_rows_are_ignored() {
        let mut sub = submission();
        sub.product_reviews = "review_text\none\ntwo\nthree".to_string();
        let plan =
            build_plan(&sub, &ReviewerPools::default(), &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(plan.products.len(), 1);
        assert_eq!(plan.products[0].review.as_ref().unwrap().review_text, "one");
    }

    #[test]
    fn empty_cover_photo_falls_back_to_first_product_image() {
        let mut sub = submission();
        sub.product_details =
            "name\tdescription\timage_url\nMouse A\tGreat\thttps://img/a.jpg".to_string();
        let plan =
            build_plan(&sub, &ReviewerPools::default(), &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(plan.review.cover_photo, "https://img/a.jpg");

        sub.cover_photo = "https://img/cover.jpg".to_string();
        let plan =
            build_plan(&sub, &ReviewerPools::default(), &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(plan.review.cover_photo, "https://img/cover.jpg");
    }

    #[test]
    fn missing_optional_product_fields_default_to_empty_strings() {
        let plan = build_plan(&submission(), &ReviewerPools::default(), &mut StepRng::new(0, 0))
            .unwrap();
        assert_eq!(plan.products[0].image_url, "");
        assert_eq!(plan.products[0].product_page, "");
        assert_eq!(plan.review.cover_photo, "");
    }

    #[test]
    fn woman_preference_flows_through_to_every_assignment() {
        let mut sub = submission();
        sub.gender = GenderPreference::Woman;
        sub.product_details = "name\nA\nB\nC\nD".to_string();
        sub.product_reviews = "review_text\na\nb\nc\nd".to_string();
        let pools = ReviewerPools::default();
        let plan = build_plan(&sub, &pools, &mut rand::thread_rng()).unwrap();
        for product in &plan.products {
            let review = product.review.as_ref().unwrap();
            assert!(pools.women.contains(&review.user_id));
        }
    }
}
