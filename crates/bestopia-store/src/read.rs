//! Read-side and edit-side queries backing the public pages and admin API.

use bestopia_core::{DisplayedProductReview, Product, ProductReview, Review};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::{
    displayed_review_from_row, product_from_row, product_review_from_row, review_from_row, PgStore,
    StoreError,
};

/// One page of reviews plus the page count for pagination controls.
#[derive(Debug, Clone)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewEdit {
    pub title: String,
    pub subtitle: String,
    pub introduction: String,
    pub cover_photo: String,
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductEdit {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub product_page: String,
}

/// One cell of a product-comparison table, keyed by `(product_id, aspect)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonCell {
    pub product_id: i64,
    pub aspect: String,
    pub comparison_point: String,
}

const REVIEW_COLUMNS: &str =
    "id, slug, title, subtitle, introduction, cover_photo, tags, created_at, updated_at";

impl PgStore {
    pub async fn paged_reviews(&self, page: i64, per_page: i64) -> Result<ReviewPage, StoreError> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;
        let reviews = rows
            .iter()
            .map(review_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReviewPage {
            reviews,
            page,
            total_pages: (total as u64).div_ceil(per_page as u64).max(1) as i64,
        })
    }

    pub async fn latest_reviews(&self, limit: i64) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(review_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn review_by_slug(&self, slug: &str) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(review_from_row).transpose()?)
    }

    pub async fn review_by_id(&self, id: i64) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(review_from_row).transpose()?)
    }

    /// A handful of other reviews for the "more reviews" rail.
    pub async fn random_reviews(
        &self,
        limit: i64,
        exclude_id: i64,
    ) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id <> $1 ORDER BY RANDOM() LIMIT $2"
        ))
        .bind(exclude_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(review_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn search_reviews(
        &self,
        keyword: &str,
        page: i64,
        per_page: i64,
    ) -> Result<ReviewPage, StoreError> {
        let pattern = format!("%{keyword}%");
        let page = page.max(1);
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews \
             WHERE title ILIKE $1 OR subtitle ILIKE $1 OR introduction ILIKE $1 OR tags ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews \
             WHERE title ILIKE $1 OR subtitle ILIKE $1 OR introduction ILIKE $1 OR tags ILIKE $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;
        let reviews = rows
            .iter()
            .map(review_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReviewPage {
            reviews,
            page,
            total_pages: (total as u64).div_ceil(per_page as u64).max(1) as i64,
        })
    }

    /// Reviews whose comma-separated tags column mentions `tag`.
    pub async fn reviews_by_tag(
        &self,
        tag: &str,
        page: i64,
        per_page: i64,
    ) -> Result<ReviewPage, StoreError> {
        let pattern = format!("%{tag}%");
        let page = page.max(1);
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE tags ILIKE $1")
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE tags ILIKE $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;
        let reviews = rows
            .iter()
            .map(review_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReviewPage {
            reviews,
            page,
            total_pages: (total as u64).div_ceil(per_page as u64).max(1) as i64,
        })
    }

    pub async fn products_for_review(&self, review_id: i64) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, review_id, name, description, image_url, product_page, \
                    created_at, updated_at \
             FROM products WHERE review_id = $1 ORDER BY id",
        )
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn product_reviews_for_review(
        &self,
        review_id: i64,
    ) -> Result<Vec<ProductReview>, StoreError> {
        let rows = sqlx::query(
            "SELECT pr.id, pr.product_id, pr.user_id, pr.rating, pr.review_text, \
                    pr.created_at, pr.updated_at \
             FROM product_reviews pr \
             JOIN products p ON p.id = pr.product_id \
             WHERE p.review_id = $1 ORDER BY pr.id",
        )
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(product_review_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Product reviews joined with reviewer display identity, for rendering.
    pub async fn displayed_reviews_for_product(
        &self,
        product_id: i64,
    ) -> Result<Vec<DisplayedProductReview>, StoreError> {
        let rows = sqlx::query(
            "SELECT pr.id, pr.user_id, pr.rating, pr.review_text, pr.created_at, \
                    u.display_name, u.avatar \
             FROM product_reviews pr \
             JOIN users u ON u.id = pr.user_id \
             WHERE pr.product_id = $1 ORDER BY pr.id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(displayed_review_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn update_review(&self, id: i64, edit: &ReviewEdit) -> Result<Review, StoreError> {
        let row = sqlx::query(
            "UPDATE reviews \
                SET title = $1, subtitle = $2, introduction = $3, cover_photo = $4, \
                    tags = $5, updated_at = NOW() \
              WHERE id = $6 \
              RETURNING id, slug, title, subtitle, introduction, cover_photo, tags, \
                        created_at, updated_at",
        )
        .bind(&edit.title)
        .bind(&edit.subtitle)
        .bind(&edit.introduction)
        .bind(&edit.cover_photo)
        .bind(&edit.tags)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(review_from_row(&row)?),
            None => Err(StoreError::NotFound("review")),
        }
    }

    pub async fn update_product(&self, id: i64, edit: &ProductEdit) -> Result<Product, StoreError> {
        let row = sqlx::query(
            "UPDATE products \
                SET name = $1, description = $2, image_url = $3, product_page = $4, \
                    updated_at = NOW() \
              WHERE id = $5 \
              RETURNING id, review_id, name, description, image_url, product_page, \
                        created_at, updated_at",
        )
        .bind(&edit.name)
        .bind(&edit.description)
        .bind(&edit.image_url)
        .bind(&edit.product_page)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(product_from_row(&row)?),
            None => Err(StoreError::NotFound("product")),
        }
    }

    /// Insert-or-update every comparison cell in one transaction.
    pub async fn upsert_comparisons(&self, cells: &[ComparisonCell]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for cell in cells {
            sqlx::query(
                "INSERT INTO product_comparisons (product_id, aspect, comparison_point) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (product_id, aspect) \
                 DO UPDATE SET comparison_point = EXCLUDED.comparison_point",
            )
            .bind(cell.product_id)
            .bind(&cell.aspect)
            .bind(&cell.comparison_point)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn comparisons_for_products(
        &self,
        product_ids: &[i64],
    ) -> Result<Vec<ComparisonCell>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, aspect, comparison_point \
             FROM product_comparisons WHERE product_id = ANY($1) ORDER BY id",
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;
        let mut cells = Vec::with_capacity(rows.len());
        for row in rows {
            cells.push(ComparisonCell {
                product_id: row.try_get("product_id")?,
                aspect: row.try_get("aspect")?,
                comparison_point: row.try_get("comparison_point")?,
            });
        }
        Ok(cells)
    }

    /// Slugs for the sitemap, oldest first, capped.
    pub async fn slugs_for_sitemap(&self, limit: i64) -> Result<Vec<String>, StoreError> {
        let slugs = sqlx::query_scalar(
            "SELECT slug FROM reviews ORDER BY created_at ASC, id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(slugs)
    }

    pub async fn insert_support_request(
        &self,
        email: &str,
        message: &str,
    ) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO support_requests (email, message) VALUES ($1, $2) RETURNING id",
        )
        .bind(email)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}
