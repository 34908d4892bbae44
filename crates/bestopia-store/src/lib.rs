//! Postgres persistence for Bestopia.
//!
//! All write paths that must be atomic (review ingestion, comparison upserts)
//! run inside a single transaction; everything else is plain pooled queries.

use async_trait::async_trait;
use bestopia_core::{
    DisplayedProductReview, PersistedReview, Product, ProductReview, Review, ReviewPlan,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;

mod accounts;
mod error;
mod read;

pub use accounts::{NewUser, User, UserCredentials};
pub use error::StoreError;
pub use read::{ComparisonCell, ProductEdit, ReviewEdit, ReviewPage};

pub const CRATE_NAME: &str = "bestopia-store";

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// The persistence seam the ingestion pipeline writes through.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Persist a full review plan atomically: the review row, then each
    /// product, then each product-review, in order. Partial writes are never
    /// observable.
    async fn persist_review(&self, plan: &ReviewPlan) -> Result<PersistedReview, StoreError>;

    /// Overwrite a product's image/link fields, post-commit.
    async fn update_product_links(
        &self,
        product_id: i64,
        image_url: &str,
        product_page: &str,
    ) -> Result<(), StoreError>;

    /// Overwrite a review's cover photo, post-commit.
    async fn update_review_cover(&self, review_id: i64, cover_photo: &str)
        -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Build a store without touching the database; connections open on first
    /// use. Used by tests and by binaries that migrate before serving.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn persist_review(&self, plan: &ReviewPlan) -> Result<PersistedReview, StoreError> {
        let mut tx = self.pool.begin().await?;

        let slug = reserve_slug(&mut tx, &plan.review.slug_base).await?;
        let review_row = sqlx::query(
            r#"
            INSERT INTO reviews (slug, title, subtitle, introduction, cover_photo, tags)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, slug, title, subtitle, introduction, cover_photo, tags,
                      created_at, updated_at
            "#,
        )
        .bind(&slug)
        .bind(&plan.review.title)
        .bind(&plan.review.subtitle)
        .bind(&plan.review.introduction)
        .bind(&plan.review.cover_photo)
        .bind(&plan.review.tags)
        .fetch_one(&mut *tx)
        .await?;
        let review = review_from_row(&review_row)?;

        let mut products = Vec::with_capacity(plan.products.len());
        for planned in &plan.products {
            let product_row = sqlx::query(
                r#"
                INSERT INTO products (review_id, name, description, image_url, product_page)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, review_id, name, description, image_url, product_page,
                          created_at, updated_at
                "#,
            )
            .bind(review.id)
            .bind(&planned.name)
            .bind(&planned.description)
            .bind(&planned.image_url)
            .bind(&planned.product_page)
            .fetch_one(&mut *tx)
            .await?;
            let product = product_from_row(&product_row)?;

            if let Some(planned_review) = &planned.review {
                sqlx::query(
                    r#"
                    INSERT INTO product_reviews (product_id, user_id, rating, review_text)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(product.id)
                .bind(planned_review.user_id)
                .bind(planned_review.rating)
                .bind(&planned_review.review_text)
                .execute(&mut *tx)
                .await?;
            }

            products.push(product);
        }

        tx.commit().await?;
        Ok(PersistedReview { review, products })
    }

    async fn update_product_links(
        &self,
        product_id: i64,
        image_url: &str,
        product_page: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE products
               SET image_url = $1, product_page = $2, updated_at = NOW()
             WHERE id = $3
            "#,
        )
        .bind(image_url)
        .bind(product_page)
        .bind(product_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_review_cover(
        &self,
        review_id: i64,
        cover_photo: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE reviews
               SET cover_photo = $1, updated_at = NOW()
             WHERE id = $2
            "#,
        )
        .bind(cover_photo)
        .bind(review_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Probe `base`, `base-2`, `base-3`, ... inside the open transaction and
/// return the first slug not already taken. An empty base (symbol-only title)
/// falls back to `review`.
async fn reserve_slug(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    base: &str,
) -> Result<String, StoreError> {
    let base = if base.is_empty() { "review" } else { base };
    let mut attempt = 1u32;
    loop {
        let candidate = if attempt == 1 {
            base.to_string()
        } else {
            format!("{base}-{attempt}")
        };
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reviews WHERE slug = $1)")
                .bind(&candidate)
                .fetch_one(&mut **tx)
                .await?;
        if !taken {
            return Ok(candidate);
        }
        debug!(slug = %candidate, "slug taken, probing next candidate");
        attempt += 1;
    }
}

pub(crate) fn review_from_row(row: &PgRow) -> Result<Review, sqlx::Error> {
    Ok(Review {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        subtitle: row.try_get("subtitle")?,
        introduction: row.try_get("introduction")?,
        cover_photo: row.try_get("cover_photo")?,
        tags: row.try_get("tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: row.try_get("id")?,
        review_id: row.try_get("review_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        product_page: row.try_get("product_page")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn product_review_from_row(row: &PgRow) -> Result<ProductReview, sqlx::Error> {
    Ok(ProductReview {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        user_id: row.try_get("user_id")?,
        rating: row.try_get("rating")?,
        review_text: row.try_get("review_text")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn displayed_review_from_row(
    row: &PgRow,
) -> Result<DisplayedProductReview, sqlx::Error> {
    Ok(DisplayedProductReview {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        rating: row.try_get("rating")?,
        review_text: row.try_get("review_text")?,
        created_at: row.try_get("created_at")?,
        display_name: row.try_get("display_name")?,
        avatar: row.try_get("avatar")?,
    })
}
