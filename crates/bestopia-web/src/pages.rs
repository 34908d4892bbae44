//! Server-rendered public pages.

use std::sync::Arc;

use askama::Template;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use bestopia_core::{DisplayedProductReview, Product, Review};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

const APP_CSS: &str = include_str!("../assets/app.css");
const SITEMAP_LIMIT: i64 = 1000;
const MORE_REVIEWS: i64 = 3;

#[derive(Debug, Clone)]
pub struct ReviewCard {
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub introduction: String,
    pub cover_photo: String,
}

impl ReviewCard {
    fn from_review(review: &Review) -> Self {
        Self {
            href: format!("/reviews/{}", review.slug),
            title: review.title.clone(),
            subtitle: review.subtitle.clone(),
            introduction: review.introduction.clone(),
            cover_photo: review.cover_photo.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: i64,
    pub href: String,
    pub current: bool,
}

fn pagination(base_path: &str, page: i64, total_pages: i64) -> Vec<PageLink> {
    (1..=total_pages.max(1))
        .map(|number| PageLink {
            number,
            href: format!("{base_path}?page={number}"),
            current: number == page,
        })
        .collect()
}

#[derive(Debug, Clone)]
struct ProductReviewView {
    display_name: String,
    avatar: String,
    rating: String,
    review_text: String,
}

#[derive(Debug, Clone)]
struct ProductView {
    rank: usize,
    name: String,
    description: String,
    image_url: String,
    product_page: String,
    average_rating: String,
    reviews: Vec<ProductReviewView>,
}

#[derive(Debug, Clone)]
struct ComparisonRowView {
    aspect: String,
    points: Vec<String>,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    cards: Vec<ReviewCard>,
}

#[derive(Template)]
#[template(path = "listing.html")]
struct ListingTemplate {
    heading: String,
    cards: Vec<ReviewCard>,
    pages: Vec<PageLink>,
}

#[derive(Template)]
#[template(path = "review.html")]
struct ReviewDetailTemplate {
    title: String,
    subtitle: String,
    introduction: String,
    cover_photo: String,
    published: String,
    share_url: String,
    products: Vec<ProductView>,
    has_comparisons: bool,
    comparison_names: Vec<String>,
    comparison_rows: Vec<ComparisonRowView>,
    more: Vec<ReviewCard>,
    structured_data: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    page: Option<i64>,
}

pub async fn home(State(state): State<Arc<AppState>>) -> Response {
    match state.store.latest_reviews(6).await {
        Ok(reviews) => render_html(HomeTemplate {
            cards: reviews.iter().map(ReviewCard::from_review).collect(),
        }),
        Err(err) => server_error(err.into()),
    }
}

pub async fn review_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = query.page.unwrap_or(1).max(1);
    match state.store.paged_reviews(page, state.site.page_size).await {
        Ok(result) => render_html(ListingTemplate {
            heading: "All Reviews".to_string(),
            cards: result.reviews.iter().map(ReviewCard::from_review).collect(),
            pages: pagination("/reviews", result.page, result.total_pages),
        }),
        Err(err) => server_error(err.into()),
    }
}

pub async fn tag_page(
    State(state): State<Arc<AppState>>,
    AxumPath(tag): AxumPath<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = query.page.unwrap_or(1).max(1);
    match state
        .store
        .reviews_by_tag(&tag, page, state.site.page_size)
        .await
    {
        Ok(result) => render_html(ListingTemplate {
            heading: format!("Reviews tagged \u{201c}{tag}\u{201d}"),
            cards: result.reviews.iter().map(ReviewCard::from_review).collect(),
            pages: pagination(&format!("/t/{tag}"), result.page, result.total_pages),
        }),
        Err(err) => server_error(err.into()),
    }
}

pub async fn review_detail(
    State(state): State<Arc<AppState>>,
    AxumPath(slug): AxumPath<String>,
) -> Response {
    match load_review_detail(&state, &slug).await {
        Ok(Some(template)) => render_html(template),
        Ok(None) => {
            (StatusCode::NOT_FOUND, Html("Review not found".to_string())).into_response()
        }
        Err(err) => server_error(err),
    }
}

async fn load_review_detail(
    state: &AppState,
    slug: &str,
) -> anyhow::Result<Option<ReviewDetailTemplate>> {
    let Some(review) = state.store.review_by_slug(slug).await? else {
        return Ok(None);
    };

    let products = state.store.products_for_review(review.id).await?;
    let mut product_views = Vec::with_capacity(products.len());
    for (idx, product) in products.iter().enumerate() {
        let reviews = state.store.displayed_reviews_for_product(product.id).await?;
        product_views.push(product_view(idx, product, &reviews));
    }

    let product_ids: Vec<i64> = products.iter().map(|p| p.id).collect();
    let cells = state.store.comparisons_for_products(&product_ids).await?;
    let comparison_rows = comparison_rows(&product_ids, cells);

    let more = state.store.random_reviews(MORE_REVIEWS, review.id).await?;

    let structured_data = structured_data(&review, &products, &product_views);
    Ok(Some(ReviewDetailTemplate {
        share_url: format!(
            "{}/reviews/{}",
            state.site.base_url.trim_end_matches('/'),
            review.slug
        ),
        published: review.created_at.format("%B %e, %Y").to_string(),
        title: review.title,
        subtitle: review.subtitle,
        introduction: review.introduction,
        cover_photo: review.cover_photo,
        has_comparisons: !comparison_rows.is_empty(),
        comparison_names: products.iter().map(|p| p.name.clone()).collect(),
        comparison_rows,
        products: product_views,
        more: more.iter().map(ReviewCard::from_review).collect(),
        structured_data,
    }))
}

fn product_view(idx: usize, product: &Product, reviews: &[DisplayedProductReview]) -> ProductView {
    let average_rating = if reviews.is_empty() {
        String::new()
    } else {
        let sum: f64 = reviews.iter().map(|r| r.rating).sum();
        format!("{:.1}", sum / reviews.len() as f64)
    };
    ProductView {
        rank: idx + 1,
        name: product.name.clone(),
        description: product.description.clone(),
        image_url: product.image_url.clone(),
        product_page: product.product_page.clone(),
        average_rating,
        reviews: reviews
            .iter()
            .map(|r| ProductReviewView {
                display_name: r.display_name.clone(),
                avatar: r.avatar.clone(),
                rating: format!("{:.1}", r.rating),
                review_text: r.review_text.clone(),
            })
            .collect(),
    }
}

/// Group comparison cells into one row per aspect (first-seen order), with
/// points aligned to the product column order.
fn comparison_rows(
    product_ids: &[i64],
    cells: Vec<bestopia_store::ComparisonCell>,
) -> Vec<ComparisonRowView> {
    let mut rows: Vec<ComparisonRowView> = Vec::new();
    for cell in cells {
        let Some(column) = product_ids.iter().position(|id| *id == cell.product_id) else {
            continue;
        };
        let row = match rows.iter_mut().find(|row| row.aspect == cell.aspect) {
            Some(row) => row,
            None => {
                rows.push(ComparisonRowView {
                    aspect: cell.aspect.clone(),
                    points: vec![String::new(); product_ids.len()],
                });
                rows.last_mut().expect("row was just pushed")
            }
        };
        row.points[column] = cell.comparison_point;
    }
    rows
}

/// schema.org Review markup for search engines, mirroring the page content.
fn structured_data(review: &Review, products: &[Product], views: &[ProductView]) -> String {
    let author = views
        .iter()
        .flat_map(|view| view.reviews.first())
        .map(|r| r.display_name.clone())
        .next()
        .unwrap_or_else(|| "Bestopia Editors".to_string());

    let items: Vec<serde_json::Value> = products
        .iter()
        .zip(views)
        .map(|(product, view)| {
            let mut item = json!({
                "@type": "Product",
                "name": product.name,
                "image": product.image_url,
                "description": product.description,
                "offers": {
                    "@type": "Offer",
                    "url": product.product_page,
                    "availability": "https://schema.org/InStock",
                },
            });
            if !view.reviews.is_empty() {
                item["aggregateRating"] = json!({
                    "@type": "AggregateRating",
                    "ratingValue": view.average_rating,
                    "reviewCount": view.reviews.len(),
                });
            }
            item
        })
        .collect();

    json!({
        "@context": "https://schema.org",
        "@type": "Review",
        "name": review.title,
        "author": { "@type": "Person", "name": author },
        "datePublished": review.created_at.to_rfc3339(),
        "reviewBody": review.introduction,
        "itemReviewed": items,
    })
    .to_string()
}

pub async fn sitemap(State(state): State<Arc<AppState>>) -> Response {
    match state.store.slugs_for_sitemap(SITEMAP_LIMIT).await {
        Ok(slugs) => (
            [(header::CONTENT_TYPE, "application/xml")],
            render_sitemap(&state.site.base_url, &slugs),
        )
            .into_response(),
        Err(err) => server_error(err.into()),
    }
}

/// Render the sitemap XML for the given slugs.
pub fn render_sitemap(base_url: &str, slugs: &[String]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for slug in slugs {
        xml.push_str(&format!(
            "  <url>\n    <loc>{base}/reviews/{slug}</loc>\n    <changefreq>weekly</changefreq>\n  </url>\n"
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub async fn app_css() -> Response {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], APP_CSS).into_response()
}

fn render_html<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {err}")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review() -> Review {
        let now = Utc::now();
        Review {
            id: 1,
            slug: "best-mice".to_string(),
            title: "Best Mice".to_string(),
            subtitle: "Our favourite pointers".to_string(),
            introduction: "We tested a pile of mice.".to_string(),
            cover_photo: "https://img/cover.jpg".to_string(),
            tags: "mice, peripherals".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn product(id: i64, name: &str) -> Product {
        let now = Utc::now();
        Product {
            id,
            review_id: 1,
            name: name.to_string(),
            description: format!("{name} description"),
            image_url: format!("https://img/{id}.jpg"),
            product_page: format!("https://shop/{id}"),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pagination_marks_the_current_page() {
        let pages = pagination("/reviews", 2, 3);
        assert_eq!(pages.len(), 3);
        assert!(!pages[0].current);
        assert!(pages[1].current);
        assert_eq!(pages[2].href, "/reviews?page=3");
    }

    #[test]
    fn sitemap_lists_every_slug() {
        let xml = render_sitemap(
            "https://bestopia.example/",
            &["best-mice".to_string(), "best-tvs".to_string()],
        );
        assert!(xml.starts_with("<?xml version=\"1.0\""));
        assert!(xml.contains("<loc>https://bestopia.example/reviews/best-mice</loc>"));
        assert!(xml.contains("<loc>https://bestopia.example/reviews/best-tvs</loc>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn comparison_cells_group_into_aligned_rows() {
        let cells = vec![
            bestopia_store::ComparisonCell {
                product_id: 10,
                aspect: "Weight".to_string(),
                comparison_point: "60g".to_string(),
            },
            bestopia_store::ComparisonCell {
                product_id: 11,
                aspect: "Weight".to_string(),
                comparison_point: "80g".to_string(),
            },
            bestopia_store::ComparisonCell {
                product_id: 11,
                aspect: "Sensor".to_string(),
                comparison_point: "optical".to_string(),
            },
        ];
        let rows = comparison_rows(&[10, 11], cells);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].aspect, "Weight");
        assert_eq!(rows[0].points, vec!["60g", "80g"]);
        assert_eq!(rows[1].points, vec!["", "optical"]);
    }

    #[test]
    fn structured_data_is_valid_json_with_ratings() {
        let products = vec![product(10, "Mouse A")];
        let views = vec![product_view(
            0,
            &products[0],
            &[DisplayedProductReview {
                id: 1,
                user_id: 2,
                rating: 5.0,
                review_text: "Great.".to_string(),
                created_at: Utc::now(),
                display_name: "Emily Johnson".to_string(),
                avatar: String::new(),
            }],
        )];
        let data = structured_data(&review(), &products, &views);
        let parsed: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed["@type"], "Review");
        assert_eq!(parsed["author"]["name"], "Emily Johnson");
        assert_eq!(parsed["itemReviewed"][0]["name"], "Mouse A");
        assert_eq!(
            parsed["itemReviewed"][0]["aggregateRating"]["reviewCount"],
            1
        );
    }

    #[test]
    fn average_rating_rounds_to_one_decimal() {
        let p = product(10, "Mouse A");
        let mk = |rating: f64| DisplayedProductReview {
            id: 1,
            user_id: 2,
            rating,
            review_text: String::new(),
            created_at: Utc::now(),
            display_name: "x".to_string(),
            avatar: String::new(),
        };
        let view = product_view(0, &p, &[mk(4.8), mk(4.9)]);
        assert_eq!(view.average_rating, "4.9");
        let empty = product_view(0, &p, &[]);
        assert_eq!(empty.average_rating, "");
    }

    #[test]
    fn templates_render_with_sample_data() {
        let home = HomeTemplate {
            cards: vec![ReviewCard::from_review(&review())],
        };
        assert!(home.render().unwrap().contains("Best Mice"));

        let listing = ListingTemplate {
            heading: "All Reviews".to_string(),
            cards: vec![ReviewCard::from_review(&review())],
            pages: pagination("/reviews", 1, 2),
        };
        let html = listing.render().unwrap();
        assert!(html.contains("All Reviews"));
        assert!(html.contains("?page=2"));

        let products = vec![product(10, "Mouse A")];
        let views = vec![product_view(0, &products[0], &[])];
        let detail = ReviewDetailTemplate {
            title: "Best Mice".to_string(),
            subtitle: "Our favourite pointers".to_string(),
            introduction: "We tested a pile of mice.".to_string(),
            cover_photo: String::new(),
            published: "August  6, 2026".to_string(),
            share_url: "https://bestopia.example/reviews/best-mice".to_string(),
            products: views,
            has_comparisons: false,
            comparison_names: vec!["Mouse A".to_string()],
            comparison_rows: vec![],
            more: vec![],
            structured_data: "{}".to_string(),
        };
        let html = detail.render().unwrap();
        assert!(html.contains("Mouse A"));
        assert!(html.contains("Best Mice"));
    }
}
