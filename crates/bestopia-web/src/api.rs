//! JSON API routes: ingestion, drafting, edits, search, auth, support.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bestopia_core::GenderPreference;
use bestopia_ingest::{draft_review, tsv, ReviewSubmission};
use bestopia_store::{NewUser, ProductEdit, ReviewEdit};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewBody {
    /// Present => draft-only mode: no TSV blocks, nothing is persisted.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub cover_photo: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub product_details: String,
    #[serde(default)]
    pub product_reviews: String,
    #[serde(default)]
    pub gender: GenderPreference,
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateReviewBody>,
) -> Result<Response, ApiError> {
    auth::require_admin(&state, &headers).await?;

    if !body.category.trim().is_empty() {
        let draft = draft_review(state.drafting.as_ref(), &body.category).await?;
        info!(category = %body.category.trim(), products = draft.products.len(), "drafted review");
        return Ok(Json(draft).into_response());
    }

    let submission = ReviewSubmission {
        title: body.title,
        subtitle: body.subtitle,
        introduction: body.introduction,
        cover_photo: body.cover_photo,
        tags: body.tags,
        product_details: body.product_details,
        product_reviews: body.product_reviews,
        gender: body.gender,
    };
    let persisted = state.pipeline.ingest(&submission).await?;
    Ok((StatusCode::CREATED, Json(persisted)).into_response())
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub page: Option<i64>,
}

pub async fn search_reviews(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let keyword = query.keyword.as_deref().unwrap_or("").trim().to_string();
    if keyword.is_empty() {
        return Err(ApiError::BadRequest(
            "Keyword parameter is required".to_string(),
        ));
    }
    let page = query.page.unwrap_or(1);
    if page < 1 {
        return Err(ApiError::BadRequest("Invalid page parameter".to_string()));
    }
    let result = state
        .store
        .search_reviews(&keyword, page, state.site.page_size)
        .await?;
    Ok(Json(json!({
        "reviews": result.reviews,
        "totalPages": result.total_pages,
    })))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth::require_admin(&state, &headers).await?;
    let review = state
        .store
        .review_by_id(id)
        .await?
        .ok_or(ApiError::Store(bestopia_store::StoreError::NotFound("review")))?;
    let products = state.store.products_for_review(id).await?;
    let product_reviews = state.store.product_reviews_for_review(id).await?;
    Ok(Json(json!({
        "review": review,
        "products": products,
        "product_reviews": product_reviews,
    })))
}

pub async fn update_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(edit): Json<ReviewEdit>,
) -> Result<Json<bestopia_core::Review>, ApiError> {
    auth::require_admin(&state, &headers).await?;
    let review = state.store.update_review(id, &edit).await?;
    Ok(Json(review))
}

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(edit): Json<ProductEdit>,
) -> Result<Json<bestopia_core::Product>, ApiError> {
    auth::require_admin(&state, &headers).await?;
    let product = state.store.update_product(id, &edit).await?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonsBody {
    #[serde(default)]
    pub product_ids: Vec<i64>,
    #[serde(default)]
    pub product_comparisons: String,
}

pub async fn save_comparisons(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ComparisonsBody>,
) -> Result<Response, ApiError> {
    auth::require_admin(&state, &headers).await?;
    if body.product_ids.is_empty() || body.product_comparisons.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required fields: productIds or productComparisons".to_string(),
        ));
    }
    let cells = tsv::parse_comparisons(&body.product_ids, body.product_comparisons.trim());
    state.store.upsert_comparisons(&cells).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product comparisons saved successfully" })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct SignupBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupBody>,
) -> Result<Response, ApiError> {
    let username = body.username.trim();
    let display_name = body.display_name.trim();
    let email = body.email.trim();
    if username.is_empty() || display_name.is_empty() || email.is_empty() || body.password.is_empty()
    {
        return Err(ApiError::BadRequest(
            "username, display_name, email and password are required".to_string(),
        ));
    }
    let password_hash = auth::hash_password(&body.password)?;
    let user = state
        .store
        .create_user(&NewUser {
            username: username.to_string(),
            display_name: display_name.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SigninBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn signin(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SigninBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let credentials = state
        .store
        .credentials_by_email(body.email.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !auth::verify_password(&credentials.password_hash, &body.password) {
        return Err(ApiError::InvalidCredentials);
    }
    let token = auth::issue_token(&state.auth, credentials.id, &credentials.email)?;
    Ok(Json(json!({ "token": token, "role": credentials.role })))
}

#[derive(Debug, Deserialize)]
pub struct SupportRequestBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

pub async fn support_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SupportRequestBody>,
) -> Result<Response, ApiError> {
    let email = body.email.trim();
    let message = body.message.trim();
    if email.is_empty() || message.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and message are required.".to_string(),
        ));
    }
    let id = state.store.insert_support_request(email, message).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}
