use axum::extract::{Extension, State};
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::middleware::AdminContext;
use crate::models::{
    CreatePromoCode, Paginated, PaginationQuery, PromoCode, PromoCodeUsage, UpdatePromoCode,
};
use crate::promo::{check_amount, normalize_new_code};
use crate::util::page_bounds;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromoCodesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_deleted: bool,
}

fn check_percent(percent: i32) -> Result<()> {
    if !(1..=100).contains(&percent) {
        return Err(AppError::BadRequest(
            "discountPercent must be between 1 and 100".into(),
        ));
    }
    Ok(())
}

fn check_usage_limit(limit: i64) -> Result<()> {
    if limit < 1 {
        return Err(AppError::BadRequest("usageLimit must be at least 1".into()));
    }
    Ok(())
}

/// Empty descriptions are stored as NULL.
fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

pub async fn create_promo_code(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Json(input): Json<CreatePromoCode>,
) -> Result<Json<PromoCode>> {
    check_percent(input.discount_percent)?;
    if let Some(amount) = input.discount_amount {
        check_amount("discountAmount", amount)?;
    }
    if let Some(limit) = input.usage_limit {
        check_usage_limit(limit)?;
    }

    let input = CreatePromoCode {
        code: normalize_new_code(&input.code)?,
        description: clean_description(input.description),
        ..input
    };

    let conn = state.db.get()?;
    if queries::get_promo_code_by_code(&conn, &input.code)?.is_some() {
        return Err(AppError::Conflict(format!(
            "Promo code {} already exists",
            input.code
        )));
    }
    let promo = queries::create_promo_code(&conn, &input)?;

    tracing::info!(
        admin_id = %ctx.user.id,
        api_key_id = %ctx.api_key_id,
        promo_code_id = %promo.id,
        code = %promo.code,
        "Promo code created"
    );

    Ok(Json(promo))
}

pub async fn list_promo_codes(
    State(state): State<AppState>,
    Query(query): Query<ListPromoCodesQuery>,
) -> Result<Json<Paginated<PromoCode>>> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let conn = state.db.get()?;
    let (items, total) =
        queries::list_promo_codes_paginated(&conn, query.include_deleted, limit, offset)?;
    Ok(Json(Paginated::new(items, total, limit, offset)))
}

pub async fn get_promo_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromoCode>> {
    let conn = state.db.get()?;
    let promo = queries::get_promo_code_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Promo code not found".into()))?;
    Ok(Json(promo))
}

pub async fn update_promo_code(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePromoCode>,
) -> Result<Json<PromoCode>> {
    if let Some(percent) = input.discount_percent {
        check_percent(percent)?;
    }
    if let Some(Some(amount)) = input.discount_amount {
        check_amount("discountAmount", amount)?;
    }
    if let Some(Some(limit)) = input.usage_limit {
        check_usage_limit(limit)?;
    }

    let input = UpdatePromoCode {
        code: input.code.as_deref().map(normalize_new_code).transpose()?,
        description: input.description.map(clean_description),
        ..input
    };

    let conn = state.db.get()?;
    let existing = queries::get_promo_code_by_id(&conn, &id)?
        .filter(|p| p.deleted_at.is_none())
        .ok_or_else(|| AppError::NotFound("Promo code not found".into()))?;

    if let Some(code) = &input.code
        && *code != existing.code
        && queries::get_promo_code_by_code(&conn, code)?.is_some()
    {
        return Err(AppError::Conflict(format!("Promo code {} already exists", code)));
    }

    queries::update_promo_code(&conn, &id, &input)?;

    tracing::info!(
        admin_id = %ctx.user.id,
        api_key_id = %ctx.api_key_id,
        promo_code_id = %id,
        "Promo code updated"
    );

    let promo = queries::get_promo_code_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Promo code not found".into()))?;
    Ok(Json(promo))
}

/// Flip `is_active`.
pub async fn toggle_promo_code(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Path(id): Path<String>,
) -> Result<Json<PromoCode>> {
    let conn = state.db.get()?;
    let existing = queries::get_promo_code_by_id(&conn, &id)?
        .filter(|p| p.deleted_at.is_none())
        .ok_or_else(|| AppError::NotFound("Promo code not found".into()))?;

    queries::set_promo_code_active(&conn, &id, !existing.is_active)?;

    tracing::info!(
        admin_id = %ctx.user.id,
        api_key_id = %ctx.api_key_id,
        promo_code_id = %id,
        active = !existing.is_active,
        "Promo code toggled"
    );

    let promo = queries::get_promo_code_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Promo code not found".into()))?;
    Ok(Json(promo))
}

pub async fn delete_promo_code(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    if !queries::delete_promo_code(&conn, &id)? {
        return Err(AppError::NotFound("Promo code not found".into()));
    }

    tracing::info!(
        admin_id = %ctx.user.id,
        api_key_id = %ctx.api_key_id,
        promo_code_id = %id,
        "Promo code deleted"
    );

    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn restore_promo_code(
    State(state): State<AppState>,
    Extension(ctx): Extension<AdminContext>,
    Path(id): Path<String>,
) -> Result<Json<PromoCode>> {
    let conn = state.db.get()?;
    if !queries::restore_promo_code(&conn, &id)? {
        return Err(AppError::NotFound("Deleted promo code not found".into()));
    }

    tracing::info!(
        admin_id = %ctx.user.id,
        api_key_id = %ctx.api_key_id,
        promo_code_id = %id,
        "Promo code restored"
    );

    let promo = queries::get_promo_code_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Promo code not found".into()))?;
    Ok(Json(promo))
}

pub async fn list_promo_code_usages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Paginated<PromoCodeUsage>>> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let conn = state.db.get()?;
    if queries::get_promo_code_by_id(&conn, &id)?.is_none() {
        return Err(AppError::NotFound("Promo code not found".into()));
    }
    let (items, total) =
        queries::list_usages_for_promo_code_paginated(&conn, &id, limit, offset)?;
    Ok(Json(Paginated::new(items, total, limit, offset)))
}
