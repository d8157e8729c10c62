//! Room handlers.

use super::{parse_body, parse_id};
use crate::error::AppError;
use crate::extractors::json_body::JsonBody;
use crate::model::{RoomDraft, RoomPatch};
use crate::query::RoomFilter;
use crate::response::{created, ok, page};
use crate::service::RoomService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::collections::HashMap;

/// GET /rooms/?min_capacity=&is_reserved=
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = RoomFilter::from_params(&params)?;
    let rows = RoomService::list(state.store.as_ref(), &filter).await?;
    Ok(page(rows, filter.page))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let draft: RoomDraft = parse_body(body)?;
    Ok(created(RoomService::create(state.store.as_ref(), draft).await?))
}

pub async fn read(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    Ok(ok(RoomService::read(state.store.as_ref(), id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let draft: RoomDraft = parse_body(body)?;
    Ok(ok(RoomService::update(state.store.as_ref(), id, draft).await?))
}

pub async fn partial_update(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let patch: RoomPatch = parse_body(body)?;
    Ok(ok(RoomService::patch(state.store.as_ref(), id, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    RoomService::delete(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
