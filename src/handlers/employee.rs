//! Employee handlers: CRUD plus the reservations-by-position aggregate.

use super::{parse_body, parse_id};
use crate::error::AppError;
use crate::extractors::json_body::JsonBody;
use crate::model::{EmployeeInput, EmployeePatch};
use crate::query::EmployeeFilter;
use crate::response::{created, many, ok, page};
use crate::service::EmployeeService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::collections::HashMap;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = EmployeeFilter::from_params(&params)?;
    let rows = EmployeeService::list(state.store.as_ref(), &filter).await?;
    Ok(page(rows, filter.page))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let input: EmployeeInput = parse_body(body)?;
    let employee = EmployeeService::create(state.store.as_ref(), input).await?;
    Ok(created(employee))
}

pub async fn read(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    Ok(ok(EmployeeService::read(state.store.as_ref(), id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let input: EmployeeInput = parse_body(body)?;
    Ok(ok(EmployeeService::update(state.store.as_ref(), id, input).await?))
}

pub async fn partial_update(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let patch: EmployeePatch = parse_body(body)?;
    Ok(ok(EmployeeService::patch(state.store.as_ref(), id, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    EmployeeService::delete(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /employees/reservations_by_position/
pub async fn reservations_by_position(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = EmployeeService::reservations_by_position(state.store.as_ref()).await?;
    Ok(many(rows))
}
