//! Reservation handlers: CRUD plus the add-attendee action.

use super::{parse_body, parse_id};
use crate::error::AppError;
use crate::extractors::json_body::JsonBody;
use crate::extractors::client_ip::ClientIp;
use crate::model::{AddAttendee, ReservationDraft, ReservationPatch};
use crate::query::ReservationFilter;
use crate::response::{created, ok, page};
use crate::service::ReservationService;
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
    let filter = ReservationFilter::from_params(&params)?;
    let rows = ReservationService::list(state.store.as_ref(), &filter).await?;
    Ok(page(rows, filter.page))
}

/// POST /reservations/. Stamps the caller's address as `creator_ip`.
pub async fn create(
    ClientIp(creator_ip): ClientIp,
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let draft: ReservationDraft = parse_body(body)?;
    let reservation = ReservationService::create(state.store.as_ref(), draft, creator_ip.as_deref()).await?;
    Ok(created(reservation))
}

pub async fn read(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    Ok(ok(ReservationService::read(state.store.as_ref(), id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let draft: ReservationDraft = parse_body(body)?;
    Ok(ok(ReservationService::update(state.store.as_ref(), id, draft).await?))
}

pub async fn partial_update(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let patch: ReservationPatch = parse_body(body)?;
    Ok(ok(ReservationService::patch(state.store.as_ref(), id, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    ReservationService::delete(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /reservations/:id/add_attendee/ with `{"employee_id": n}`.
pub async fn add_attendee(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let AddAttendee { employee_id } = parse_body(body)?;
    let reservation = ReservationService::add_attendee(state.store.as_ref(), id, employee_id).await?;
    Ok(ok(reservation))
}
