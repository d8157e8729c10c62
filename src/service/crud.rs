//! Entity operations: validate the payload, then hand the write to the store.

use super::validation::RequestValidator;
use crate::error::{AppError, AppResult};
use crate::model::{
    Employee, EmployeeInput, EmployeePatch, PositionCount, Reservation, ReservationDraft,
    ReservationPatch, Room, RoomDraft, RoomPatch,
};
use crate::query::{EmployeeFilter, ReservationFilter, RoomFilter};
use crate::store::BookingStore;
use chrono::{NaiveDate, Utc};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn not_found(kind: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} {}", kind, id))
}

pub struct EmployeeService;

impl EmployeeService {
    pub async fn list(store: &dyn BookingStore, filter: &EmployeeFilter) -> AppResult<Vec<Employee>> {
        store.list_employees(filter).await
    }

    pub async fn read(store: &dyn BookingStore, id: i64) -> AppResult<Employee> {
        store.find_employee(id).await?.ok_or_else(|| not_found("employee", id))
    }

    /// Insert a new employee. A missing date of birth defaults to today.
    pub async fn create(store: &dyn BookingStore, input: EmployeeInput) -> AppResult<Employee> {
        let today = today();
        let draft = input.into_draft(today);
        RequestValidator::employee(&draft, today)?;
        let employee = store.insert_employee(&draft).await?;
        tracing::info!(employee_id = employee.id, position = %employee.position, "employee created");
        Ok(employee)
    }

    /// Full replacement. A missing date of birth keeps the stored one.
    pub async fn update(store: &dyn BookingStore, id: i64, input: EmployeeInput) -> AppResult<Employee> {
        let current = Self::read(store, id).await?;
        let draft = input.into_draft(current.date_of_birth);
        RequestValidator::employee(&draft, today())?;
        store.update_employee(id, &draft).await?.ok_or_else(|| not_found("employee", id))
    }

    /// Partial update, validated as the merged record.
    pub async fn patch(store: &dyn BookingStore, id: i64, patch: EmployeePatch) -> AppResult<Employee> {
        let current = Self::read(store, id).await?;
        let draft = patch.apply(current.to_draft());
        RequestValidator::employee(&draft, today())?;
        store.update_employee(id, &draft).await?.ok_or_else(|| not_found("employee", id))
    }

    pub async fn delete(store: &dyn BookingStore, id: i64) -> AppResult<()> {
        if !store.delete_employee(id).await? {
            return Err(not_found("employee", id));
        }
        tracing::info!(employee_id = id, "employee deleted");
        Ok(())
    }

    pub async fn reservations_by_position(store: &dyn BookingStore) -> AppResult<Vec<PositionCount>> {
        store.reservations_by_position().await
    }
}

pub struct RoomService;

impl RoomService {
    pub async fn list(store: &dyn BookingStore, filter: &RoomFilter) -> AppResult<Vec<Room>> {
        store.list_rooms(filter, Utc::now()).await
    }

    pub async fn read(store: &dyn BookingStore, id: i64) -> AppResult<Room> {
        store.find_room(id).await?.ok_or_else(|| not_found("room", id))
    }

    pub async fn create(store: &dyn BookingStore, draft: RoomDraft) -> AppResult<Room> {
        RequestValidator::room(&draft)?;
        let room = store.insert_room(&draft).await?;
        tracing::info!(room_id = room.id, capacity = room.capacity, "room created");
        Ok(room)
    }

    pub async fn update(store: &dyn BookingStore, id: i64, draft: RoomDraft) -> AppResult<Room> {
        RequestValidator::room(&draft)?;
        store.update_room(id, &draft).await?.ok_or_else(|| not_found("room", id))
    }

    pub async fn patch(store: &dyn BookingStore, id: i64, patch: RoomPatch) -> AppResult<Room> {
        let current = Self::read(store, id).await?;
        Self::update(store, id, patch.apply(current.to_draft())).await
    }

    pub async fn delete(store: &dyn BookingStore, id: i64) -> AppResult<()> {
        if !store.delete_room(id).await? {
            return Err(not_found("room", id));
        }
        tracing::info!(room_id = id, "room deleted with its reservations");
        Ok(())
    }
}

pub struct ReservationService;

impl ReservationService {
    pub async fn list(store: &dyn BookingStore, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        store.list_reservations(filter).await
    }

    pub async fn read(store: &dyn BookingStore, id: i64) -> AppResult<Reservation> {
        store.find_reservation(id).await?.ok_or_else(|| not_found("reservation", id))
    }

    pub async fn create(
        store: &dyn BookingStore,
        draft: ReservationDraft,
        creator_ip: Option<&str>,
    ) -> AppResult<Reservation> {
        RequestValidator::reservation(&draft)?;
        let reservation = store
            .insert_reservation(&draft, creator_ip)
            .await
            .inspect_err(|e| log_rejection(draft.room, e))?;
        tracing::info!(
            reservation_id = reservation.id,
            room_id = reservation.room,
            from = %reservation.reserved_from,
            to = %reservation.reserved_to,
            "reservation created"
        );
        Ok(reservation)
    }

    pub async fn update(store: &dyn BookingStore, id: i64, draft: ReservationDraft) -> AppResult<Reservation> {
        RequestValidator::reservation(&draft)?;
        store
            .update_reservation(id, &draft)
            .await
            .inspect_err(|e| log_rejection(draft.room, e))?
            .ok_or_else(|| not_found("reservation", id))
    }

    pub async fn patch(store: &dyn BookingStore, id: i64, patch: ReservationPatch) -> AppResult<Reservation> {
        let current = Self::read(store, id).await?;
        Self::update(store, id, patch.apply(current.to_draft())).await
    }

    pub async fn delete(store: &dyn BookingStore, id: i64) -> AppResult<()> {
        if !store.delete_reservation(id).await? {
            return Err(not_found("reservation", id));
        }
        tracing::info!(reservation_id = id, "reservation deleted");
        Ok(())
    }

    pub async fn add_attendee(store: &dyn BookingStore, id: i64, employee_id: i64) -> AppResult<Reservation> {
        let reservation = store
            .add_attendee(id, employee_id)
            .await
            .inspect_err(|e| {
                if let AppError::Conflict(reason) = e {
                    tracing::warn!(reservation_id = id, employee_id, %reason, "attendee rejected");
                }
            })?
            .ok_or_else(|| not_found("reservation", id))?;
        tracing::info!(
            reservation_id = id,
            employee_id,
            attendees = reservation.attendees.len(),
            "attendee added"
        );
        Ok(reservation)
    }
}

fn log_rejection(room_id: i64, e: &AppError) {
    if let AppError::Conflict(reason) = e {
        tracing::warn!(room_id, %reason, "booking rejected");
    }
}
