//! Persistence boundary. Handlers and services only see `BookingStore`;
//! `PgStore` is the PostgreSQL implementation.
//!
//! Writes that depend on other rows (overlap, capacity, referenced ids) are
//! checked by the store inside the same transaction as the write, after
//! locking the rows the check reads.

mod pg;
pub mod schema;

pub use pg::PgStore;
pub use schema::{ensure_database_exists, ensure_schema};

use crate::error::AppResult;
use crate::model::{
    Employee, EmployeeDraft, PositionCount, Reservation, ReservationDraft, Room, RoomDraft,
};
use crate::query::{EmployeeFilter, ReservationFilter, RoomFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> AppResult<()>;

    async fn list_employees(&self, filter: &EmployeeFilter) -> AppResult<Vec<Employee>>;
    async fn find_employee(&self, id: i64) -> AppResult<Option<Employee>>;
    async fn insert_employee(&self, draft: &EmployeeDraft) -> AppResult<Employee>;
    async fn update_employee(&self, id: i64, draft: &EmployeeDraft) -> AppResult<Option<Employee>>;
    /// Hosted reservations are kept with their host cleared; attendee entries are removed.
    async fn delete_employee(&self, id: i64) -> AppResult<bool>;
    async fn reservations_by_position(&self) -> AppResult<Vec<PositionCount>>;

    async fn list_rooms(&self, filter: &RoomFilter, now: DateTime<Utc>) -> AppResult<Vec<Room>>;
    async fn find_room(&self, id: i64) -> AppResult<Option<Room>>;
    async fn insert_room(&self, draft: &RoomDraft) -> AppResult<Room>;
    /// Fails with a conflict when the new capacity is below the attendee count of a reservation in the room.
    async fn update_room(&self, id: i64, draft: &RoomDraft) -> AppResult<Option<Room>>;
    /// Deletes the room's reservations as well.
    async fn delete_room(&self, id: i64) -> AppResult<bool>;

    async fn list_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>>;
    async fn find_reservation(&self, id: i64) -> AppResult<Option<Reservation>>;
    /// Fails with a validation error for an unknown room or host and a conflict on overlap.
    async fn insert_reservation(
        &self,
        draft: &ReservationDraft,
        creator_ip: Option<&str>,
    ) -> AppResult<Reservation>;
    /// Same checks as insert, ignoring the reservation itself, plus attendee fit in the target room.
    async fn update_reservation(
        &self,
        id: i64,
        draft: &ReservationDraft,
    ) -> AppResult<Option<Reservation>>;
    async fn delete_reservation(&self, id: i64) -> AppResult<bool>;
    /// Returns None when the reservation does not exist. Fails with a conflict when the room is full.
    async fn add_attendee(&self, reservation_id: i64, employee_id: i64) -> AppResult<Option<Reservation>>;
}
