//! Persisted entities and their request payloads.

pub mod employee;
pub mod reservation;
pub mod room;

pub use employee::{age_on, Employee, EmployeeDraft, EmployeeInput, EmployeePatch, Position, PositionCount};
pub use reservation::{AddAttendee, Attendee, Period, Reservation, ReservationDraft, ReservationPatch};
pub use room::{Room, RoomDraft, RoomPatch};
