//! Payload validation rules for employees, rooms and reservations.

use crate::error::AppError;
use crate::model::{age_on, EmployeeDraft, ReservationDraft, RoomDraft};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Fragment every employee email must contain.
pub const REQUIRED_EMAIL_DOMAIN: &str = "@gmail";

const NAME_MAX_LENGTH: usize = 128;
const EMAIL_MAX_LENGTH: usize = 128;
const ROOM_NAME_MAX_LENGTH: usize = 64;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
    })
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a complete employee record as it would be stored on `today`.
    pub fn employee(draft: &EmployeeDraft, today: NaiveDate) -> Result<(), AppError> {
        validate_text("first_name", &draft.first_name, NAME_MAX_LENGTH)?;
        validate_text("last_name", &draft.last_name, NAME_MAX_LENGTH)?;
        validate_email(&draft.email)?;
        if draft.experience < 0 {
            return Err(AppError::Validation("experience must be at least 0".into()));
        }
        if draft.date_of_birth > today {
            return Err(AppError::Validation("date_of_birth must not be in the future".into()));
        }
        let age = age_on(draft.date_of_birth, today);
        if age < i64::from(draft.experience) {
            return Err(AppError::Validation(format!(
                "experience ({} years) must not exceed age ({} years)",
                draft.experience, age
            )));
        }
        Ok(())
    }

    pub fn room(draft: &RoomDraft) -> Result<(), AppError> {
        validate_text("name", &draft.name, ROOM_NAME_MAX_LENGTH)?;
        if draft.capacity < 1 {
            return Err(AppError::Validation("capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn reservation(draft: &ReservationDraft) -> Result<(), AppError> {
        if draft.reserved_to <= draft.reserved_from {
            return Err(AppError::Validation(
                "reserved_to must be later than reserved_from".into(),
            ));
        }
        Ok(())
    }
}

fn validate_text(col: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", col)));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            col, max
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if email.chars().count() > EMAIL_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "email must be at most {} characters",
            EMAIL_MAX_LENGTH
        )));
    }
    if !email_pattern().is_match(email) {
        return Err(AppError::Validation("email must be a valid email".into()));
    }
    if !email.contains(REQUIRED_EMAIL_DOMAIN) {
        return Err(AppError::Validation(
            "employee email must belong to the 'gmail' domain".into(),
        ));
    }
    Ok(())
}

/// Reject a booking when another reservation in the room already covers part of the period.
pub fn ensure_room_free(room_id: i64, conflicting: Option<i64>) -> Result<(), AppError> {
    match conflicting {
        Some(other) => Err(AppError::Conflict(format!(
            "room {} is already booked for the requested period (reservation {})",
            room_id, other
        ))),
        None => Ok(()),
    }
}

/// Reject adding an attendee once the room is full.
pub fn ensure_seat_available(attendees: i64, capacity: i32) -> Result<(), AppError> {
    if attendees >= i64::from(capacity) {
        return Err(AppError::Conflict(format!(
            "room capacity of {} has been reached, attendee can not be added",
            capacity
        )));
    }
    Ok(())
}

/// Reject a room assignment or capacity change that leaves existing attendees without a seat.
pub fn ensure_capacity_fits(attendees: i64, capacity: i32) -> Result<(), AppError> {
    if attendees > i64::from(capacity) {
        return Err(AppError::Conflict(format!(
            "{} attendees do not fit in a room with capacity {}",
            attendees, capacity
        )));
    }
    Ok(())
}
