//! Reservation record, booked period and write payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Half-open booked period `[from, to)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Period {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Period { from, to }
    }

    /// Two periods overlap when they share at least one instant. Touching ends do not overlap.
    pub fn overlaps(&self, other: &Period) -> bool {
        self.from < other.to && other.from < self.to
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant < self.to
    }
}

/// Attendee as embedded in reservation responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attendee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reservation {
    pub id: i64,
    pub reserved_from: DateTime<Utc>,
    pub reserved_to: DateTime<Utc>,
    pub room: i64,
    pub host: Option<i64>,
    pub host_employee_email: Option<String>,
    pub attendees: Vec<Attendee>,
    pub creator_ip: Option<String>,
}

impl Reservation {
    pub fn to_draft(&self) -> ReservationDraft {
        ReservationDraft {
            reserved_from: self.reserved_from,
            reserved_to: self.reserved_to,
            room: self.room,
            host: self.host,
        }
    }
}

/// Body for POST and PUT, also the validated write model.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ReservationDraft {
    pub reserved_from: DateTime<Utc>,
    pub reserved_to: DateTime<Utc>,
    pub room: i64,
    #[serde(default)]
    pub host: Option<i64>,
}

impl ReservationDraft {
    pub fn period(&self) -> Period {
        Period::new(self.reserved_from, self.reserved_to)
    }
}

/// Body for PATCH. `host: null` clears the host; an absent `host` leaves it unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReservationPatch {
    pub reserved_from: Option<DateTime<Utc>>,
    pub reserved_to: Option<DateTime<Utc>>,
    pub room: Option<i64>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub host: Option<Option<i64>>,
}

impl ReservationPatch {
    pub fn apply(self, mut draft: ReservationDraft) -> ReservationDraft {
        if let Some(v) = self.reserved_from {
            draft.reserved_from = v;
        }
        if let Some(v) = self.reserved_to {
            draft.reserved_to = v;
        }
        if let Some(v) = self.room {
            draft.room = v;
        }
        if let Some(v) = self.host {
            draft.host = v;
        }
        draft
    }
}

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body for the add-attendee action.
#[derive(Clone, Debug, Deserialize)]
pub struct AddAttendee {
    pub employee_id: i64,
}
