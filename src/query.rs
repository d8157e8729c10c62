//! URL query parameters mapped to typed list filters.
//! Unknown parameters are ignored; known parameters with unparsable values are rejected.

use crate::error::AppError;
use crate::model::Position;
use std::collections::HashMap;
use std::str::FromStr;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let limit = parse_opt::<u32>(params, "limit")?.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = parse_opt::<u32>(params, "offset")?.unwrap_or(0);
        Ok(Page { limit, offset })
    }
}

/// Sort key chosen through `?ordering=field` or `?ordering=-field`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ordering {
    /// API field name.
    pub field: &'static str,
    /// Backing column name.
    pub column: &'static str,
    pub descending: bool,
}

impl Ordering {
    /// Parse against an allow-list of `(field, column)` pairs.
    fn from_params(
        params: &HashMap<String, String>,
        allowed: &[(&'static str, &'static str)],
    ) -> Result<Option<Self>, AppError> {
        let Some(raw) = params.get("ordering").map(|s| s.trim()).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let (name, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        allowed
            .iter()
            .find(|(field, _)| *field == name)
            .map(|&(field, column)| {
                Some(Ordering {
                    field,
                    column,
                    descending,
                })
            })
            .ok_or_else(|| AppError::BadRequest(format!("cannot order by '{}'", name)))
    }
}

const EMPLOYEE_ORDERING: &[(&str, &str)] = &[
    ("id", "id"),
    ("first_name", "first_name"),
    ("last_name", "last_name"),
    ("email", "email"),
    ("position", "position"),
    ("experience", "experience"),
    ("date_of_birth", "date_of_birth"),
];

const ROOM_ORDERING: &[(&str, &str)] = &[("id", "id"), ("name", "name"), ("capacity", "capacity")];

const RESERVATION_ORDERING: &[(&str, &str)] = &[
    ("id", "id"),
    ("reserved_from", "reserved_from"),
    ("reserved_to", "reserved_to"),
    ("room", "room_id"),
    ("host", "host_id"),
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmployeeFilter {
    /// Case-insensitive substring of first or last name.
    pub name: Option<String>,
    pub position: Option<Position>,
    pub max_experience: Option<i32>,
    pub ordering: Option<Ordering>,
    pub page: Page,
}

impl EmployeeFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let position = match non_empty(params, "position") {
            Some(s) => Some(
                s.parse::<Position>()
                    .map_err(|_| AppError::BadRequest(format!("invalid position: {}", s)))?,
            ),
            None => None,
        };
        Ok(EmployeeFilter {
            name: non_empty(params, "name").map(str::to_string),
            position,
            max_experience: parse_opt(params, "max_experience")?,
            ordering: Ordering::from_params(params, EMPLOYEE_ORDERING)?,
            page: Page::from_params(params)?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoomFilter {
    pub min_capacity: Option<i32>,
    /// None: no filtering. Some(true): only rooms with a reservation active now.
    pub is_reserved: Option<bool>,
    pub ordering: Option<Ordering>,
    pub page: Page,
}

impl RoomFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let is_reserved = match non_empty(params, "is_reserved") {
            Some(s) => Some(parse_bool("is_reserved", s)?),
            None => None,
        };
        Ok(RoomFilter {
            min_capacity: parse_opt(params, "min_capacity")?,
            is_reserved,
            ordering: Ordering::from_params(params, ROOM_ORDERING)?,
            page: Page::from_params(params)?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReservationFilter {
    pub room_id: Option<i64>,
    pub ordering: Option<Ordering>,
    pub page: Page,
}

impl ReservationFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        Ok(ReservationFilter {
            room_id: parse_opt(params, "room_id")?,
            ordering: Ordering::from_params(params, RESERVATION_ORDERING)?,
            page: Page::from_params(params)?,
        })
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_opt<T: FromStr>(params: &HashMap<String, String>, key: &str) -> Result<Option<T>, AppError> {
    match non_empty(params, key) {
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("invalid {}: {}", key, s))),
        None => Ok(None),
    }
}

fn parse_bool(key: &str, s: &str) -> Result<bool, AppError> {
    if s.eq_ignore_ascii_case("true") || s == "1" {
        return Ok(true);
    }
    if s.eq_ignore_ascii_case("false") || s == "0" {
        return Ok(false);
    }
    Err(AppError::BadRequest(format!("invalid {}: {}", key, s)))
}
