//! Employee record, position enum and write payloads.

use crate::error::AppError;
use chrono::{NaiveDate, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Days per year used for age computation.
pub const YEAR_IN_DAYS: f64 = 365.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Manager,
    SeniorDeveloper,
    Developer,
    JuniorDeveloper,
    Designer,
    Tester,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::Manager,
        Position::SeniorDeveloper,
        Position::Developer,
        Position::JuniorDeveloper,
        Position::Designer,
        Position::Tester,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Manager => "manager",
            Position::SeniorDeveloper => "senior_developer",
            Position::Developer => "developer",
            Position::JuniorDeveloper => "junior_developer",
            Position::Designer => "designer",
            Position::Tester => "tester",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "unknown position '{}' (expected one of: {})",
                    s,
                    Position::ALL.map(|p| p.as_str()).join(", ")
                ))
            })
    }
}

/// Whole years between `date_of_birth` and `today`, counting 365.25 days per year.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i64 {
    let days = (today - date_of_birth).num_days();
    (days as f64 / YEAR_IN_DAYS).floor() as i64
}

#[derive(Clone, Debug, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: Position,
    pub experience: i32,
    pub date_of_birth: NaiveDate,
}

impl Employee {
    pub fn age(&self) -> i64 {
        age_on(self.date_of_birth, Utc::now().date_naive())
    }

    /// The writable fields of this record, as a starting point for updates.
    pub fn to_draft(&self) -> EmployeeDraft {
        EmployeeDraft {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            position: self.position,
            experience: self.experience,
            date_of_birth: self.date_of_birth,
        }
    }
}

impl Serialize for Employee {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Employee", 8)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("first_name", &self.first_name)?;
        s.serialize_field("last_name", &self.last_name)?;
        s.serialize_field("email", &self.email)?;
        s.serialize_field("position", &self.position)?;
        s.serialize_field("experience", &self.experience)?;
        s.serialize_field("date_of_birth", &self.date_of_birth)?;
        s.serialize_field("age", &self.age())?;
        s.end()
    }
}

/// Complete set of writable employee fields, validated before persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct EmployeeDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: Position,
    pub experience: i32,
    pub date_of_birth: NaiveDate,
}

/// Body for POST and PUT. A missing `date_of_birth` falls back to the caller-provided date.
#[derive(Clone, Debug, Deserialize)]
pub struct EmployeeInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: Position,
    pub experience: i32,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

impl EmployeeInput {
    pub fn into_draft(self, default_date_of_birth: NaiveDate) -> EmployeeDraft {
        EmployeeDraft {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            position: self.position,
            experience: self.experience,
            date_of_birth: self.date_of_birth.unwrap_or(default_date_of_birth),
        }
    }
}

/// Body for PATCH: every field optional.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EmployeePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<Position>,
    pub experience: Option<i32>,
    pub date_of_birth: Option<NaiveDate>,
}

impl EmployeePatch {
    pub fn apply(self, mut draft: EmployeeDraft) -> EmployeeDraft {
        if let Some(v) = self.first_name {
            draft.first_name = v;
        }
        if let Some(v) = self.last_name {
            draft.last_name = v;
        }
        if let Some(v) = self.email {
            draft.email = v;
        }
        if let Some(v) = self.position {
            draft.position = v;
        }
        if let Some(v) = self.experience {
            draft.experience = v;
        }
        if let Some(v) = self.date_of_birth {
            draft.date_of_birth = v;
        }
        draft
    }
}

/// One row of the reservations-by-position aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PositionCount {
    pub position: Position,
    pub total: i64,
}
