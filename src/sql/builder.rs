//! Builds parameterized list queries from typed filters. Identifiers come from
//! constants or the validated schema name; every user value is a parameter.

use super::params::SqlParam;
use crate::model::Position;
use crate::query::{EmployeeFilter, Ordering, Page, ReservationFilter, RoomFilter};
use chrono::{DateTime, Utc};

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// Schema-qualified names of every table the service owns.
#[derive(Clone, Debug)]
pub struct Tables {
    pub schema: String,
    pub employees: String,
    pub rooms: String,
    pub reservations: String,
    pub attendees: String,
}

impl Tables {
    pub fn new(schema: &str) -> Self {
        Tables {
            schema: quoted(schema),
            employees: qualified_table(schema, "employees"),
            rooms: qualified_table(schema, "rooms"),
            reservations: qualified_table(schema, "reservations"),
            attendees: qualified_table(schema, "reservation_attendees"),
        }
    }
}

pub const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, email, position, experience, date_of_birth";
pub const ROOM_COLUMNS: &str = "id, name, capacity";

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: SqlParam) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Reservation columns joined with the host's email. Main table aliased `r`, host `h`.
pub fn reservation_select(t: &Tables) -> String {
    format!(
        "SELECT r.id, r.reserved_from, r.reserved_to, r.room_id, r.host_id, r.creator_ip, h.email AS host_employee_email \
         FROM {} r LEFT JOIN {} h ON h.id = r.host_id",
        t.reservations, t.employees
    )
}

/// Escape LIKE wildcards so the value matches literally inside `%...%`.
fn like_contains(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn where_clause(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// ORDER BY the chosen column with the primary key as tie-breaker, then LIMIT/OFFSET.
fn order_and_page(alias: &str, ordering: Option<&Ordering>, page: Page) -> String {
    let pk = format!("{}{}", alias, quoted("id"));
    let order = match ordering {
        Some(o) if o.column != "id" => format!(
            "{}{} {}, {}",
            alias,
            quoted(o.column),
            if o.descending { "DESC" } else { "ASC" },
            pk
        ),
        Some(o) if o.descending => format!("{} DESC", pk),
        _ => pk,
    };
    format!(" ORDER BY {} LIMIT {} OFFSET {}", order, page.limit, page.offset)
}

pub fn select_employees(t: &Tables, filter: &EmployeeFilter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    if let Some(name) = &filter.name {
        let n = q.push_param(SqlParam::Text(like_contains(name)));
        where_parts.push(format!("(first_name ILIKE ${n} OR last_name ILIKE ${n})"));
    }
    if let Some(position) = filter.position {
        let n = q.push_param(SqlParam::Text(position.as_str().to_string()));
        where_parts.push(format!("position = ${}", n));
    }
    if let Some(max) = filter.max_experience {
        let n = q.push_param(SqlParam::I32(max));
        where_parts.push(format!("experience <= ${}", n));
    }
    q.sql = format!(
        "SELECT {} FROM {}{}{}",
        EMPLOYEE_COLUMNS,
        t.employees,
        where_clause(&where_parts),
        order_and_page("", filter.ordering.as_ref(), filter.page)
    );
    q
}

/// Rooms list. `now` decides which reservations count as active for `is_reserved`.
pub fn select_rooms(t: &Tables, filter: &RoomFilter, now: DateTime<Utc>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    if let Some(min) = filter.min_capacity {
        let n = q.push_param(SqlParam::I32(min));
        where_parts.push(format!("rm.capacity >= ${}", n));
    }
    if let Some(reserved) = filter.is_reserved {
        let n = q.push_param(SqlParam::Timestamp(now));
        where_parts.push(format!(
            "{}EXISTS (SELECT 1 FROM {} r WHERE r.room_id = rm.id AND r.reserved_from <= ${n} AND r.reserved_to > ${n})",
            if reserved { "" } else { "NOT " },
            t.reservations
        ));
    }
    q.sql = format!(
        "SELECT rm.id, rm.name, rm.capacity FROM {} rm{}{}",
        t.rooms,
        where_clause(&where_parts),
        order_and_page("rm.", filter.ordering.as_ref(), filter.page)
    );
    q
}

pub fn select_reservations(t: &Tables, filter: &ReservationFilter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    if let Some(room_id) = filter.room_id {
        let n = q.push_param(SqlParam::I64(room_id));
        where_parts.push(format!("r.room_id = ${}", n));
    }
    q.sql = format!(
        "{}{}{}",
        reservation_select(t),
        where_clause(&where_parts),
        order_and_page("r.", filter.ordering.as_ref(), filter.page)
    );
    q
}

/// Hosted reservation counts grouped by the host's position.
pub fn select_reservations_by_position(t: &Tables) -> String {
    format!(
        "SELECT e.position, COUNT(r.id) AS total FROM {} e LEFT JOIN {} r ON r.host_id = e.id \
         GROUP BY e.position ORDER BY e.position",
        t.employees, t.reservations
    )
}

/// Position values as a SQL list for the CHECK constraint.
pub fn position_check_list() -> String {
    Position::ALL
        .iter()
        .map(|p| format!("'{}'", p.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}
