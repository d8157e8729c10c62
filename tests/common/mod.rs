//! Shared test harness: the full router over an in-memory `BookingStore`,
//! or over `PgStore` when `DATABASE_URL` is set.

#![allow(dead_code)]

pub mod scenarios;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use booking_api::error::{AppError, AppResult};
use booking_api::model::{
    Attendee, Employee, EmployeeDraft, Period, Position, PositionCount, Reservation,
    ReservationDraft, Room, RoomDraft,
};
use booking_api::query::{EmployeeFilter, Ordering, Page, ReservationFilter, RoomFilter};
use booking_api::service::validation::{ensure_capacity_fits, ensure_room_free, ensure_seat_available};
use booking_api::{build_router, ensure_database_exists, ensure_schema, AppState, BookingStore, PgStore, Tables};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Clone)]
struct StoredReservation {
    id: i64,
    period: Period,
    room: i64,
    host: Option<i64>,
    creator_ip: Option<String>,
}

#[derive(Default)]
struct MemoryTables {
    next_id: i64,
    employees: BTreeMap<i64, Employee>,
    rooms: BTreeMap<i64, Room>,
    reservations: BTreeMap<i64, StoredReservation>,
    /// (reservation_id, employee_id)
    attendees: BTreeSet<(i64, i64)>,
}

impl MemoryTables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn attendee_count(&self, reservation_id: i64) -> i64 {
        self.attendees.iter().filter(|(r, _)| *r == reservation_id).count() as i64
    }

    fn conflicting(&self, room: i64, period: &Period, exclude: Option<i64>) -> Option<i64> {
        self.reservations
            .values()
            .filter(|r| r.room == room && Some(r.id) != exclude)
            .find(|r| r.period.overlaps(period))
            .map(|r| r.id)
    }

    fn ensure_host(&self, host: Option<i64>) -> AppResult<()> {
        match host {
            Some(id) if !self.employees.contains_key(&id) => {
                Err(AppError::Validation(format!("host employee {} does not exist", id)))
            }
            _ => Ok(()),
        }
    }

    fn hydrate(&self, r: &StoredReservation) -> Reservation {
        let attendees = self
            .attendees
            .iter()
            .filter(|(res, _)| *res == r.id)
            .filter_map(|(_, emp)| self.employees.get(emp))
            .map(|e| Attendee {
                id: e.id,
                first_name: e.first_name.clone(),
                last_name: e.last_name.clone(),
                email: e.email.clone(),
            })
            .collect();
        Reservation {
            id: r.id,
            reserved_from: r.period.from,
            reserved_to: r.period.to,
            room: r.room,
            host: r.host,
            host_employee_email: r.host.and_then(|h| self.employees.get(&h)).map(|e| e.email.clone()),
            attendees,
            creator_ip: r.creator_ip.clone(),
        }
    }
}

/// Applies ordering (with id tie-breaker) and paging the way the SQL builder does.
fn order_and_page<T>(
    mut rows: Vec<T>,
    ordering: Option<&Ordering>,
    page: Page,
    id: impl Fn(&T) -> i64,
    cmp_field: impl Fn(&str, &T, &T) -> cmp::Ordering,
) -> Vec<T> {
    rows.sort_by(|a, b| {
        let primary = match ordering {
            Some(o) => {
                let c = cmp_field(o.field, a, b);
                if o.descending {
                    c.reverse()
                } else {
                    c
                }
            }
            None => cmp::Ordering::Equal,
        };
        let tie = if ordering.map(|o| o.field == "id" && o.descending).unwrap_or(false) {
            id(b).cmp(&id(a))
        } else {
            id(a).cmp(&id(b))
        };
        primary.then(tie)
    });
    rows.into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(AppError::Db(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> AppResult<Vec<Employee>> {
        let t = self.tables.lock().unwrap();
        let needle = filter.name.as_ref().map(|n| n.to_lowercase());
        let rows: Vec<Employee> = t
            .employees
            .values()
            .filter(|e| match &needle {
                Some(n) => e.first_name.to_lowercase().contains(n) || e.last_name.to_lowercase().contains(n),
                None => true,
            })
            .filter(|e| filter.position.map(|p| e.position == p).unwrap_or(true))
            .filter(|e| filter.max_experience.map(|m| e.experience <= m).unwrap_or(true))
            .cloned()
            .collect();
        Ok(order_and_page(rows, filter.ordering.as_ref(), filter.page, |e| e.id, |field, a, b| match field {
            "first_name" => a.first_name.cmp(&b.first_name),
            "last_name" => a.last_name.cmp(&b.last_name),
            "email" => a.email.cmp(&b.email),
            "position" => a.position.as_str().cmp(b.position.as_str()),
            "experience" => a.experience.cmp(&b.experience),
            "date_of_birth" => a.date_of_birth.cmp(&b.date_of_birth),
            _ => cmp::Ordering::Equal,
        }))
    }

    async fn find_employee(&self, id: i64) -> AppResult<Option<Employee>> {
        Ok(self.tables.lock().unwrap().employees.get(&id).cloned())
    }

    async fn insert_employee(&self, draft: &EmployeeDraft) -> AppResult<Employee> {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        let employee = Employee {
            id,
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            email: draft.email.clone(),
            position: draft.position,
            experience: draft.experience,
            date_of_birth: draft.date_of_birth,
        };
        t.employees.insert(id, employee.clone());
        Ok(employee)
    }

    async fn update_employee(&self, id: i64, draft: &EmployeeDraft) -> AppResult<Option<Employee>> {
        let mut t = self.tables.lock().unwrap();
        Ok(t.employees.get_mut(&id).map(|e| {
            e.first_name = draft.first_name.clone();
            e.last_name = draft.last_name.clone();
            e.email = draft.email.clone();
            e.position = draft.position;
            e.experience = draft.experience;
            e.date_of_birth = draft.date_of_birth;
            e.clone()
        }))
    }

    async fn delete_employee(&self, id: i64) -> AppResult<bool> {
        let mut t = self.tables.lock().unwrap();
        if t.employees.remove(&id).is_none() {
            return Ok(false);
        }
        for r in t.reservations.values_mut() {
            if r.host == Some(id) {
                r.host = None;
            }
        }
        t.attendees.retain(|(_, emp)| *emp != id);
        Ok(true)
    }

    async fn reservations_by_position(&self) -> AppResult<Vec<PositionCount>> {
        let t = self.tables.lock().unwrap();
        let mut totals: BTreeMap<&'static str, (Position, i64)> = BTreeMap::new();
        for e in t.employees.values() {
            let hosted = t.reservations.values().filter(|r| r.host == Some(e.id)).count() as i64;
            totals.entry(e.position.as_str()).or_insert((e.position, 0)).1 += hosted;
        }
        Ok(totals
            .into_values()
            .map(|(position, total)| PositionCount { position, total })
            .collect())
    }

    async fn list_rooms(&self, filter: &RoomFilter, now: DateTime<Utc>) -> AppResult<Vec<Room>> {
        let t = self.tables.lock().unwrap();
        let rows: Vec<Room> = t
            .rooms
            .values()
            .filter(|r| filter.min_capacity.map(|m| r.capacity >= m).unwrap_or(true))
            .filter(|r| match filter.is_reserved {
                Some(wanted) => {
                    let active = t.reservations.values().any(|res| res.room == r.id && res.period.contains(now));
                    active == wanted
                }
                None => true,
            })
            .cloned()
            .collect();
        Ok(order_and_page(rows, filter.ordering.as_ref(), filter.page, |r| r.id, |field, a, b| match field {
            "name" => a.name.cmp(&b.name),
            "capacity" => a.capacity.cmp(&b.capacity),
            _ => cmp::Ordering::Equal,
        }))
    }

    async fn find_room(&self, id: i64) -> AppResult<Option<Room>> {
        Ok(self.tables.lock().unwrap().rooms.get(&id).cloned())
    }

    async fn insert_room(&self, draft: &RoomDraft) -> AppResult<Room> {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        let room = Room {
            id,
            name: draft.name.clone(),
            capacity: draft.capacity,
        };
        t.rooms.insert(id, room.clone());
        Ok(room)
    }

    async fn update_room(&self, id: i64, draft: &RoomDraft) -> AppResult<Option<Room>> {
        let mut t = self.tables.lock().unwrap();
        if !t.rooms.contains_key(&id) {
            return Ok(None);
        }
        let largest = t
            .reservations
            .values()
            .filter(|r| r.room == id)
            .map(|r| t.attendee_count(r.id))
            .max()
            .unwrap_or(0);
        ensure_capacity_fits(largest, draft.capacity)?;
        Ok(t.rooms.get_mut(&id).map(|room| {
            room.name = draft.name.clone();
            room.capacity = draft.capacity;
            room.clone()
        }))
    }

    async fn delete_room(&self, id: i64) -> AppResult<bool> {
        let mut t = self.tables.lock().unwrap();
        if t.rooms.remove(&id).is_none() {
            return Ok(false);
        }
        let gone: Vec<i64> = t.reservations.values().filter(|r| r.room == id).map(|r| r.id).collect();
        for rid in &gone {
            t.reservations.remove(rid);
        }
        t.attendees.retain(|(res, _)| !gone.contains(res));
        Ok(true)
    }

    async fn list_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        let t = self.tables.lock().unwrap();
        let rows: Vec<StoredReservation> = t
            .reservations
            .values()
            .filter(|r| filter.room_id.map(|id| r.room == id).unwrap_or(true))
            .cloned()
            .collect();
        let rows = order_and_page(rows, filter.ordering.as_ref(), filter.page, |r| r.id, |field, a, b| match field {
            "reserved_from" => a.period.from.cmp(&b.period.from),
            "reserved_to" => a.period.to.cmp(&b.period.to),
            "room" => a.room.cmp(&b.room),
            "host" => a.host.cmp(&b.host),
            _ => cmp::Ordering::Equal,
        });
        Ok(rows.iter().map(|r| t.hydrate(r)).collect())
    }

    async fn find_reservation(&self, id: i64) -> AppResult<Option<Reservation>> {
        let t = self.tables.lock().unwrap();
        Ok(t.reservations.get(&id).map(|r| t.hydrate(r)))
    }

    async fn insert_reservation(
        &self,
        draft: &ReservationDraft,
        creator_ip: Option<&str>,
    ) -> AppResult<Reservation> {
        let mut t = self.tables.lock().unwrap();
        if !t.rooms.contains_key(&draft.room) {
            return Err(AppError::Validation(format!("room {} does not exist", draft.room)));
        }
        t.ensure_host(draft.host)?;
        ensure_room_free(draft.room, t.conflicting(draft.room, &draft.period(), None))?;
        let id = t.next_id();
        let stored = StoredReservation {
            id,
            period: draft.period(),
            room: draft.room,
            host: draft.host,
            creator_ip: creator_ip.map(str::to_string),
        };
        t.reservations.insert(id, stored.clone());
        Ok(t.hydrate(&stored))
    }

    async fn update_reservation(
        &self,
        id: i64,
        draft: &ReservationDraft,
    ) -> AppResult<Option<Reservation>> {
        let mut t = self.tables.lock().unwrap();
        if !t.reservations.contains_key(&id) {
            return Ok(None);
        }
        let capacity = t
            .rooms
            .get(&draft.room)
            .map(|r| r.capacity)
            .ok_or_else(|| AppError::Validation(format!("room {} does not exist", draft.room)))?;
        t.ensure_host(draft.host)?;
        ensure_room_free(draft.room, t.conflicting(draft.room, &draft.period(), Some(id)))?;
        ensure_capacity_fits(t.attendee_count(id), capacity)?;
        let Some(stored) = t.reservations.get_mut(&id) else {
            return Ok(None);
        };
        stored.period = draft.period();
        stored.room = draft.room;
        stored.host = draft.host;
        let stored = stored.clone();
        Ok(Some(t.hydrate(&stored)))
    }

    async fn delete_reservation(&self, id: i64) -> AppResult<bool> {
        let mut t = self.tables.lock().unwrap();
        let removed = t.reservations.remove(&id).is_some();
        t.attendees.retain(|(res, _)| *res != id);
        Ok(removed)
    }

    async fn add_attendee(&self, reservation_id: i64, employee_id: i64) -> AppResult<Option<Reservation>> {
        let mut t = self.tables.lock().unwrap();
        let Some(stored) = t.reservations.get(&reservation_id).cloned() else {
            return Ok(None);
        };
        let capacity = t.rooms.get(&stored.room).map(|r| r.capacity).unwrap_or(0);
        if !t.employees.contains_key(&employee_id) {
            return Err(AppError::Validation(format!("employee {} does not exist", employee_id)));
        }
        ensure_seat_available(t.attendee_count(reservation_id), capacity)?;
        t.attendees.insert((reservation_id, employee_id));
        Ok(Some(t.hydrate(&stored)))
    }
}

const BODY_LIMIT: usize = 64 * 1024;

static NEXT_SCHEMA: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
struct PgBackend {
    pool: PgPool,
    /// Quoted schema name.
    schema: String,
}

#[derive(Clone)]
pub struct TestContext {
    pub app: Router,
    memory: Option<Arc<MemoryStore>>,
    postgres: Option<PgBackend>,
}

impl TestContext {
    /// Router over a fresh `MemoryStore`.
    pub fn new() -> TestContext {
        let store = Arc::new(MemoryStore::default());
        let state = AppState {
            store: store.clone(),
        };
        TestContext {
            app: build_router(state, BODY_LIMIT),
            memory: Some(store),
            postgres: None,
        }
    }

    /// Router over `PgStore` in a schema of its own inside `DATABASE_URL`.
    /// None when `DATABASE_URL` is not set.
    pub async fn postgres() -> Option<TestContext> {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty())?;
        ensure_database_exists(&url).await.expect("Failed to create test database");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .expect("Failed to connect to DATABASE_URL");
        let name = format!(
            "booking_test_{}_{}",
            std::process::id(),
            NEXT_SCHEMA.fetch_add(1, AtomicOrdering::SeqCst)
        );
        let tables = Tables::new(&name);
        let schema = tables.schema.clone();
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))
            .execute(&pool)
            .await
            .expect("Failed to reset test schema");
        ensure_schema(&pool, &tables).await.expect("Failed to create test schema");
        let state = AppState::new(PgStore::new(pool.clone(), tables));
        Some(TestContext {
            app: build_router(state, BODY_LIMIT),
            memory: None,
            postgres: Some(PgBackend { pool, schema }),
        })
    }

    pub fn memory_store(&self) -> &MemoryStore {
        self.memory
            .as_deref()
            .expect("context is not backed by the in-memory store")
    }

    /// Drop the schema of a PostgreSQL-backed context.
    pub async fn cleanup(self) {
        if let Some(pg) = self.postgres {
            sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", pg.schema))
                .execute(&pg.pool)
                .await
                .expect("Failed to drop test schema");
            pg.pool.close().await;
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_with_headers(method, uri, body, &[]).await
    }

    pub async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    /// Send `body` verbatim, with the given content type if any.
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        body: &str,
        content_type: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        self.dispatch(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| panic!("non-JSON response body: {}", String::from_utf8_lossy(&bytes)))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Create an employee and return its id.
    pub async fn employee(&self, first_name: &str, position: &str) -> i64 {
        let (status, body) = self
            .post("/employees/", test_data::employee(first_name, position))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    /// Create a room and return its id.
    pub async fn room(&self, name: &str, capacity: i64) -> i64 {
        let (status, body) = self
            .post("/rooms/", serde_json::json!({ "name": name, "capacity": capacity }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    /// Book a room and return the raw response.
    pub async fn book(&self, room: i64, from: &str, to: &str, host: Option<i64>) -> (StatusCode, Value) {
        self.post(
            "/reservations/",
            serde_json::json!({ "room": room, "reserved_from": from, "reserved_to": to, "host": host }),
        )
        .await
    }
}

pub mod test_data {
    use serde_json::{json, Value};

    pub fn employee(first_name: &str, position: &str) -> Value {
        json!({
            "first_name": first_name,
            "last_name": "Doe",
            "email": format!("{}.doe@gmail.com", first_name.to_lowercase()),
            "position": position,
            "experience": 2,
            "date_of_birth": "1998-01-01"
        })
    }
}
