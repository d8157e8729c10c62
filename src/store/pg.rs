//! PostgreSQL implementation of `BookingStore`.

use super::BookingStore;
use crate::error::{AppError, AppResult};
use crate::model::{
    Attendee, Employee, EmployeeDraft, Period, PositionCount, Reservation, ReservationDraft, Room,
    RoomDraft,
};
use crate::query::{EmployeeFilter, ReservationFilter, RoomFilter};
use crate::service::validation::{ensure_capacity_fits, ensure_room_free, ensure_seat_available};
use crate::sql::{
    reservation_select, select_employees, select_reservations, select_reservations_by_position,
    select_rooms, QueryBuf, Tables, EMPLOYEE_COLUMNS, ROOM_COLUMNS,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    tables: Tables,
}

impl PgStore {
    pub fn new(pool: PgPool, tables: Tables) -> Self {
        PgStore { pool, tables }
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    position: String,
    experience: i32,
    date_of_birth: NaiveDate,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = AppError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let position = row
            .position
            .parse()
            .map_err(|_| AppError::Db(sqlx::Error::Decode(format!("unknown position '{}'", row.position).into())))?;
        Ok(Employee {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            position,
            experience: row.experience,
            date_of_birth: row.date_of_birth,
        })
    }
}

#[derive(FromRow)]
struct RoomRow {
    id: i64,
    name: String,
    capacity: i32,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            name: row.name,
            capacity: row.capacity,
        }
    }
}

#[derive(FromRow)]
struct ReservationRow {
    id: i64,
    reserved_from: DateTime<Utc>,
    reserved_to: DateTime<Utc>,
    room_id: i64,
    host_id: Option<i64>,
    creator_ip: Option<String>,
    host_employee_email: Option<String>,
}

#[derive(FromRow)]
struct AttendeeRow {
    reservation_id: i64,
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
}

async fn fetch_all<T>(conn: &mut PgConnection, q: &QueryBuf) -> AppResult<Vec<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<sqlx::Postgres, T>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    Ok(query.fetch_all(&mut *conn).await?)
}

/// Lock the room row for the rest of the transaction and return its capacity.
/// Writers touching one room queue here; statements after the lock see every
/// row committed by the writer that held it before.
async fn lock_room(conn: &mut PgConnection, t: &Tables, room_id: i64) -> AppResult<Option<i32>> {
    let row: Option<(i32,)> = sqlx::query_as(&format!("SELECT capacity FROM {} WHERE id = $1 FOR UPDATE", t.rooms))
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(capacity,)| capacity))
}

async fn employee_exists(conn: &mut PgConnection, t: &Tables, id: i64) -> AppResult<bool> {
    let row: (bool,) = sqlx::query_as(&format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", t.employees))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.0)
}

async fn ensure_host_exists(conn: &mut PgConnection, t: &Tables, host: Option<i64>) -> AppResult<()> {
    if let Some(host_id) = host {
        if !employee_exists(conn, t, host_id).await? {
            return Err(AppError::Validation(format!("host employee {} does not exist", host_id)));
        }
    }
    Ok(())
}

/// First reservation in the room whose period overlaps `period`, ignoring `exclude`.
async fn conflicting_reservation(
    conn: &mut PgConnection,
    t: &Tables,
    room_id: i64,
    period: Period,
    exclude: Option<i64>,
) -> AppResult<Option<i64>> {
    let sql = format!(
        "SELECT id FROM {} WHERE room_id = $1 AND reserved_from < $3 AND $2 < reserved_to \
         AND ($4::BIGINT IS NULL OR id <> $4) ORDER BY reserved_from LIMIT 1",
        t.reservations
    );
    tracing::debug!(sql = %sql, room_id, "overlap check");
    let row: Option<(i64,)> = sqlx::query_as(&sql)
        .bind(room_id)
        .bind(period.from)
        .bind(period.to)
        .bind(exclude)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(id,)| id))
}

async fn attendee_count(conn: &mut PgConnection, t: &Tables, reservation_id: i64) -> AppResult<i64> {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {} WHERE reservation_id = $1", t.attendees))
        .bind(reservation_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.0)
}

async fn load_attendees(
    conn: &mut PgConnection,
    t: &Tables,
    reservation_ids: &[i64],
) -> AppResult<HashMap<i64, Vec<Attendee>>> {
    if reservation_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT a.reservation_id, e.id, e.first_name, e.last_name, e.email FROM {} a \
         JOIN {} e ON e.id = a.employee_id WHERE a.reservation_id = ANY($1) ORDER BY e.id",
        t.attendees, t.employees
    );
    let rows: Vec<AttendeeRow> = sqlx::query_as(&sql)
        .bind(reservation_ids)
        .fetch_all(&mut *conn)
        .await?;
    let mut by_reservation: HashMap<i64, Vec<Attendee>> = HashMap::new();
    for row in rows {
        by_reservation.entry(row.reservation_id).or_default().push(Attendee {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
        });
    }
    Ok(by_reservation)
}

/// Attach attendee lists to reservation rows, keeping row order.
async fn hydrate(conn: &mut PgConnection, t: &Tables, rows: Vec<ReservationRow>) -> AppResult<Vec<Reservation>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut attendees = load_attendees(conn, t, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| Reservation {
            attendees: attendees.remove(&row.id).unwrap_or_default(),
            id: row.id,
            reserved_from: row.reserved_from,
            reserved_to: row.reserved_to,
            room: row.room_id,
            host: row.host_id,
            host_employee_email: row.host_employee_email,
            creator_ip: row.creator_ip,
        })
        .collect())
}

async fn reservation_by_id(conn: &mut PgConnection, t: &Tables, id: i64) -> AppResult<Option<Reservation>> {
    let sql = format!("{} WHERE r.id = $1", reservation_select(t));
    let row: Option<ReservationRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => Ok(hydrate(conn, t, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> AppResult<Vec<Employee>> {
        let q = select_employees(&self.tables, filter);
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<EmployeeRow> = fetch_all(&mut conn, &q).await?;
        rows.into_iter().map(Employee::try_from).collect()
    }

    async fn find_employee(&self, id: i64) -> AppResult<Option<Employee>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", EMPLOYEE_COLUMNS, self.tables.employees);
        let row: Option<EmployeeRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(Employee::try_from).transpose()
    }

    async fn insert_employee(&self, draft: &EmployeeDraft) -> AppResult<Employee> {
        let sql = format!(
            "INSERT INTO {} (first_name, last_name, email, position, experience, date_of_birth) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            self.tables.employees, EMPLOYEE_COLUMNS
        );
        let row: EmployeeRow = sqlx::query_as(&sql)
            .bind(&draft.first_name)
            .bind(&draft.last_name)
            .bind(&draft.email)
            .bind(draft.position.as_str())
            .bind(draft.experience)
            .bind(draft.date_of_birth)
            .fetch_one(&self.pool)
            .await?;
        Employee::try_from(row)
    }

    async fn update_employee(&self, id: i64, draft: &EmployeeDraft) -> AppResult<Option<Employee>> {
        let sql = format!(
            "UPDATE {} SET first_name = $1, last_name = $2, email = $3, position = $4, experience = $5, \
             date_of_birth = $6 WHERE id = $7 RETURNING {}",
            self.tables.employees, EMPLOYEE_COLUMNS
        );
        let row: Option<EmployeeRow> = sqlx::query_as(&sql)
            .bind(&draft.first_name)
            .bind(&draft.last_name)
            .bind(&draft.email)
            .bind(draft.position.as_str())
            .bind(draft.experience)
            .bind(draft.date_of_birth)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Employee::try_from).transpose()
    }

    async fn delete_employee(&self, id: i64) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.tables.employees);
        let res = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn reservations_by_position(&self) -> AppResult<Vec<PositionCount>> {
        let sql = select_reservations_by_position(&self.tables);
        tracing::debug!(sql = %sql, "query");
        let rows: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|(position, total)| {
                let position = position
                    .parse()
                    .map_err(|_| AppError::Db(sqlx::Error::Decode(format!("unknown position '{}'", position).into())))?;
                Ok::<_, AppError>(PositionCount { position, total })
            })
            .collect()
    }

    async fn list_rooms(&self, filter: &RoomFilter, now: DateTime<Utc>) -> AppResult<Vec<Room>> {
        let q = select_rooms(&self.tables, filter, now);
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<RoomRow> = fetch_all(&mut conn, &q).await?;
        Ok(rows.into_iter().map(Room::from).collect())
    }

    async fn find_room(&self, id: i64) -> AppResult<Option<Room>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", ROOM_COLUMNS, self.tables.rooms);
        let row: Option<RoomRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Room::from))
    }

    async fn insert_room(&self, draft: &RoomDraft) -> AppResult<Room> {
        let sql = format!(
            "INSERT INTO {} (name, capacity) VALUES ($1, $2) RETURNING {}",
            self.tables.rooms, ROOM_COLUMNS
        );
        let row: RoomRow = sqlx::query_as(&sql)
            .bind(&draft.name)
            .bind(draft.capacity)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_room(&self, id: i64, draft: &RoomDraft) -> AppResult<Option<Room>> {
        let t = &self.tables;
        let mut tx = self.pool.begin().await?;
        if lock_room(&mut tx, t, id).await?.is_none() {
            return Ok(None);
        }
        let largest: (i64,) = sqlx::query_as(&format!(
            "SELECT COALESCE(MAX(n), 0) FROM (SELECT COUNT(*) AS n FROM {} a JOIN {} r ON r.id = a.reservation_id \
             WHERE r.room_id = $1 GROUP BY a.reservation_id) counts",
            t.attendees, t.reservations
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        ensure_capacity_fits(largest.0, draft.capacity)?;
        let sql = format!(
            "UPDATE {} SET name = $1, capacity = $2 WHERE id = $3 RETURNING {}",
            t.rooms, ROOM_COLUMNS
        );
        let row: Option<RoomRow> = sqlx::query_as(&sql)
            .bind(&draft.name)
            .bind(draft.capacity)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.map(Room::from))
    }

    async fn delete_room(&self, id: i64) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.tables.rooms);
        let res = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        let q = select_reservations(&self.tables, filter);
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<ReservationRow> = fetch_all(&mut conn, &q).await?;
        hydrate(&mut conn, &self.tables, rows).await
    }

    async fn find_reservation(&self, id: i64) -> AppResult<Option<Reservation>> {
        let mut conn = self.pool.acquire().await?;
        reservation_by_id(&mut conn, &self.tables, id).await
    }

    async fn insert_reservation(
        &self,
        draft: &ReservationDraft,
        creator_ip: Option<&str>,
    ) -> AppResult<Reservation> {
        let t = &self.tables;
        let mut tx = self.pool.begin().await?;
        if lock_room(&mut tx, t, draft.room).await?.is_none() {
            return Err(AppError::Validation(format!("room {} does not exist", draft.room)));
        }
        ensure_host_exists(&mut tx, t, draft.host).await?;
        let conflicting = conflicting_reservation(&mut tx, t, draft.room, draft.period(), None).await?;
        ensure_room_free(draft.room, conflicting)?;

        let sql = format!(
            "INSERT INTO {} (reserved_from, reserved_to, room_id, host_id, creator_ip) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
            t.reservations
        );
        let (id,): (i64,) = sqlx::query_as(&sql)
            .bind(draft.reserved_from)
            .bind(draft.reserved_to)
            .bind(draft.room)
            .bind(draft.host)
            .bind(creator_ip)
            .fetch_one(&mut *tx)
            .await?;
        let reservation = reservation_by_id(&mut tx, t, id)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tx.commit().await?;
        Ok(reservation)
    }

    async fn update_reservation(
        &self,
        id: i64,
        draft: &ReservationDraft,
    ) -> AppResult<Option<Reservation>> {
        let t = &self.tables;
        let mut tx = self.pool.begin().await?;
        let existing: Option<(i64,)> = sqlx::query_as(&format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", t.reservations))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_none() {
            return Ok(None);
        }
        let capacity = lock_room(&mut tx, t, draft.room)
            .await?
            .ok_or_else(|| AppError::Validation(format!("room {} does not exist", draft.room)))?;
        ensure_host_exists(&mut tx, t, draft.host).await?;
        let conflicting = conflicting_reservation(&mut tx, t, draft.room, draft.period(), Some(id)).await?;
        ensure_room_free(draft.room, conflicting)?;
        ensure_capacity_fits(attendee_count(&mut tx, t, id).await?, capacity)?;

        let sql = format!(
            "UPDATE {} SET reserved_from = $1, reserved_to = $2, room_id = $3, host_id = $4 WHERE id = $5",
            t.reservations
        );
        sqlx::query(&sql)
            .bind(draft.reserved_from)
            .bind(draft.reserved_to)
            .bind(draft.room)
            .bind(draft.host)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let reservation = reservation_by_id(&mut tx, t, id).await?;
        tx.commit().await?;
        Ok(reservation)
    }

    async fn delete_reservation(&self, id: i64) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.tables.reservations);
        let res = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn add_attendee(&self, reservation_id: i64, employee_id: i64) -> AppResult<Option<Reservation>> {
        let t = &self.tables;
        let mut tx = self.pool.begin().await?;
        let room: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT room_id FROM {} WHERE id = $1 FOR UPDATE",
            t.reservations
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((room_id,)) = room else {
            return Ok(None);
        };
        let capacity = lock_room(&mut tx, t, room_id)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        if !employee_exists(&mut tx, t, employee_id).await? {
            return Err(AppError::Validation(format!("employee {} does not exist", employee_id)));
        }
        ensure_seat_available(attendee_count(&mut tx, t, reservation_id).await?, capacity)?;

        let sql = format!(
            "INSERT INTO {} (reservation_id, employee_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            t.attendees
        );
        sqlx::query(&sql)
            .bind(reservation_id)
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;
        let reservation = reservation_by_id(&mut tx, t, reservation_id).await?;
        tx.commit().await?;
        Ok(reservation)
    }
}
