//! Database bootstrap: create the database, schema and tables when missing.
//! Every statement is idempotent so startup can run it unconditionally.

use crate::error::{AppError, ConfigError};
use crate::sql::{position_check_list, Tables};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// DDL in dependency order: rooms and employees before reservations, reservations before attendees.
pub fn schema_statements(t: &Tables) -> Vec<String> {
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", t.schema),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                first_name VARCHAR(128) NOT NULL,
                last_name VARCHAR(128) NOT NULL,
                email VARCHAR(128) NOT NULL,
                position VARCHAR(64) NOT NULL CHECK (position IN ({})),
                experience INTEGER NOT NULL CHECK (experience >= 0),
                date_of_birth DATE NOT NULL DEFAULT CURRENT_DATE
            )
            "#,
            t.employees,
            position_check_list()
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(64) NOT NULL,
                capacity INTEGER NOT NULL CHECK (capacity >= 1)
            )
            "#,
            t.rooms
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                reserved_from TIMESTAMPTZ NOT NULL,
                reserved_to TIMESTAMPTZ NOT NULL,
                room_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                host_id BIGINT REFERENCES {}(id) ON DELETE SET NULL,
                creator_ip TEXT,
                CHECK (reserved_from < reserved_to)
            )
            "#,
            t.reservations, t.rooms, t.employees
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS reservations_room_period_idx ON {} (room_id, reserved_from, reserved_to)",
            t.reservations
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                reservation_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                employee_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                PRIMARY KEY (reservation_id, employee_id)
            )
            "#,
            t.attendees, t.reservations, t.employees
        ),
    ]
}

/// Create the schema and all tables if they do not exist.
pub async fn ensure_schema(pool: &PgPool, tables: &Tables) -> Result<(), AppError> {
    for ddl in schema_statements(tables) {
        tracing::debug!(sql = %ddl.trim(), "ddl");
        sqlx::query(&ddl).execute(pool).await?;
    }
    tracing::info!(schema = %tables.schema, "schema ready");
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| invalid_url(e.to_string()))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(AppError::Db)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(AppError::Db)?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(AppError::Db)?;
    }
    Ok(())
}

/// Split a connection URL into (URL of the `postgres` maintenance database, target database name).
/// The query string is set aside first since options like `host=/tmp` contain slashes.
fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let (location, query) = match url.split_once('?') {
        Some((location, query)) => (location, format!("?{}", query)),
        None => (url, String::new()),
    };
    let scheme_end = location.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = location[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i + 1)
        .ok_or_else(|| invalid_url("missing database name"))?;
    let db_name = location[path_start..].trim();
    let admin_url = format!("{}postgres{}", &location[..path_start], query);
    Ok((admin_url, db_name.to_string()))
}

fn invalid_url(reason: impl Into<String>) -> AppError {
    AppError::Config(ConfigError::Invalid {
        key: "DATABASE_URL",
        reason: reason.into(),
    })
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
