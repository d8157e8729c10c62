//! Booking API: employees, meeting rooms and room reservations over PostgreSQL.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod model;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ConfigError};
pub use routes::{booking_routes, build_router, common_routes};
pub use sql::Tables;
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_schema, BookingStore, PgStore};
