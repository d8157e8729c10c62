//! Resource routes for employees, rooms and reservations. Paths keep their trailing slash.

use crate::handlers::{employee, reservation, room};
use crate::state::AppState;
use axum::{routing::get, routing::put, Router};

pub fn booking_routes(state: AppState) -> Router {
    Router::new()
        .route("/employees/", get(employee::list).post(employee::create))
        .route(
            "/employees/reservations_by_position/",
            get(employee::reservations_by_position),
        )
        .route(
            "/employees/:id/",
            get(employee::read)
                .put(employee::update)
                .patch(employee::partial_update)
                .delete(employee::delete),
        )
        .route("/rooms/", get(room::list).post(room::create))
        .route(
            "/rooms/:id/",
            get(room::read)
                .put(room::update)
                .patch(room::partial_update)
                .delete(room::delete),
        )
        .route("/reservations/", get(reservation::list).post(reservation::create))
        .route(
            "/reservations/:id/",
            get(reservation::read)
                .put(reservation::update)
                .patch(reservation::partial_update)
                .delete(reservation::delete),
        )
        .route("/reservations/:id/add_attendee/", put(reservation::add_attendee))
        .with_state(state)
}
