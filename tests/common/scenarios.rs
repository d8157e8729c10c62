//! Flows that hold for every `BookingStore`; run against the in-memory store and PostgreSQL.

use super::TestContext;
use axum::http::{Method, StatusCode};
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::json;
use tokio::task::JoinSet;

fn from_now(offset: Duration) -> String {
    (Utc::now() + offset).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn id_of(body: &serde_json::Value) -> i64 {
    body["data"]["id"].as_i64().unwrap()
}

pub async fn overlap_rejected_adjacent_accepted(ctx: &TestContext) {
    let room = ctx.room("Orion", 6).await;
    let other = ctx.room("Lyra", 6).await;

    let (status, _) = ctx.book(room, "2030-05-06T10:00:00Z", "2030-05-06T11:00:00Z", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = ctx.book(room, "2030-05-06T10:30:00Z", "2030-05-06T11:30:00Z", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
    let (status, _) = ctx.book(room, "2030-05-06T09:00:00Z", "2030-05-06T12:00:00Z", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = ctx.book(room, "2030-05-06T11:00:00Z", "2030-05-06T12:00:00Z", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = ctx.book(other, "2030-05-06T10:30:00Z", "2030-05-06T11:30:00Z", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = ctx.book(9999, "2030-05-06T10:00:00Z", "2030-05-06T11:00:00Z", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

pub async fn update_rechecks_overlap_and_capacity(ctx: &TestContext) {
    let room = ctx.room("Nova", 4).await;
    let tiny = ctx.room("Tiny", 1).await;
    let (_, body) = ctx.book(room, "2030-05-06T10:00:00Z", "2030-05-06T11:00:00Z", None).await;
    let first = id_of(&body);
    ctx.book(room, "2030-05-06T12:00:00Z", "2030-05-06T13:00:00Z", None).await;
    let uri = format!("/reservations/{}/", first);

    let (status, body) = ctx.patch(&uri, json!({ "reserved_to": "2030-05-06T11:30:00Z" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reserved_to"], "2030-05-06T11:30:00Z");
    let (status, _) = ctx.patch(&uri, json!({ "reserved_to": "2030-05-06T12:30:00Z" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    for name in ["Max", "Ola"] {
        let employee = ctx.employee(name, "developer").await;
        let (status, _) = ctx
            .put(&format!("{}add_attendee/", uri), json!({ "employee_id": employee }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = ctx.patch(&uri, json!({ "room": tiny })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = ctx
        .patch(&format!("/rooms/{}/", room), json!({ "capacity": 1 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

pub async fn attendees_stop_at_capacity(ctx: &TestContext) {
    let room = ctx.room("Pair", 2).await;
    let (_, body) = ctx.book(room, "2030-05-06T15:00:00Z", "2030-05-06T16:00:00Z", None).await;
    let uri = format!("/reservations/{}/add_attendee/", id_of(&body));

    for name in ["Ivy", "Jon"] {
        let employee = ctx.employee(name, "tester").await;
        let (status, _) = ctx.put(&uri, json!({ "employee_id": employee })).await;
        assert_eq!(status, StatusCode::OK);
    }
    let third = ctx.employee("Kim", "tester").await;
    let (status, body) = ctx.put(&uri, json!({ "employee_id": third })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"]["message"],
        "conflict: room capacity of 2 has been reached, attendee can not be added"
    );

    let (status, _) = ctx.put(&uri, json!({ "employee_id": 9999 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

/// Parallel adds to one reservation: exactly `capacity` succeed, the rest see a full room.
pub async fn concurrent_attendees_fill_exactly_capacity(ctx: &TestContext) {
    let room = ctx.room("Crowded", 3).await;
    let (_, body) = ctx.book(room, "2030-06-01T10:00:00Z", "2030-06-01T11:00:00Z", None).await;
    let reservation = id_of(&body);
    let uri = format!("/reservations/{}/add_attendee/", reservation);

    let mut employees = Vec::new();
    for i in 0..10 {
        employees.push(ctx.employee(&format!("Guest{}", i), "developer").await);
    }

    let mut tasks = JoinSet::new();
    for employee in employees {
        let ctx = ctx.clone();
        let uri = uri.clone();
        tasks.spawn(async move { ctx.put(&uri, json!({ "employee_id": employee })).await });
    }
    let (mut added, mut full) = (0, 0);
    while let Some(joined) = tasks.join_next().await {
        let (status, body) = joined.unwrap();
        match status {
            StatusCode::OK => added += 1,
            StatusCode::CONFLICT => {
                let message = body["error"]["message"].as_str().unwrap();
                assert!(message.contains("capacity of 3 has been reached"), "{}", message);
                full += 1;
            }
            other => panic!("unexpected status {} with {}", other, body),
        }
    }
    assert_eq!((added, full), (3, 7));

    let (_, body) = ctx.get(&format!("/reservations/{}/", reservation)).await;
    assert_eq!(body["data"]["attendees"].as_array().unwrap().len(), 3);
}

pub async fn deletes_cascade_and_clear_host(ctx: &TestContext) {
    let host = ctx.employee("Hank", "manager").await;
    let room = ctx.room("Green", 3).await;
    let doomed = ctx.room("Doomed", 3).await;
    let (_, body) = ctx
        .book(room, "2030-02-01T09:00:00Z", "2030-02-01T10:00:00Z", Some(host))
        .await;
    let kept = id_of(&body);
    ctx.put(
        &format!("/reservations/{}/add_attendee/", kept),
        json!({ "employee_id": host }),
    )
    .await;
    let (_, body) = ctx
        .book(doomed, "2030-02-01T09:00:00Z", "2030-02-01T10:00:00Z", None)
        .await;
    let gone = id_of(&body);

    let (status, body) = ctx.get(&format!("/reservations/{}/", kept)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["host_employee_email"], "hank.doe@gmail.com");

    let (status, _) = ctx.delete(&format!("/employees/{}/", host)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = ctx.get(&format!("/reservations/{}/", kept)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["host"].is_null());
    assert!(body["data"]["host_employee_email"].is_null());
    assert_eq!(body["data"]["attendees"], json!([]));

    let (status, _) = ctx.delete(&format!("/rooms/{}/", doomed)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx.get(&format!("/reservations/{}/", gone)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = ctx.get("/reservations/").await;
    assert_eq!(body["meta"]["count"], 1);
}

pub async fn room_filters(ctx: &TestContext) {
    let busy = ctx.room("Busy", 5).await;
    let later = ctx.room("Later", 10).await;
    ctx.room("Empty", 40).await;
    let (status, _) = ctx
        .book(busy, &from_now(Duration::hours(-1)), &from_now(Duration::hours(1)), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    ctx.book(later, &from_now(Duration::hours(3)), &from_now(Duration::hours(4)), None)
        .await;

    let (_, body) = ctx.get("/rooms/?is_reserved=true").await;
    assert_eq!(body["meta"]["count"], 1);
    assert_eq!(body["data"][0]["id"], busy);
    let (_, body) = ctx.get("/rooms/?is_reserved=false&ordering=-capacity").await;
    assert_eq!(body["meta"]["count"], 2);
    assert_eq!(body["data"][0]["name"], "Empty");
    let (_, body) = ctx.get("/rooms/?min_capacity=10&ordering=capacity").await;
    assert_eq!(body["meta"]["count"], 2);
    assert_eq!(body["data"][0]["title"], "Later (10)");
}

pub async fn employee_filters_and_position_totals(ctx: &TestContext) {
    let manager = ctx.employee("Alice", "manager").await;
    ctx.employee("Bruno", "developer").await;
    let mut senior = super::test_data::employee("Alina", "developer");
    senior["experience"] = json!(9);
    let (status, _) = ctx.post("/employees/", senior).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = ctx.get("/employees/?name=ALI&ordering=-first_name").await;
    assert_eq!(body["meta"]["count"], 2);
    assert_eq!(body["data"][0]["first_name"], "Alina");
    let (_, body) = ctx.get("/employees/?position=developer&max_experience=5").await;
    assert_eq!(body["meta"]["count"], 1);
    assert_eq!(body["data"][0]["first_name"], "Bruno");
    let (_, body) = ctx.get("/employees/?ordering=first_name&limit=1&offset=1").await;
    assert_eq!(body["data"][0]["first_name"], "Alina");

    let room = ctx.room("Blue", 4).await;
    ctx.book(room, "2030-01-01T09:00:00Z", "2030-01-01T10:00:00Z", Some(manager)).await;
    ctx.book(room, "2030-01-01T10:00:00Z", "2030-01-01T11:00:00Z", Some(manager)).await;
    let (status, body) = ctx.get("/employees/reservations_by_position/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            { "position": "developer", "total": 0 },
            { "position": "manager", "total": 2 }
        ])
    );
}

pub async fn malformed_bodies_use_error_envelope(ctx: &TestContext) {
    let (status, body) = ctx
        .send_raw(Method::POST, "/rooms/", "{not json", Some("application/json"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = ctx
        .send_raw(Method::POST, "/rooms/", r#"{"name": "A", "capacity": 2}"#, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = ctx
        .send_raw(Method::POST, "/reservations/", "", Some("application/json"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (_, body) = ctx.get("/rooms/").await;
    assert_eq!(body["meta"]["count"], 0);
}
