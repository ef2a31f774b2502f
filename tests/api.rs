use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use cinema_booking::{
    config::Config, controllers, layout::HallLayouts, middleware::Claims, AppState,
};

const SECRET: &str = "test-secret";

fn config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".into()),
        "JWT_SECRET" => Some(SECRET.into()),
        _ => None,
    })
    .unwrap()
}

fn app() -> Router {
    let state: Arc<AppState> = AppState::in_memory(config(), HallLayouts::builtin().unwrap());
    controllers::router(state)
}

fn token(user: &str, admin: bool) -> String {
    let claims = Claims {
        sub: user.into(),
        admin,
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = auth {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn show_body(hall: &str) -> Value {
    json!({
        "movieId": "550",
        "hallCode": hall,
        "dateTime": (Utc::now() + Duration::days(1)).to_rfc3339(),
        "type": "2D",
        "regularPrice": 1500,
        "vipPrice": 4000
    })
}

async fn create_show(app: &Router, hall: &str) -> String {
    let admin = token("admin", true);
    let (status, body) = send(app, Method::POST, "/api/admin/shows", Some(&admin), Some(show_body(hall))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["showId"].as_str().unwrap().to_string()
}

fn seat_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_require_an_admin_token() {
    let app = app();

    let (anonymous, _) = send(&app, Method::POST, "/api/admin/shows", None, Some(show_body("C1"))).await;
    let user = token("u1", false);
    let (regular, _) = send(&app, Method::POST, "/api/admin/shows", Some(&user), Some(show_body("C1"))).await;
    let (forged, _) = send(&app, Method::POST, "/api/admin/shows", Some("not-a-jwt"), Some(show_body("C1"))).await;

    assert_eq!(anonymous, StatusCode::UNAUTHORIZED);
    assert_eq!(regular, StatusCode::FORBIDDEN);
    assert_eq!(forged, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn show_creation_validates_input() {
    let app = app();
    let admin = token("admin", true);

    let mut past = show_body("C1");
    past["dateTime"] = json!((Utc::now() - Duration::hours(1)).to_rfc3339());
    let mut unknown_hall = show_body("C1");
    unknown_hall["hallCode"] = json!("C9");
    let mut free = show_body("C1");
    free["vipPrice"] = json!(0);
    let mut imax = show_body("C1");
    imax["type"] = json!("IMAX");

    for body in [past, unknown_hall, free, imax] {
        let (status, response) = send(&app, Method::POST, "/api/admin/shows", Some(&admin), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{response}");
        assert_eq!(response["reason"], "ValidationError");
    }
}

#[tokio::test]
async fn seats_of_unknown_show_or_category_are_not_found() {
    let app = app();
    let show_id = create_show(&app, "C1").await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/shows/{}/seats", uuid::Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "ShowNotFound");

    let (status, _) = send(&app, Method::GET, &format!("/api/shows/{show_id}/seats?category=balcony"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_flow_reserves_seats_and_rejects_overlaps() {
    let app = app();
    let show_id = create_show(&app, "C1").await;
    let seats_uri = format!("/api/shows/{show_id}/seats?category=regular");

    let (status, before) = send(&app, Method::GET, &seats_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let universe = seat_list(&before["universe"]);
    assert_eq!(universe.len(), 9 * 6 + 9 * 11 + 9 * 6);
    assert_eq!(universe[0], "A1");
    assert!(seat_list(&before["occupied"]).is_empty());

    let alice = token("alice", false);
    let (status, booking) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&alice),
        Some(json!({"showId": show_id, "category": "regular", "seatIds": ["A1", "A2"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{booking}");
    assert_eq!(booking["amount"], 3000);
    assert_eq!(seat_list(&booking["seats"]), vec!["A1", "A2"]);

    let bob = token("bob", false);
    let (status, conflict) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&bob),
        Some(json!({"showId": show_id, "category": "regular", "seatIds": ["A2", "A3"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["reason"], "SeatConflict");
    assert_eq!(seat_list(&conflict["seats"]), vec!["A2"]);

    let (_, after) = send(&app, Method::GET, &seats_uri, None, None).await;
    assert_eq!(seat_list(&after["occupied"]), vec!["A1", "A2"]);
}

#[tokio::test]
async fn seat_rule_violations_map_to_conflicts() {
    let app = app();
    let show_id = create_show(&app, "C1").await;
    let user = token("u1", false);

    let cases = [
        (json!(["B24"]), "vip", "SeatDisabled"),
        (json!(["Z99"]), "regular", "SeatNotFound"),
        (
            json!(["A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9"]),
            "regular",
            "TooManySeats",
        ),
    ];
    for (seats, category, reason) in cases {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/bookings",
            Some(&user),
            Some(json!({"showId": show_id, "category": category, "seatIds": seats})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");
        assert_eq!(body["reason"], reason);
    }

    let (_, vip) = send(&app, Method::GET, &format!("/api/shows/{show_id}/seats?category=vip"), None, None).await;
    assert!(seat_list(&vip["occupied"]).is_empty());
}

#[tokio::test]
async fn booking_on_unknown_show_is_not_found() {
    let app = app();
    let user = token("u1", false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&user),
        Some(json!({"showId": uuid::Uuid::new_v4(), "category": "regular", "seatIds": ["A1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "ShowNotFound");

    let (_, mine) = send(&app, Method::GET, "/api/bookings", Some(&user), None).await;
    assert!(mine.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_seat_list_is_a_validation_error() {
    let app = app();
    let show_id = create_show(&app, "C2").await;
    let user = token("u1", false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&user),
        Some(json!({"showId": show_id, "category": "regular", "seatIds": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "ValidationError");
}

#[tokio::test]
async fn bookings_are_visible_to_owner_and_admin_only() {
    let app = app();
    let show_id = create_show(&app, "C3").await;
    let alice = token("alice", false);
    let mallory = token("mallory", false);
    let admin = token("admin", true);

    let (_, booking) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&alice),
        Some(json!({"showId": show_id, "category": "vip", "seatIds": ["A9"]})),
    )
    .await;
    let booking_uri = format!("/api/bookings/{}", booking["bookingId"].as_str().unwrap());

    let (status, own) = send(&app, Method::GET, &booking_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["paymentStatus"], "unpaid");

    let (status, _) = send(&app, Method::GET, &booking_uri, Some(&mallory), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, &booking_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = send(&app, Method::GET, "/api/bookings", Some(&alice), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (_, per_show) = send(
        &app,
        Method::GET,
        &format!("/api/admin/shows/{show_id}/bookings"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(per_show.as_array().unwrap().len(), 1);

    let paid_uri = format!("/api/admin/bookings/{}/paid", booking["bookingId"].as_str().unwrap());
    let (status, paid) = send(&app, Method::POST, &paid_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["paymentStatus"], "paid");
}

#[tokio::test]
async fn batch_schedule_is_listed_by_movie_and_date() {
    let app = app();
    let admin = token("admin", true);
    let date = (Utc::now() + Duration::days(3)).date_naive();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/admin/shows/batch",
        Some(&admin),
        Some(json!({
            "movieId": "603",
            "type": "3D",
            "regularPrice": 1200,
            "vipPrice": 3000,
            "schedule": [
                {"hall": "C1", "date": date.to_string(), "times": ["20:00:00", "11:00:00"]},
                {"hall": "C2", "date": date.to_string(), "times": ["15:30:00"]}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["showIds"].as_array().unwrap().len(), 3);

    let (status, listed) = send(
        &app,
        Method::GET,
        &format!("/api/shows?movieId=603&date={date}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let halls: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["hall"].as_str().unwrap())
        .collect();
    assert_eq!(halls, vec!["C1", "C2", "C1"]);
    assert_eq!(listed[0]["type"], "3D");

    let (_, upcoming) = send(&app, Method::GET, "/api/admin/shows", Some(&admin), None).await;
    assert_eq!(upcoming.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn batch_schedule_entries_are_validated() {
    let app = app();
    let admin = token("admin", true);
    let date = (Utc::now() + Duration::days(3)).date_naive();

    for schedule in [
        json!([]),
        json!([{"hall": "C1", "date": date.to_string(), "times": []}]),
        json!([{"hall": "", "date": date.to_string(), "times": ["12:00:00"]}]),
    ] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/admin/shows/batch",
            Some(&admin),
            Some(json!({
                "movieId": "603",
                "type": "2D",
                "regularPrice": 1200,
                "vipPrice": 3000,
                "schedule": schedule
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["reason"], "ValidationError");
    }

    let (_, upcoming) = send(&app, Method::GET, "/api/admin/shows", Some(&admin), None).await;
    assert!(upcoming.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn reconcile_endpoint_reports_nothing_to_repair_after_clean_admissions() {
    let app = app();
    let show_id = create_show(&app, "C1").await;
    let user = token("u1", false);
    let admin = token("admin", true);

    send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&user),
        Some(json!({"showId": show_id, "category": "regular", "seatIds": ["E5"]})),
    )
    .await;

    let (status, report) = send(&app, Method::POST, "/api/admin/reconcile", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["shows_scanned"], 1);
    assert_eq!(report["bookings_repaired"], 0);
}
