//! Integration tests for gateway with attendance-service
//!
//! These tests verify the InProcess call integration between the gateway
//! and the attendance service, and the HTTP surface on top of it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{NaiveTime, TimeZone, Utc, Weekday};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use attendance_service::models::ShiftWindow;
use attendance_service::{Coordinate, Employee, Location, PunchMode, Schedule};
use gateway_lib::{app, ServiceRouter};

const SHOP: Coordinate = Coordinate {
    lat: 51.5007,
    long: -0.1246,
};

fn seeded_router() -> Arc<ServiceRouter> {
    let router = ServiceRouter::new();
    let directory = router.directory();

    directory.add_location(Location {
        id: "LOC1".to_string(),
        name: "Main Shop".to_string(),
        coordinates: SHOP,
        radius_meters: 50.0,
    });

    let window = ShiftWindow {
        start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    };
    let mut shift_times = HashMap::new();
    for weekday in [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ] {
        shift_times.insert(weekday, window);
    }
    directory.add_schedule(Schedule {
        id: "SCH1".to_string(),
        title: "Weekday".to_string(),
        shift_times,
    });

    directory.add_employee(Employee {
        id: "EMP001".to_string(),
        name: "Alice Harper".to_string(),
        location: Some("LOC1".to_string()),
        schedule: Some("SCH1".to_string()),
    });

    Arc::new(router)
}

fn tracking_body(employee_id: &str, lat: f64, long: f64, timestamp: &str) -> Body {
    Body::from(
        serde_json::json!({
            "employee_id": employee_id,
            "lat": lat,
            "long": long,
            "timestamp": timestamp,
        })
        .to_string(),
    )
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_clock_in_and_out_in_process() {
    let router = seeded_router();

    // 2024-01-15 is a Monday; shift starts at 09:00.
    let clock_in = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 0).unwrap();
    let status = router
        .attendance()
        .clock_in("EMP001", SHOP, clock_in)
        .await
        .unwrap();
    assert_eq!(status.current_mode, PunchMode::Stop);

    let clock_out = Utc.with_ymd_and_hms(2024, 1, 15, 17, 0, 0).unwrap();
    let status = router
        .attendance()
        .clock_out("EMP001", SHOP, clock_out)
        .await
        .unwrap();
    assert_eq!(status.current_mode, PunchMode::Start);
    assert_eq!(status.last_out, Some(clock_out));
}

#[tokio::test]
async fn test_http_tracking_roundtrip() {
    let router = seeded_router();

    let response = app(router.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tracking/start")
                .header("content-type", "application/json")
                .body(tracking_body(
                    "EMP001",
                    SHOP.lat,
                    SHOP.long,
                    "2024-01-15T09:05:00Z",
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["current_mode"], "stop");

    let response = app(router.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tracking/stop")
                .header("content-type", "application/json")
                .body(tracking_body(
                    "EMP001",
                    SHOP.lat,
                    SHOP.long,
                    "2024-01-15T17:00:00Z",
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["current_mode"], "start");
}

#[tokio::test]
async fn test_http_out_of_range_rejected() {
    let router = seeded_router();

    let response = app(router)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tracking/start")
                .header("content-type", "application/json")
                .body(tracking_body(
                    "EMP001",
                    SHOP.lat + 0.5,
                    SHOP.long,
                    "2024-01-15T09:00:00Z",
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["code"], "OUT_OF_RANGE");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("meters away from location"));
}

#[tokio::test]
async fn test_http_unknown_employee() {
    let router = seeded_router();

    let response = app(router)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tracking/start")
                .header("content-type", "application/json")
                .body(tracking_body(
                    "NOBODY",
                    SHOP.lat,
                    SHOP.long,
                    "2024-01-15T09:00:00Z",
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["code"], "EMPLOYEE_NOT_FOUND");
}

#[tokio::test]
async fn test_http_timesheet_monthly_grid() {
    let router = seeded_router();

    let clock_in = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    router
        .attendance()
        .clock_in("EMP001", SHOP, clock_in)
        .await
        .unwrap();
    let clock_out = Utc.with_ymd_and_hms(2024, 1, 15, 17, 0, 0).unwrap();
    router
        .attendance()
        .clock_out("EMP001", SHOP, clock_out)
        .await
        .unwrap();

    let response = app(router)
        .oneshot(
            Request::builder()
                .uri("/api/timesheet?start_date=2024-01-01&end_date=2024-01-31&mode=MONTHLY")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_docs"], 1);
    assert_eq!(body["timesheet"][0]["employee_id"], "EMP001");
    assert_eq!(body["timesheet"][0]["logs"]["15"], "P");
}

#[tokio::test]
async fn test_http_dashboard_metrics() {
    let router = seeded_router();

    let clock_in = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    router
        .attendance()
        .clock_in("EMP001", SHOP, clock_in)
        .await
        .unwrap();
    let clock_out = Utc.with_ymd_and_hms(2024, 1, 15, 17, 30, 0).unwrap();
    router
        .attendance()
        .clock_out("EMP001", SHOP, clock_out)
        .await
        .unwrap();

    let response = app(router.clone())
        .oneshot(
            Request::builder()
                .uri("/api/dashboard/metrics?start_date=2024-01-15&end_date=2024-01-19")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["avg_work_hours"], 8.0);
    assert_eq!(body["avg_late_days"], 1.0);
    assert_eq!(body["avg_late_minutes"], 30.0);
    assert_eq!(body["on_time_percentage_by_location"][0]["location_id"], "LOC1");

    // Scoping to a location with no members drops every log from the
    // aggregation.
    let response = app(router)
        .oneshot(
            Request::builder()
                .uri("/api/dashboard/metrics?start_date=2024-01-15&end_date=2024-01-19&filter=LOCATION&ids=LOC9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["avg_late_minutes"], 0.0);
    assert_eq!(body["avg_work_hours"], 0.0);
}

#[tokio::test]
async fn test_http_health() {
    let router = seeded_router();

    let response = app(router)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}
