mod common;

use axum::http::StatusCode;
use common::{booking_body, trip_body, TestApp};
use serde_json::json;
use wheels_core::Role;

#[tokio::test]
async fn test_role_gates() {
    let app = TestApp::new();
    let (_, driver) = app.user(Role::Driver, "driver@uni.edu.co").await;
    let (_, passenger) = app.user(Role::Passenger, "ana@uni.edu.co").await;

    let (status, err) = app.send("POST", "/api/trips", Some(&passenger), Some(trip_body("Suba", 2, 6000))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "AUTHORIZATION");

    let (_, trip) = app.send("POST", "/api/trips", Some(&driver), Some(trip_body("Suba", 2, 6000))).await;
    let trip_id = trip["_id"].as_str().unwrap();

    let (status, err) = app.send("POST", "/api/bookings", Some(&driver), Some(booking_body(trip_id, 1))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "AUTHORIZATION");

    let (status, _) = app.send("GET", "/api/trips/my/trips", Some(&passenger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_only_owners_change_their_resources() {
    let app = TestApp::new();
    let (_, owner) = app.user(Role::Driver, "owner@uni.edu.co").await;
    let (_, other_driver) = app.user(Role::Driver, "other@uni.edu.co").await;
    let (_, ana) = app.user(Role::Passenger, "ana@uni.edu.co").await;
    let (_, beto) = app.user(Role::Passenger, "beto@uni.edu.co").await;

    let (_, trip) = app.send("POST", "/api/trips", Some(&owner), Some(trip_body("Suba", 3, 6000))).await;
    let trip_id = trip["_id"].as_str().unwrap().to_string();
    let trip_uri = format!("/api/trips/{}", trip_id);

    let (status, err) = app
        .send("PUT", &trip_uri, Some(&other_driver), Some(json!({ "tarifa": 1 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "AUTHORIZATION");
    let (status, _) = app.send("DELETE", &trip_uri, Some(&other_driver), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, booking) = app.send("POST", "/api/bookings", Some(&ana), Some(booking_body(&trip_id, 1))).await;
    let cancel_uri = format!("/api/bookings/{}/cancel", booking["_id"].as_str().unwrap());
    let (status, err) = app.send("PUT", &cancel_uri, Some(&beto), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "AUTHORIZATION");

    // Nothing changed.
    let (_, trip) = app.send("GET", &trip_uri, None, None).await;
    assert_eq!(trip["tarifa"], 6000);
    assert_eq!(trip["cuposDisponibles"], 2);
}

#[tokio::test]
async fn test_authentication_errors() {
    let app = TestApp::new();

    let (status, err) = app.send("GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["code"], "AUTHENTICATION");

    let (status, err) = app.send("GET", "/api/bookings/my", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["code"], "AUTHENTICATION");
}

#[tokio::test]
async fn test_profile_read_and_update() {
    let app = TestApp::new();
    let (user, token) = app.user(Role::Driver, "driver@uni.edu.co").await;

    let (status, me) = app.send("GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["_id"], user.id.to_string());
    assert!(me.get("password").is_none());

    let (status, me) = app
        .send(
            "PUT",
            "/api/users/me",
            Some(&token),
            Some(json!({ "numeroContacto": "3119998877", "capacidadVehiculo": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["numeroContacto"], "3119998877");
    assert_eq!(me["capacidadVehiculo"], 5);
    assert_eq!(me["correo"], "driver@uni.edu.co");
}
