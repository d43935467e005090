#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wheels_api::{app, auth::issue_token, AppState, AuthConfig};
use wheels_core::{NewUser, Role, User};
use wheels_store::app_config::BusinessRules;

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::in_memory(
            AuthConfig {
                secret: "test-secret".to_string(),
                expiration: 3600,
            },
            BusinessRules::default(),
        );
        Self {
            router: app(state.clone()),
            state,
        }
    }

    /// Stores a user directly, skipping password hashing, and returns it with a token.
    pub async fn user(&self, role: Role, email: &str) -> (User, String) {
        let mut fields = json!({
            "nombre": "Test",
            "apellido": "User",
            "idUniversidad": "000001",
            "correo": email,
            "numeroContacto": "3000000000",
            "password": "secreto1",
            "rol": role.as_str(),
        });
        if role == Role::Driver {
            fields["placaVehiculo"] = json!("ABC123");
            fields["marca"] = json!("Mazda");
            fields["modelo"] = json!("3");
            fields["capacidadVehiculo"] = json!(4);
        }
        let registration: NewUser = serde_json::from_value(fields).unwrap();
        let record = registration.into_record("not-a-real-hash".to_string());
        self.state.users.insert_user(&record).await.unwrap();

        let token = issue_token(&self.state.auth, &record.user).unwrap();
        (record.user, token)
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

pub fn tomorrow() -> String {
    (Utc::now() + Duration::days(1)).to_rfc3339()
}

pub fn trip_body(inicio: &str, cupos: i32, tarifa: i64) -> Value {
    json!({
        "inicio": inicio,
        "destino": "Universidad",
        "hora": tomorrow(),
        "cupos": cupos,
        "tarifa": tarifa,
    })
}

pub fn booking_body(trip_id: &str, seats: i32) -> Value {
    json!({
        "tripId": trip_id,
        "cuposReservados": seats,
        "puntoRecogida": "Calle 80",
    })
}
