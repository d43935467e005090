use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use wheels_shared::Masked;

use crate::{CoreError, CoreResult};

const MIN_PASSWORD_LEN: usize = 6;

/// Role chosen at registration. Wire names follow the frontend (`pasajero`, `conductor`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "pasajero", alias = "passenger")]
    Passenger,
    #[serde(rename = "conductor", alias = "driver")]
    Driver,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Passenger => "pasajero",
            Role::Driver => "conductor",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pasajero" | "passenger" => Some(Role::Passenger),
            "conductor" | "driver" => Some(Role::Driver),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vehicle {
    #[serde(rename = "placaVehiculo")]
    pub plate: String,
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "capacidadVehiculo")]
    pub capacity: i32,
    #[serde(rename = "fotoVehiculo", default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(rename = "fotoSOAT", default, skip_serializing_if = "Option::is_none")]
    pub insurance_photo: Option<String>,
}

/// Public profile of a registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "idUniversidad")]
    pub university_id: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "numeroContacto")]
    pub phone: String,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "foto", default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(flatten)]
    pub vehicle: Option<Vehicle>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }

    pub fn summary(&self) -> DriverSummary {
        DriverSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            brand: self.vehicle.as_ref().map(|v| v.brand.clone()),
            model: self.vehicle.as_ref().map(|v| v.model.clone()),
            plate: self.vehicle.as_ref().map(|v| v.plate.clone()),
        }
    }

    /// Applies a profile edit. Email and role are immutable; vehicle fields only apply to drivers.
    pub fn apply_update(&mut self, update: ProfileUpdate, max_seats: i32) -> CoreResult<()> {
        if let Some(first_name) = update.first_name {
            self.first_name = required("nombre", &first_name)?;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = required("apellido", &last_name)?;
        }
        if let Some(phone) = update.phone {
            self.phone = required("numeroContacto", &phone)?;
        }
        if let Some(photo) = update.photo {
            self.photo = Some(photo).filter(|p| !p.is_empty());
        }

        let touches_vehicle = update.plate.is_some()
            || update.brand.is_some()
            || update.model.is_some()
            || update.vehicle_capacity.is_some()
            || update.vehicle_photo.is_some()
            || update.insurance_photo.is_some();
        if !touches_vehicle {
            return Ok(());
        }

        let vehicle = match (self.role, self.vehicle.as_mut()) {
            (Role::Driver, Some(vehicle)) => vehicle,
            _ => return Err(CoreError::validation("only drivers have vehicle details")),
        };
        if let Some(plate) = update.plate {
            vehicle.plate = required("placaVehiculo", &plate)?;
        }
        if let Some(brand) = update.brand {
            vehicle.brand = required("marca", &brand)?;
        }
        if let Some(model) = update.model {
            vehicle.model = required("modelo", &model)?;
        }
        if let Some(capacity) = update.vehicle_capacity {
            validate_vehicle_capacity(capacity, max_seats)?;
            vehicle.capacity = capacity;
        }
        if let Some(photo) = update.vehicle_photo {
            vehicle.photo = Some(photo).filter(|p| !p.is_empty());
        }
        if let Some(photo) = update.insurance_photo {
            vehicle.insurance_photo = Some(photo).filter(|p| !p.is_empty());
        }
        Ok(())
    }
}

/// A user together with the stored password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: Masked<String>,
}

/// Driver contact and vehicle details embedded in trip listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "numeroContacto")]
    pub phone: String,
    #[serde(rename = "marca", default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "modelo", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "placaVehiculo", default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "idUniversidad")]
    pub university_id: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "numeroContacto")]
    pub phone: String,
    pub password: Masked<String>,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "foto", default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(rename = "placaVehiculo", default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(rename = "marca", default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "modelo", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "capacidadVehiculo", default, skip_serializing_if = "Option::is_none")]
    pub vehicle_capacity: Option<i32>,
    #[serde(rename = "fotoVehiculo", default, skip_serializing_if = "Option::is_none")]
    pub vehicle_photo: Option<String>,
    #[serde(rename = "fotoSOAT", default, skip_serializing_if = "Option::is_none")]
    pub insurance_photo: Option<String>,
}

impl NewUser {
    pub fn validate(&self, max_seats: i32) -> CoreResult<()> {
        required("nombre", &self.first_name)?;
        required("apellido", &self.last_name)?;
        required("idUniversidad", &self.university_id)?;
        required("numeroContacto", &self.phone)?;
        let email = required("correo", &self.email)?;
        if !email.contains('@') {
            return Err(CoreError::validation("correo must be a valid email address"));
        }
        if self.password.expose().chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::validation(format!(
                "password must have at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.role == Role::Driver {
            required_opt("placaVehiculo", self.plate.as_deref())?;
            required_opt("marca", self.brand.as_deref())?;
            required_opt("modelo", self.model.as_deref())?;
            let capacity = self
                .vehicle_capacity
                .ok_or_else(|| CoreError::validation("capacidadVehiculo is required"))?;
            validate_vehicle_capacity(capacity, max_seats)?;
        }
        Ok(())
    }

    /// Consumes a validated registration. Vehicle fields sent by passengers are dropped.
    pub fn into_record(self, password_hash: String) -> UserRecord {
        let vehicle = match self.role {
            Role::Driver => Some(Vehicle {
                plate: self.plate.unwrap_or_default().trim().to_string(),
                brand: self.brand.unwrap_or_default().trim().to_string(),
                model: self.model.unwrap_or_default().trim().to_string(),
                capacity: self.vehicle_capacity.unwrap_or_default(),
                photo: self.vehicle_photo.filter(|p| !p.is_empty()),
                insurance_photo: self.insurance_photo.filter(|p| !p.is_empty()),
            }),
            Role::Passenger => None,
        };

        UserRecord {
            user: User {
                id: Uuid::new_v4(),
                first_name: self.first_name.trim().to_string(),
                last_name: self.last_name.trim().to_string(),
                university_id: self.university_id.trim().to_string(),
                email: normalize_email(&self.email),
                phone: self.phone.trim().to_string(),
                role: self.role,
                photo: self.photo.filter(|p| !p.is_empty()),
                vehicle,
                created_at: Utc::now(),
            },
            password_hash: Masked::new(password_hash),
        }
    }
}

/// Body of `PUT /api/users/me`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "apellido", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(rename = "numeroContacto", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "foto", default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(rename = "placaVehiculo", default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(rename = "marca", default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "modelo", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "capacidadVehiculo", default, skip_serializing_if = "Option::is_none")]
    pub vehicle_capacity: Option<i32>,
    #[serde(rename = "fotoVehiculo", default, skip_serializing_if = "Option::is_none")]
    pub vehicle_photo: Option<String>,
    #[serde(rename = "fotoSOAT", default, skip_serializing_if = "Option::is_none")]
    pub insurance_photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "correo")]
    pub email: String,
    pub password: Masked<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: User,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_vehicle_capacity(capacity: i32, max_seats: i32) -> CoreResult<()> {
    if !(1..=max_seats).contains(&capacity) {
        return Err(CoreError::validation(format!(
            "capacidadVehiculo must be between 1 and {}",
            max_seats
        )));
    }
    Ok(())
}

fn required(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn required_opt(field: &str, value: Option<&str>) -> CoreResult<String> {
    required(field, value.unwrap_or_default())
}
