use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use wheels_core::identity::normalize_email;
use wheels_core::repository::UserRepository;
use wheels_core::{CoreError, CoreResult, Role, User, UserRecord, Vehicle};
use wheels_shared::Masked;

use crate::db_error;

const USER_COLUMNS: &str = "id, nombre, apellido, id_universidad, correo, numero_contacto, rol, foto, \
     placa_vehiculo, marca, modelo, capacidad_vehiculo, foto_vehiculo, foto_soat, password_hash, created_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    nombre: String,
    apellido: String,
    id_universidad: String,
    correo: String,
    numero_contacto: String,
    rol: String,
    foto: Option<String>,
    placa_vehiculo: Option<String>,
    marca: Option<String>,
    modelo: Option<String>,
    capacidad_vehiculo: Option<i32>,
    foto_vehiculo: Option<String>,
    foto_soat: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = CoreError;

    fn try_from(row: UserRow) -> CoreResult<Self> {
        let role = Role::parse(&row.rol)
            .ok_or_else(|| CoreError::Internal(format!("unknown role '{}'", row.rol)))?;
        let vehicle = match (row.placa_vehiculo, row.marca, row.modelo, row.capacidad_vehiculo) {
            (Some(plate), Some(brand), Some(model), Some(capacity)) => Some(Vehicle {
                plate,
                brand,
                model,
                capacity,
                photo: row.foto_vehiculo,
                insurance_photo: row.foto_soat,
            }),
            _ => None,
        };

        Ok(UserRecord {
            user: User {
                id: row.id,
                first_name: row.nombre,
                last_name: row.apellido,
                university_id: row.id_universidad,
                email: row.correo,
                phone: row.numero_contacto,
                role,
                photo: row.foto,
                vehicle,
                created_at: row.created_at,
            },
            password_hash: Masked::new(row.password_hash),
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert_user(&self, record: &UserRecord) -> CoreResult<()> {
        let user = &record.user;
        let vehicle = user.vehicle.as_ref();
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            USER_COLUMNS
        );
        sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.university_id)
            .bind(normalize_email(&user.email))
            .bind(&user.phone)
            .bind(user.role.as_str())
            .bind(&user.photo)
            .bind(vehicle.map(|v| v.plate.clone()))
            .bind(vehicle.map(|v| v.brand.clone()))
            .bind(vehicle.map(|v| v.model.clone()))
            .bind(vehicle.map(|v| v.capacity))
            .bind(vehicle.and_then(|v| v.photo.clone()))
            .bind(vehicle.and_then(|v| v.insurance_photo.clone()))
            .bind(record.password_hash.expose())
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    CoreError::Conflict("Email is already registered".to_string())
                } else {
                    db_error(err)
                }
            })?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(correo) = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(UserRecord::try_from).transpose()
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(UserRecord::try_from).transpose()?.map(|r| r.user))
    }

    async fn get_users(&self, ids: &[Uuid]) -> CoreResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter()
            .map(|row| UserRecord::try_from(row).map(|r| r.user))
            .collect()
    }

    async fn update_user(&self, user: &User) -> CoreResult<()> {
        let vehicle = user.vehicle.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET nombre = $2, apellido = $3, numero_contacto = $4, foto = $5,
                placa_vehiculo = $6, marca = $7, modelo = $8, capacidad_vehiculo = $9,
                foto_vehiculo = $10, foto_soat = $11
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.photo)
        .bind(vehicle.map(|v| v.plate.clone()))
        .bind(vehicle.map(|v| v.brand.clone()))
        .bind(vehicle.map(|v| v.model.clone()))
        .bind(vehicle.map(|v| v.capacity))
        .bind(vehicle.and_then(|v| v.photo.clone()))
        .bind(vehicle.and_then(|v| v.insurance_photo.clone()))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("User"));
        }
        Ok(())
    }
}
