use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use glaciar_core::error::BoxError;
use glaciar_core::package::Package;
use glaciar_core::repository::CatalogRepository;
use glaciar_core::schedule::{Professional, Service};

pub struct StoreCatalogRepository {
    pool: PgPool,
}

impl StoreCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: Uuid,
    name: String,
    price: i64,
    duration_minutes: i64,
    max_capacity: i32,
    is_active: bool,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            name: row.name,
            price: row.price,
            duration_minutes: row.duration_minutes,
            max_capacity: row.max_capacity,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProfessionalRow {
    id: Uuid,
    name: String,
    is_active: bool,
}

#[derive(sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    name: String,
    sessions: i32,
    price: i64,
    validity_days: i64,
    applicable_service_ids: Vec<Uuid>,
    is_gift: bool,
    is_active: bool,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            id: row.id,
            name: row.name,
            sessions: row.sessions,
            price: row.price,
            validity_days: row.validity_days,
            applicable_service_ids: row.applicable_service_ids,
            is_gift: row.is_gift,
            is_active: row.is_active,
        }
    }
}

#[async_trait]
impl CatalogRepository for StoreCatalogRepository {
    async fn get_service(&self, id: Uuid) -> Result<Option<Service>, BoxError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            "SELECT id, name, price, duration_minutes, max_capacity, is_active \
             FROM services WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Service::from))
    }

    async fn list_services(&self) -> Result<Vec<Service>, BoxError> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            "SELECT id, name, price, duration_minutes, max_capacity, is_active \
             FROM services ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Service::from).collect())
    }

    async fn get_professional(&self, id: Uuid) -> Result<Option<Professional>, BoxError> {
        let row = sqlx::query_as::<_, ProfessionalRow>(
            "SELECT id, name, is_active FROM professionals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Professional { id: r.id, name: r.name, is_active: r.is_active }))
    }

    async fn get_package(&self, id: Uuid) -> Result<Option<Package>, BoxError> {
        let row = sqlx::query_as::<_, PackageRow>(
            "SELECT id, name, sessions, price, validity_days, applicable_service_ids, \
             is_gift, is_active \
             FROM packages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Package::from))
    }
}
