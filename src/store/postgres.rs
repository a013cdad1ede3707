use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    MileageHistoryModel, NewOilChange, OilChangeModel, VehicleFields, VehicleModel,
};
use crate::store::Store;

const VEHICLE_COLUMNS: &str = r#"id, user_id, "name", make, model, "year", license_plate,
    oil_change_interval, current_mileage, created_at, updated_at"#;

const OIL_CHANGE_COLUMNS: &str =
    "id, vehicle_id, mileage_at_change, date_of_change, next_change_due_at, notes, created_at";

pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn session_user(&self, token: &str) -> Result<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id FROM public.sessions
            WHERE token = $1 AND expires_at > now()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user_id)
    }

    async fn create_vehicle(&self, owner: Uuid, fields: VehicleFields) -> Result<VehicleModel> {
        let now = Utc::now();
        let vehicle = sqlx::query_as::<_, VehicleModel>(&format!(
            r#"
            INSERT INTO public.vehicles
            (id, user_id, "name", make, model, "year", license_plate, oil_change_interval,
             created_at, updated_at)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {VEHICLE_COLUMNS};
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(fields.name.unwrap_or_default())
        .bind(fields.make)
        .bind(fields.model)
        .bind(fields.year)
        .bind(fields.license_plate)
        .bind(fields.oil_change_interval)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(vehicle)
    }

    async fn list_vehicles(
        &self,
        owner: Uuid,
    ) -> Result<Vec<(VehicleModel, Option<OilChangeModel>)>> {
        let vehicles = sqlx::query_as::<_, VehicleModel>(&format!(
            r#"
            SELECT {VEHICLE_COLUMNS} FROM public.vehicles
            WHERE user_id = $1
            ORDER BY created_at
            "#
        ))
        .bind(owner)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = vehicles.iter().map(|v| v.id).collect();
        let mut latest = sqlx::query_as::<_, OilChangeModel>(&format!(
            r#"
            SELECT DISTINCT ON (vehicle_id) {OIL_CHANGE_COLUMNS}
            FROM public.oil_changes
            WHERE vehicle_id = ANY($1)
            ORDER BY vehicle_id, date_of_change DESC
            "#
        ))
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        Ok(vehicles
            .into_iter()
            .map(|vehicle| {
                let last = latest
                    .iter()
                    .position(|c| c.vehicle_id == vehicle.id)
                    .map(|i| latest.swap_remove(i));
                (vehicle, last)
            })
            .collect())
    }

    async fn find_vehicle(&self, owner: Uuid, id: Uuid) -> Result<Option<VehicleModel>> {
        let vehicle = sqlx::query_as::<_, VehicleModel>(&format!(
            r#"
            SELECT {VEHICLE_COLUMNS} FROM public.vehicles
            WHERE id = $1 AND user_id = $2
            "#
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(vehicle)
    }

    async fn update_vehicle(
        &self,
        owner: Uuid,
        id: Uuid,
        fields: VehicleFields,
    ) -> Result<Option<VehicleModel>> {
        let vehicle = sqlx::query_as::<_, VehicleModel>(&format!(
            r#"
            UPDATE public.vehicles
            SET "name" = COALESCE($3, "name"), make = $4, model = $5, "year" = $6,
                license_plate = $7, oil_change_interval = $8, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {VEHICLE_COLUMNS};
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(fields.name)
        .bind(fields.make)
        .bind(fields.model)
        .bind(fields.year)
        .bind(fields.license_plate)
        .bind(fields.oil_change_interval)
        .fetch_optional(&self.db)
        .await?;
        Ok(vehicle)
    }

    async fn delete_vehicle(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM public.vehicles
            WHERE id = $1 AND user_id = $2;
            "#,
        )
        .bind(id)
        .bind(owner)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_mileage(
        &self,
        owner: Uuid,
        id: Uuid,
        mileage: i32,
    ) -> Result<Option<VehicleModel>> {
        let mut tx = self.db.begin().await?;

        let vehicle = sqlx::query_as::<_, VehicleModel>(&format!(
            r#"
            UPDATE public.vehicles
            SET current_mileage = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {VEHICLE_COLUMNS};
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(mileage)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(vehicle) = vehicle else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO public.mileage_history
            (id, vehicle_id, mileage, created_at)
            VALUES($1, $2, $3, now());
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vehicle.id)
        .bind(mileage)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(vehicle))
    }

    async fn oil_changes(&self, vehicle_id: Uuid, limit: Option<i64>) -> Result<Vec<OilChangeModel>> {
        let changes = sqlx::query_as::<_, OilChangeModel>(&format!(
            r#"
            SELECT {OIL_CHANGE_COLUMNS} FROM public.oil_changes
            WHERE vehicle_id = $1
            ORDER BY date_of_change DESC
            LIMIT $2
            "#
        ))
        .bind(vehicle_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(changes)
    }

    async fn mileage_history(&self, vehicle_id: Uuid) -> Result<Vec<MileageHistoryModel>> {
        let history = sqlx::query_as::<_, MileageHistoryModel>(
            r#"
            SELECT id, vehicle_id, mileage, created_at FROM public.mileage_history
            WHERE vehicle_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.db)
        .await?;
        Ok(history)
    }

    async fn create_oil_change(&self, oil_change: NewOilChange) -> Result<OilChangeModel> {
        let created = sqlx::query_as::<_, OilChangeModel>(&format!(
            r#"
            INSERT INTO public.oil_changes
            (id, vehicle_id, mileage_at_change, date_of_change, next_change_due_at, notes, created_at)
            VALUES($1, $2, $3, $4, $5, $6, $7)
            RETURNING {OIL_CHANGE_COLUMNS};
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(oil_change.vehicle_id)
        .bind(oil_change.mileage_at_change)
        .bind(oil_change.date_of_change)
        .bind(oil_change.next_change_due_at)
        .bind(oil_change.notes)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }
}
