//! In-process store for handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    MileageHistoryModel, NewOilChange, OilChangeModel, VehicleFields, VehicleModel,
};
use crate::store::Store;

#[derive(Default)]
struct Tables {
    sessions: HashMap<String, Uuid>,
    vehicles: Vec<VehicleModel>,
    oil_changes: Vec<OilChangeModel>,
    mileage_history: Vec<MileageHistoryModel>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session token for a fresh user and returns the user id.
    pub fn add_session(&self, token: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.tables
            .lock()
            .unwrap()
            .sessions
            .insert(token.to_string(), user_id);
        user_id
    }

    pub fn vehicle_count(&self) -> usize {
        self.tables.lock().unwrap().vehicles.len()
    }

    pub fn mileage_rows(&self, vehicle_id: Uuid) -> usize {
        self.tables
            .lock()
            .unwrap()
            .mileage_history
            .iter()
            .filter(|h| h.vehicle_id == vehicle_id)
            .count()
    }

    fn sorted_oil_changes(tables: &Tables, vehicle_id: Uuid) -> Vec<OilChangeModel> {
        let mut changes: Vec<OilChangeModel> = tables
            .oil_changes
            .iter()
            .filter(|c| c.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        changes.sort_by(|a, b| b.date_of_change.cmp(&a.date_of_change));
        changes
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn session_user(&self, token: &str) -> Result<Option<Uuid>> {
        Ok(self.tables.lock().unwrap().sessions.get(token).copied())
    }

    async fn create_vehicle(&self, owner: Uuid, fields: VehicleFields) -> Result<VehicleModel> {
        let now = Utc::now();
        let vehicle = VehicleModel {
            id: Uuid::new_v4(),
            user_id: owner,
            name: fields.name.unwrap_or_default(),
            make: fields.make,
            model: fields.model,
            year: fields.year,
            license_plate: fields.license_plate,
            oil_change_interval: fields.oil_change_interval,
            current_mileage: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().vehicles.push(vehicle.clone());
        Ok(vehicle)
    }

    async fn list_vehicles(
        &self,
        owner: Uuid,
    ) -> Result<Vec<(VehicleModel, Option<OilChangeModel>)>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .vehicles
            .iter()
            .filter(|v| v.user_id == owner)
            .map(|v| {
                let last = Self::sorted_oil_changes(&tables, v.id).into_iter().next();
                (v.clone(), last)
            })
            .collect())
    }

    async fn find_vehicle(&self, owner: Uuid, id: Uuid) -> Result<Option<VehicleModel>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .vehicles
            .iter()
            .find(|v| v.id == id && v.user_id == owner)
            .cloned())
    }

    async fn update_vehicle(
        &self,
        owner: Uuid,
        id: Uuid,
        fields: VehicleFields,
    ) -> Result<Option<VehicleModel>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(vehicle) = tables
            .vehicles
            .iter_mut()
            .find(|v| v.id == id && v.user_id == owner)
        else {
            return Ok(None);
        };
        if let Some(name) = fields.name {
            vehicle.name = name;
        }
        vehicle.make = fields.make;
        vehicle.model = fields.model;
        vehicle.year = fields.year;
        vehicle.license_plate = fields.license_plate;
        vehicle.oil_change_interval = fields.oil_change_interval;
        vehicle.updated_at = Utc::now();
        Ok(Some(vehicle.clone()))
    }

    async fn delete_vehicle(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.vehicles.len();
        tables.vehicles.retain(|v| !(v.id == id && v.user_id == owner));
        let removed = tables.vehicles.len() < before;
        if removed {
            tables.oil_changes.retain(|c| c.vehicle_id != id);
            tables.mileage_history.retain(|h| h.vehicle_id != id);
        }
        Ok(removed)
    }

    async fn record_mileage(
        &self,
        owner: Uuid,
        id: Uuid,
        mileage: i32,
    ) -> Result<Option<VehicleModel>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(vehicle) = tables
            .vehicles
            .iter_mut()
            .find(|v| v.id == id && v.user_id == owner)
        else {
            return Ok(None);
        };
        vehicle.current_mileage = Some(mileage);
        vehicle.updated_at = Utc::now();
        let vehicle = vehicle.clone();

        // Keep newest-first ordering stable even within one clock tick.
        let created_at = tables
            .mileage_history
            .iter()
            .filter(|h| h.vehicle_id == id)
            .map(|h| h.created_at + Duration::microseconds(1))
            .max()
            .map_or_else(Utc::now, |next| next.max(Utc::now()));
        tables.mileage_history.push(MileageHistoryModel {
            id: Uuid::new_v4(),
            vehicle_id: id,
            mileage,
            created_at,
        });
        Ok(Some(vehicle))
    }

    async fn oil_changes(&self, vehicle_id: Uuid, limit: Option<i64>) -> Result<Vec<OilChangeModel>> {
        let tables = self.tables.lock().unwrap();
        let mut changes = Self::sorted_oil_changes(&tables, vehicle_id);
        if let Some(limit) = limit {
            changes.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(changes)
    }

    async fn mileage_history(&self, vehicle_id: Uuid) -> Result<Vec<MileageHistoryModel>> {
        let tables = self.tables.lock().unwrap();
        let mut history: Vec<MileageHistoryModel> = tables
            .mileage_history
            .iter()
            .filter(|h| h.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(history)
    }

    async fn create_oil_change(&self, oil_change: NewOilChange) -> Result<OilChangeModel> {
        let created = OilChangeModel {
            id: Uuid::new_v4(),
            vehicle_id: oil_change.vehicle_id,
            mileage_at_change: oil_change.mileage_at_change,
            date_of_change: oil_change.date_of_change,
            next_change_due_at: oil_change.next_change_due_at,
            notes: oil_change.notes,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().oil_changes.push(created.clone());
        Ok(created)
    }
}
