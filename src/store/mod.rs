//! Persistence behind a trait so handlers don't care where rows live.
//!
//! Every vehicle-scoped call takes the owner's id and behaves as if rows
//! owned by someone else do not exist.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    MileageHistoryModel, NewOilChange, OilChangeModel, VehicleFields, VehicleModel,
};

#[async_trait]
pub trait Store: Send + Sync {
    /// Owner of an unexpired session, if any.
    async fn session_user(&self, token: &str) -> Result<Option<Uuid>>;

    /// `fields.name` must be set.
    async fn create_vehicle(&self, owner: Uuid, fields: VehicleFields) -> Result<VehicleModel>;

    /// Each vehicle paired with its most recent oil change.
    async fn list_vehicles(&self, owner: Uuid)
        -> Result<Vec<(VehicleModel, Option<OilChangeModel>)>>;

    async fn find_vehicle(&self, owner: Uuid, id: Uuid) -> Result<Option<VehicleModel>>;

    /// Replaces the descriptive fields; a `None` name keeps the current one.
    async fn update_vehicle(
        &self,
        owner: Uuid,
        id: Uuid,
        fields: VehicleFields,
    ) -> Result<Option<VehicleModel>>;

    /// Returns whether a row was removed.
    async fn delete_vehicle(&self, owner: Uuid, id: Uuid) -> Result<bool>;

    /// Sets the current mileage and appends one history row, atomically.
    async fn record_mileage(
        &self,
        owner: Uuid,
        id: Uuid,
        mileage: i32,
    ) -> Result<Option<VehicleModel>>;

    /// Newest first by date of change. `limit` caps the count.
    async fn oil_changes(&self, vehicle_id: Uuid, limit: Option<i64>) -> Result<Vec<OilChangeModel>>;

    /// Newest first.
    async fn mileage_history(&self, vehicle_id: Uuid) -> Result<Vec<MileageHistoryModel>>;

    /// Caller has already checked the vehicle belongs to the requester.
    async fn create_oil_change(&self, oil_change: NewOilChange) -> Result<OilChangeModel>;
}
