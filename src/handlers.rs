use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use chrono::Utc;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, Context};
use crate::model::*;
use crate::service::next_due_mileage;
use crate::AppState;

const VEHICLE_NOT_FOUND: &str = "Vehicle not found";

/// Ids that don't parse can't belong to the caller either.
fn vehicle_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(VEHICLE_NOT_FOUND))
}

/// Bodies are decoded only after the session check, so a bad session wins
/// over a bad body.
fn json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("Invalid JSON body: {err}")))
}

fn invalid_number(err: InvalidNumber) -> ApiError {
    ApiError::bad_request(format!("{} must be a number", err.0))
}

#[get("/")]
async fn index() -> impl Responder {
    "Oil change tracker is running"
}

#[post("/api/vehicles")]
async fn post_vehicle(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let request: PostVehicle = json_body(&body)?;
    let fields = request.into_fields().map_err(invalid_number)?;
    if fields.name.is_none() {
        return Err(ApiError::bad_request("Vehicle name is required"));
    }

    let vehicle = data
        .store
        .create_vehicle(user.id, fields)
        .await
        .context("VEHICLES_POST")?;

    log::info!("vehicle {} created", vehicle.id);
    Ok(HttpResponse::Created().json(vehicle))
}

#[get("/api/vehicles")]
async fn get_vehicles(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let vehicles: Vec<VehicleSummary> = data
        .store
        .list_vehicles(user.id)
        .await
        .context("VEHICLES_GET")?
        .into_iter()
        .map(|(vehicle, last)| VehicleSummary::new(vehicle, last))
        .collect();

    Ok(HttpResponse::Ok().json(vehicles))
}

#[get("/api/vehicles/{id}")]
async fn get_vehicle_by_id(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, ApiError> {
    let id = vehicle_id(&path.into_inner().0)?;

    let vehicle = data
        .store
        .find_vehicle(user.id, id)
        .await
        .context("VEHICLE_GET")?
        .ok_or(ApiError::NotFound(VEHICLE_NOT_FOUND))?;
    let oil_changes = data.store.oil_changes(id, None).await.context("VEHICLE_GET")?;
    let mileage_history = data.store.mileage_history(id).await.context("VEHICLE_GET")?;

    Ok(HttpResponse::Ok().json(VehicleDetail::new(vehicle, oil_changes, mileage_history)))
}

#[patch("/api/vehicles/{id}")]
async fn patch_vehicle(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(String,)>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let id = vehicle_id(&path.into_inner().0)?;
    let request: PostVehicle = json_body(&body)?;
    let fields = request.into_fields().map_err(invalid_number)?;

    let vehicle = data
        .store
        .update_vehicle(user.id, id, fields)
        .await
        .context("VEHICLE_PATCH")?
        .ok_or(ApiError::NotFound(VEHICLE_NOT_FOUND))?;

    Ok(HttpResponse::Ok().json(vehicle))
}

#[delete("/api/vehicles/{id}")]
async fn delete_vehicle_by_id(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, ApiError> {
    let id = vehicle_id(&path.into_inner().0)?;

    let removed = data
        .store
        .delete_vehicle(user.id, id)
        .await
        .context("VEHICLE_DELETE")?;

    if removed {
        log::info!("vehicle {} deleted", id);
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::NotFound(VEHICLE_NOT_FOUND))
    }
}

#[patch("/api/vehicles/{id}/mileage")]
async fn patch_vehicle_mileage(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(String,)>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let id = vehicle_id(&path.into_inner().0)?;
    let request: PatchMileage = json_body(&body)?;
    let mileage = optional_int(request.current_mileage, "currentMileage")
        .map_err(invalid_number)?
        .ok_or_else(|| ApiError::bad_request("Current mileage is required"))?;

    let vehicle = data
        .store
        .record_mileage(user.id, id, mileage)
        .await
        .context("VEHICLE_MILEAGE_PATCH")?
        .ok_or(ApiError::NotFound(VEHICLE_NOT_FOUND))?;
    let last = data
        .store
        .oil_changes(id, Some(1))
        .await
        .context("VEHICLE_MILEAGE_PATCH")?
        .into_iter()
        .next();

    Ok(HttpResponse::Ok().json(VehicleSummary::new(vehicle, last)))
}

#[post("/api/oil-changes")]
async fn post_oil_change(
    data: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let request: PostOilChange = json_body(&body)?;
    let raw_vehicle_id = request.vehicle_id.as_deref().filter(|id| !id.is_empty());
    let mileage_at_change = optional_int(request.mileage_at_change.clone(), "mileageAtChange")
        .map_err(invalid_number)?;
    let (Some(raw_vehicle_id), Some(mileage_at_change)) = (raw_vehicle_id, mileage_at_change) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };
    let date_of_change = request
        .date_of_change(Utc::now())
        .ok_or_else(|| ApiError::bad_request("dateOfChange must be a date"))?;

    let vehicle = data
        .store
        .find_vehicle(user.id, vehicle_id(raw_vehicle_id)?)
        .await
        .context("OIL_CHANGES_POST")?
        .ok_or(ApiError::NotFound(VEHICLE_NOT_FOUND))?;

    let next_change_due_at = next_due_mileage(mileage_at_change, vehicle.oil_change_interval)
        .ok_or_else(|| ApiError::bad_request("mileageAtChange is out of range"))?;

    let oil_change = data
        .store
        .create_oil_change(NewOilChange {
            vehicle_id: vehicle.id,
            mileage_at_change,
            date_of_change,
            next_change_due_at,
            notes: request.notes(),
        })
        .await
        .context("OIL_CHANGES_POST")?;

    log::info!(
        "oil change recorded for vehicle {} at {} miles, next due at {}",
        vehicle.id,
        mileage_at_change,
        next_change_due_at
    );
    Ok(HttpResponse::Created().json(oil_change))
}

/// Registers every route on an app or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(post_vehicle)
        .service(get_vehicles)
        .service(get_vehicle_by_id)
        .service(patch_vehicle)
        .service(delete_vehicle_by_id)
        .service(patch_vehicle_mileage)
        .service(post_oil_change);
}
