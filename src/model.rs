use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::service::ServiceStatus;

pub const DEFAULT_OIL_CHANGE_INTERVAL: i32 = 3000;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub license_plate: Option<String>,
    pub oil_change_interval: i32,
    pub current_mileage: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OilChangeModel {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub mileage_at_change: i32,
    pub date_of_change: DateTime<Utc>,
    pub next_change_due_at: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MileageHistoryModel {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub mileage: i32,
    pub created_at: DateTime<Utc>,
}

/// Vehicle as returned by the list and mileage endpoints: the latest oil
/// change only, plus the derived service status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    #[serde(flatten)]
    pub vehicle: VehicleModel,
    pub oil_changes: Vec<OilChangeModel>,
    pub service_status: ServiceStatus,
}

impl VehicleSummary {
    pub fn new(vehicle: VehicleModel, last_oil_change: Option<OilChangeModel>) -> Self {
        let service_status = ServiceStatus::derive(last_oil_change.as_ref(), vehicle.current_mileage);
        Self {
            vehicle,
            oil_changes: last_oil_change.into_iter().collect(),
            service_status,
        }
    }
}

/// Vehicle with its full oil-change and mileage logs, newest first.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetail {
    #[serde(flatten)]
    pub vehicle: VehicleModel,
    pub oil_changes: Vec<OilChangeModel>,
    pub mileage_history: Vec<MileageHistoryModel>,
    pub service_status: ServiceStatus,
}

impl VehicleDetail {
    pub fn new(
        vehicle: VehicleModel,
        oil_changes: Vec<OilChangeModel>,
        mileage_history: Vec<MileageHistoryModel>,
    ) -> Self {
        let service_status = ServiceStatus::derive(oil_changes.first(), vehicle.current_mileage);
        Self {
            vehicle,
            oil_changes,
            mileage_history,
            service_status,
        }
    }
}

/// Descriptive vehicle fields, already coerced. Used for both create and
/// update since an update replaces every field.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleFields {
    pub name: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub license_plate: Option<String>,
    pub oil_change_interval: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOilChange {
    pub vehicle_id: Uuid,
    pub mileage_at_change: i32,
    pub date_of_change: DateTime<Utc>,
    pub next_change_due_at: i32,
    pub notes: Option<String>,
}

/// A number that clients may send either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    /// Empty strings and zero count as "not provided".
    pub fn is_provided(&self) -> bool {
        match self {
            NumericInput::Number(n) => *n != 0.0 && !n.is_nan(),
            NumericInput::Text(s) => !s.is_empty(),
        }
    }

    /// Base-10 integer parse that, like a lenient form field, reads the
    /// leading digits and ignores whatever follows.
    pub fn to_int(&self) -> Option<i32> {
        match self {
            NumericInput::Number(n) => {
                let truncated = n.trunc();
                if truncated >= i32::MIN as f64 && truncated <= i32::MAX as f64 {
                    Some(truncated as i32)
                } else {
                    None
                }
            }
            NumericInput::Text(s) => parse_int_prefix(s),
        }
    }
}

fn parse_int_prefix(raw: &str) -> Option<i32> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let value: i64 = rest[..digits_len].parse().ok()?;
    let value = if negative { -value } else { value };
    i32::try_from(value).ok()
}

/// Treats `null`, missing and empty strings alike.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Names the field that carried a non-numeric value.
#[derive(Debug)]
pub struct InvalidNumber(pub &'static str);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostVehicle {
    pub name: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<NumericInput>,
    pub license_plate: Option<String>,
    pub oil_change_interval: Option<NumericInput>,
}

impl PostVehicle {
    pub fn into_fields(self) -> Result<VehicleFields, InvalidNumber> {
        Ok(VehicleFields {
            name: non_empty(self.name),
            make: non_empty(self.make),
            model: non_empty(self.model),
            year: optional_int(self.year, "year")?,
            license_plate: non_empty(self.license_plate),
            oil_change_interval: optional_int(self.oil_change_interval, "oilChangeInterval")?
                .unwrap_or(DEFAULT_OIL_CHANGE_INTERVAL),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchMileage {
    pub current_mileage: Option<NumericInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostOilChange {
    pub vehicle_id: Option<String>,
    pub mileage_at_change: Option<NumericInput>,
    pub date_of_change: Option<String>,
    pub notes: Option<String>,
}

impl PostOilChange {
    pub fn notes(&self) -> Option<String> {
        non_empty(self.notes.clone())
    }

    /// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
    /// Missing or empty means "now".
    pub fn date_of_change(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.date_of_change.as_deref() {
            None | Some("") => Some(now),
            Some(raw) => parse_date(raw),
        }
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Coerces an optional numeric field; an unprovided value is `None`, a
/// provided value that is not a number is an error.
pub fn optional_int(
    value: Option<NumericInput>,
    field: &'static str,
) -> Result<Option<i32>, InvalidNumber> {
    match value {
        Some(v) if v.is_provided() => v.to_int().map(Some).ok_or(InvalidNumber(field)),
        _ => Ok(None),
    }
}
