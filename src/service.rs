//! Due-mileage derivation for oil changes.

use std::fmt;

use serde::Serialize;

use crate::model::OilChangeModel;

/// Miles before the due mileage at which a vehicle is flagged.
pub const SERVICE_SOON_THRESHOLD: i32 = 200;

/// Mileage at which the next oil change falls due. `None` when the sum does
/// not fit the column type.
pub fn next_due_mileage(mileage_at_change: i32, oil_change_interval: i32) -> Option<i32> {
    mileage_at_change.checked_add(oil_change_interval)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub miles_until_next: Option<i32>,
    pub needs_service: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DueDisplay>,
    /// Rendered `due`, e.g. "1,250 miles overdue".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ServiceStatus {
    /// `last_oil_change` must be the most recent change by date of change.
    pub fn derive(last_oil_change: Option<&OilChangeModel>, current_mileage: Option<i32>) -> Self {
        let miles_until_next = match (last_oil_change, current_mileage) {
            (Some(change), Some(current)) => {
                Some(change.next_change_due_at.saturating_sub(current))
            }
            _ => None,
        };
        let due = miles_until_next.map(DueDisplay::from_miles);
        Self {
            miles_until_next,
            needs_service: miles_until_next.is_some_and(|m| m <= SERVICE_SOON_THRESHOLD),
            due,
            label: due.map(|d| d.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "miles", rename_all = "camelCase")]
pub enum DueDisplay {
    Remaining(u32),
    Overdue(u32),
}

impl DueDisplay {
    pub fn from_miles(miles_until_next: i32) -> Self {
        if miles_until_next > 0 {
            DueDisplay::Remaining(miles_until_next.unsigned_abs())
        } else {
            DueDisplay::Overdue(miles_until_next.unsigned_abs())
        }
    }
}

impl fmt::Display for DueDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDisplay::Remaining(m) => write!(f, "{} miles remaining", group_thousands(*m)),
            DueDisplay::Overdue(m) => write!(f, "{} miles overdue", group_thousands(*m)),
        }
    }
}

fn group_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
