use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_models::formats::hhmm;
use shared_models::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftStatus {
    Active,
    InActive,
    Booked,
}

/// Appointment already attached to a shift. Only its presence matters here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAppointment {
    pub id: EntityId,
    #[serde(default)]
    pub status: Option<String>,
}

/// A staff member's working interval on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkShift {
    pub id: EntityId,
    pub staff_id: EntityId,
    pub shift_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// Advisory only; the room is re-validated for the booked window.
    #[serde(default)]
    pub room_id: Option<EntityId>,
    pub status: ShiftStatus,
    #[serde(default)]
    pub slot: Option<i32>,
    #[serde(default)]
    pub appointments: Option<Vec<LinkedAppointment>>,
}

impl WorkShift {
    /// Open for a new booking: active and nothing attached yet.
    pub fn is_eligible(&self) -> bool {
        self.status == ShiftStatus::Active
            && self.appointments.as_ref().map_or(true, |apts| apts.is_empty())
    }
}

/// Keeps only shifts open for booking, ordered by date then start time.
pub fn eligible_shifts(shifts: Vec<WorkShift>) -> Vec<WorkShift> {
    let mut eligible: Vec<WorkShift> = shifts.into_iter().filter(WorkShift::is_eligible).collect();
    eligible.sort_by(|a, b| {
        a.shift_date
            .cmp(&b.shift_date)
            .then(a.start_time.cmp(&b.start_time))
    });
    eligible
}
