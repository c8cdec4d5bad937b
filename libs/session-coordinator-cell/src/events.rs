use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use room_cell::{AvailableRoom, RoomWindow};
use shared_models::formats::hhmm_option;
use shared_models::EntityId;
use staff_schedule_cell::WorkShift;
use treatment_plan_cell::TreatmentPlanBounds;

use crate::models::DraftStatus;
use crate::services::tickets::Ticket;

/// Staff member and inclusive date range a shift query covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShiftKey {
    pub staff_id: EntityId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Why a query produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailure {
    pub message: String,
}

impl QueryFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<anyhow::Error> for QueryFailure {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Input to the coordinator reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StaffChanged(Option<EntityId>),
    DateChanged(Option<NaiveDate>),
    StartTimeChanged(Option<NaiveTime>),
    EndTimeChanged(Option<NaiveTime>),
    RoomChanged(Option<EntityId>),
    NotesChanged(String),
    StatusChanged(DraftStatus),
    UserSelectedShift(EntityId),
    UserClearedShift,
    ShiftsLoaded {
        ticket: Ticket<ShiftKey>,
        result: Result<Vec<WorkShift>, QueryFailure>,
    },
    RoomsLoaded {
        ticket: Ticket<RoomWindow>,
        result: Result<Vec<AvailableRoom>, QueryFailure>,
    },
    PlanLoaded {
        ticket: Ticket<EntityId>,
        result: Result<TreatmentPlanBounds, QueryFailure>,
    },
}

/// Asynchronous work the reducer asks its driver to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchShifts(Ticket<ShiftKey>),
    FetchRooms(Ticket<RoomWindow>),
    FetchPlan(Ticket<EntityId>),
}

/// Events a form may send. Query results never come from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    StaffChanged {
        staff_id: Option<EntityId>,
    },
    DateChanged {
        date: Option<NaiveDate>,
    },
    StartTimeChanged {
        #[serde(with = "hhmm_option", default)]
        start_time: Option<NaiveTime>,
    },
    EndTimeChanged {
        #[serde(with = "hhmm_option", default)]
        end_time: Option<NaiveTime>,
    },
    RoomChanged {
        room_id: Option<EntityId>,
    },
    NotesChanged {
        notes: String,
    },
    StatusChanged {
        status: DraftStatus,
    },
    ShiftSelected {
        schedule_id: EntityId,
    },
    ShiftCleared,
}

impl From<UserEvent> for Event {
    fn from(event: UserEvent) -> Self {
        match event {
            UserEvent::StaffChanged { staff_id } => Event::StaffChanged(staff_id),
            UserEvent::DateChanged { date } => Event::DateChanged(date),
            UserEvent::StartTimeChanged { start_time } => Event::StartTimeChanged(start_time),
            UserEvent::EndTimeChanged { end_time } => Event::EndTimeChanged(end_time),
            UserEvent::RoomChanged { room_id } => Event::RoomChanged(room_id),
            UserEvent::NotesChanged { notes } => Event::NotesChanged(notes),
            UserEvent::StatusChanged { status } => Event::StatusChanged(status),
            UserEvent::ShiftSelected { schedule_id } => Event::UserSelectedShift(schedule_id),
            UserEvent::ShiftCleared => Event::UserClearedShift,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_events_parse_from_form_json() {
        let event: UserEvent =
            serde_json::from_value(json!({ "type": "start_time_changed", "start_time": "09:30" })).unwrap();
        assert_eq!(
            Event::from(event),
            Event::StartTimeChanged(NaiveTime::from_hms_opt(9, 30, 0))
        );

        let event: UserEvent =
            serde_json::from_value(json!({ "type": "staff_changed", "staff_id": 12 })).unwrap();
        assert_eq!(Event::from(event), Event::StaffChanged(Some(EntityId::from(12))));

        let event: UserEvent = serde_json::from_value(json!({ "type": "shift_cleared" })).unwrap();
        assert_eq!(Event::from(event), Event::UserClearedShift);
    }

    #[test]
    fn test_cleared_time_parses_as_none() {
        let event: UserEvent =
            serde_json::from_value(json!({ "type": "end_time_changed", "end_time": null })).unwrap();
        assert_eq!(Event::from(event), Event::EndTimeChanged(None));
    }
}
