use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use room_cell::AvailableRoom;
use shared_models::auth::{ActorRole, User};
use shared_models::formats::{hhmm, hhmm_option};
use shared_models::EntityId;
use staff_schedule_cell::WorkShift;
use treatment_plan_cell::TreatmentPlanBounds;

// ==============================================================================
// FLOW CONFIGURATION
// ==============================================================================

/// Which booking form the coordinator backs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowVariant {
    /// Assigning a staff schedule to an appointment.
    Appointment,
    /// Scheduling one session of a treatment plan.
    TreatmentSession { plan_id: EntityId },
}

impl FlowVariant {
    pub fn plan_id(&self) -> Option<&EntityId> {
        match self {
            FlowVariant::Appointment => None,
            FlowVariant::TreatmentSession { plan_id } => Some(plan_id),
        }
    }

    /// Upstream collection the draft is committed to.
    pub fn resource_path(&self) -> &'static str {
        match self {
            FlowVariant::Appointment => "/appointments",
            FlowVariant::TreatmentSession { .. } => "/treatment-sessions",
        }
    }
}

/// How candidate shifts are looked up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftLookup {
    /// Shifts on the draft's date only.
    #[default]
    SameDay,
    /// Shifts anywhere in the treatment plan's window; selecting one also
    /// fills the date.
    PlanWindow,
}

/// What the acting user may change on a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    pub role: ActorRole,
    pub actor_staff_id: Option<EntityId>,
}

impl Permissions {
    pub fn new(role: ActorRole, actor_staff_id: Option<EntityId>) -> Self {
        Self { role, actor_staff_id }
    }

    pub fn for_user(user: &User) -> Self {
        Self::new(user.actor_role(), user.staff_id.clone().map(EntityId::from))
    }

    pub fn can_change_staff(&self, target: Option<&EntityId>) -> bool {
        if self.role.is_privileged() {
            return true;
        }
        match (self.role, &self.actor_staff_id) {
            (ActorRole::Staff, Some(own)) => target == Some(own),
            _ => false,
        }
    }

    pub fn can_change_status(&self) -> bool {
        self.role.is_privileged()
    }

    /// Staff id a new draft starts with for this user.
    pub fn pinned_staff(&self) -> Option<&EntityId> {
        match self.role {
            ActorRole::Staff => self.actor_staff_id.as_ref(),
            _ => None,
        }
    }
}

// ==============================================================================
// DRAFT
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

/// In-progress, unsaved booking form state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionDraft {
    pub staff_id: Option<EntityId>,
    pub date: Option<NaiveDate>,
    #[serde(with = "hhmm_option")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "hhmm_option")]
    pub end_time: Option<NaiveTime>,
    pub room_id: Option<EntityId>,
    pub schedule_id: Option<EntityId>,
    pub notes: String,
    pub status: DraftStatus,
    /// Time and room (and date for plan-window lookups) follow the selected
    /// shift while set.
    #[serde(skip_deserializing)]
    pub locked: bool,
}

impl SessionDraft {
    pub fn time_window(&self) -> Option<(NaiveDate, NaiveTime, NaiveTime)> {
        match (self.date, self.start_time, self.end_time) {
            (Some(date), Some(start), Some(end)) => Some((date, start, end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// Staff or date missing.
    Empty,
    /// Shift query in flight.
    Searching,
    /// One shift selected, fields locked.
    AutoFilled,
    /// Several eligible shifts, waiting for the user to pick.
    NeedsChoice,
    /// No eligible shift or selection cleared; free entry.
    Manual,
}

impl CoordinatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorState::Empty => "empty",
            CoordinatorState::Searching => "searching",
            CoordinatorState::AutoFilled => "auto_filled",
            CoordinatorState::NeedsChoice => "needs_choice",
            CoordinatorState::Manual => "manual",
        }
    }
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// NOTICES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeCode {
    ScheduleAutoFilled,
    ScheduleSelected,
    ScheduleNoLongerListed,
    AmbiguousSchedules,
    NoSchedules,
    ScheduleQueryFailed,
    RoomQueryFailed,
    RoomUnavailable,
    PlanQueryFailed,
    OutsidePlanBounds,
    NotPermitted,
    SubmissionRejected,
}

/// Transient notification for the form; drained with each snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub code: NoticeCode,
    pub message: String,
}

impl Notice {
    pub fn info(code: NoticeCode, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, code, message: message.into() }
    }

    pub fn warning(code: NoticeCode, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, code, message: message.into() }
    }

    pub fn error(code: NoticeCode, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, code, message: message.into() }
    }
}

// ==============================================================================
// SUBMISSION
// ==============================================================================

/// Body of the create/update request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub staff_id: EntityId,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub room_id: EntityId,
    /// Always present on the wire; `null` for manual entries.
    pub schedule_id: Option<EntityId>,
    pub notes: String,
    pub status: DraftStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_plan_id: Option<EntityId>,
}

/// A validated draft ready to be sent upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub variant: FlowVariant,
    /// Set when updating an existing appointment/session.
    pub editing: Option<EntityId>,
    pub payload: SubmissionPayload,
}

// ==============================================================================
// SNAPSHOT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomCheckStatus {
    /// Date and time range not complete yet.
    NotApplicable,
    Pending,
    Available,
    Unavailable,
    /// Window known, no room chosen yet.
    NoRoomSelected,
}

/// Everything a form needs to render the draft.
#[derive(Debug, Clone, Serialize)]
pub struct DraftSnapshot {
    pub state: CoordinatorState,
    pub variant: FlowVariant,
    pub editing: Option<EntityId>,
    pub draft: SessionDraft,
    pub candidates: Vec<WorkShift>,
    pub room_options: Vec<AvailableRoom>,
    pub room_check: RoomCheckStatus,
    pub plan: Option<TreatmentPlanBounds>,
    pub notices: Vec<Notice>,
    pub can_submit: bool,
    pub blocking_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_staff_role_may_only_pick_itself() {
        let own = EntityId::from("staff-1");
        let perms = Permissions::new(ActorRole::Staff, Some(own.clone()));

        assert!(perms.can_change_staff(Some(&own)));
        assert!(!perms.can_change_staff(Some(&EntityId::from("staff-2"))));
        assert!(!perms.can_change_staff(None));
        assert!(!perms.can_change_status());
        assert_eq!(perms.pinned_staff(), Some(&own));
    }

    #[test]
    fn test_manager_may_change_anything() {
        let perms = Permissions::new(ActorRole::Manager, None);
        assert!(perms.can_change_staff(Some(&EntityId::from("staff-2"))));
        assert!(perms.can_change_staff(None));
        assert!(perms.can_change_status());
        assert!(perms.pinned_staff().is_none());
    }

    #[test]
    fn test_unknown_role_cannot_pick_staff() {
        let perms = Permissions::new(ActorRole::Unknown, Some(EntityId::from("staff-1")));
        assert!(!perms.can_change_staff(Some(&EntityId::from("staff-1"))));
    }

    #[test]
    fn test_variant_wire_shape() {
        let variant: FlowVariant =
            serde_json::from_value(json!({ "kind": "treatment_session", "plan_id": 4 })).unwrap();
        assert_eq!(variant.plan_id(), Some(&EntityId::from(4)));
        assert_eq!(variant.resource_path(), "/treatment-sessions");
    }

    #[test]
    fn test_seed_ignores_client_supplied_lock() {
        let draft: SessionDraft = serde_json::from_value(json!({
            "staffId": "staff-1",
            "date": "2024-05-01",
            "startTime": "09:00",
            "locked": true
        }))
        .unwrap();

        assert!(!draft.locked);
        assert!(draft.end_time.is_none());
        assert_eq!(draft.status, DraftStatus::Scheduled);
    }

    #[test]
    fn test_payload_always_carries_schedule_id() {
        let payload = SubmissionPayload {
            staff_id: EntityId::from("staff-1"),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            room_id: EntityId::from(3),
            schedule_id: None,
            notes: String::new(),
            status: DraftStatus::Scheduled,
            treatment_plan_id: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["scheduleId"].is_null());
        assert!(json.get("treatmentPlanId").is_none());
        assert_eq!(json["startTime"], "09:00");
        assert_eq!(json["date"], "2024-05-01");
    }
}
