use chrono::NaiveDate;
use tracing::{debug, info, warn};

use room_cell::{AvailableRoom, RoomWindow};
use shared_models::formats::format_time;
use shared_models::EntityId;
use staff_schedule_cell::{eligible_shifts, WorkShift};
use treatment_plan_cell::TreatmentPlanBounds;

use crate::error::ValidationError;
use crate::events::{Command, Event, QueryFailure, ShiftKey};
use crate::models::{
    CoordinatorState, DraftSnapshot, FlowVariant, Notice, NoticeCode, Permissions,
    RoomCheckStatus, SessionDraft, ShiftLookup, SubmissionPayload, SubmissionRequest,
};
use crate::services::tickets::{RequestChannel, Ticket};

/// How a draft is opened.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub variant: FlowVariant,
    pub lookup: ShiftLookup,
    pub permissions: Permissions,
    /// Id of the appointment/session being edited, if any.
    pub editing: Option<EntityId>,
    /// Pre-filled values: the entity being edited, or a calendar click.
    pub seed: Option<SessionDraft>,
}

impl CoordinatorOptions {
    pub fn new(variant: FlowVariant, permissions: Permissions) -> Self {
        Self {
            variant,
            lookup: ShiftLookup::default(),
            permissions,
            editing: None,
            seed: None,
        }
    }

    pub fn with_lookup(mut self, lookup: ShiftLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn editing(mut self, id: EntityId, existing: SessionDraft) -> Self {
        self.editing = Some(id);
        self.seed = Some(existing);
        self
    }

    pub fn with_seed(mut self, seed: SessionDraft) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RoomCheck {
    Idle,
    Pending(RoomWindow),
    Loaded {
        window: RoomWindow,
        rooms: Vec<AvailableRoom>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum PlanState {
    NotApplicable,
    Pending,
    Loaded(TreatmentPlanBounds),
    /// The plan query failed; bounds are left to the server.
    Unavailable,
}

/// Reconciles staff shifts, room availability and plan bounds into one
/// bookable draft.
///
/// The coordinator never performs I/O. [`dispatch`](Self::dispatch) applies
/// one [`Event`] and returns the [`Command`]s that should run next; their
/// results come back as `*Loaded` events carrying the ticket they answer.
#[derive(Debug)]
pub struct AvailabilityCoordinator {
    variant: FlowVariant,
    lookup: ShiftLookup,
    permissions: Permissions,
    editing: Option<EntityId>,
    state: CoordinatorState,
    draft: SessionDraft,
    candidates: Vec<WorkShift>,
    rooms: RoomCheck,
    plan: PlanState,
    shift_requests: RequestChannel<ShiftKey>,
    room_requests: RequestChannel<RoomWindow>,
    plan_requests: RequestChannel<EntityId>,
    /// Room and window the edited booking already occupies. Availability
    /// results leave that room out, so it is trusted for this exact window.
    held_room: Option<(RoomWindow, EntityId)>,
    notices: Vec<Notice>,
}

impl AvailabilityCoordinator {
    /// Opens a draft and returns the queries it needs to start with.
    pub fn open(options: CoordinatorOptions) -> (Self, Vec<Command>) {
        let CoordinatorOptions {
            variant,
            lookup,
            permissions,
            editing,
            seed,
        } = options;

        let mut draft = seed.unwrap_or_default();
        draft.locked = false;
        if draft.staff_id.is_none() {
            draft.staff_id = permissions.pinned_staff().cloned();
        }

        let plan = match variant {
            FlowVariant::Appointment => PlanState::NotApplicable,
            FlowVariant::TreatmentSession { .. } => PlanState::Pending,
        };

        let mut coordinator = Self {
            variant,
            // Plan-window lookups need a plan to look in.
            lookup: match plan {
                PlanState::NotApplicable => ShiftLookup::SameDay,
                _ => lookup,
            },
            permissions,
            editing,
            state: CoordinatorState::Empty,
            draft,
            candidates: Vec::new(),
            rooms: RoomCheck::Idle,
            plan,
            shift_requests: RequestChannel::new(),
            room_requests: RequestChannel::new(),
            plan_requests: RequestChannel::new(),
            held_room: None,
            notices: Vec::new(),
        };

        let mut commands = Vec::new();

        if let Some(plan_id) = coordinator.variant.plan_id().cloned() {
            commands.push(Command::FetchPlan(coordinator.plan_requests.issue(plan_id)));
        }

        if coordinator.editing.is_some() {
            coordinator.held_room = coordinator
                .current_window()
                .zip(coordinator.draft.room_id.clone());
            // The edited entity's own shift is booked by that entity, so it
            // would never come back as eligible; keep the stored linkage.
            coordinator.state = if coordinator.draft.schedule_id.is_some() {
                coordinator.draft.locked = true;
                CoordinatorState::AutoFilled
            } else if coordinator.has_search_inputs() {
                CoordinatorState::Manual
            } else {
                CoordinatorState::Empty
            };
        } else {
            coordinator.draft.schedule_id = None;
            commands.extend(coordinator.search());
        }

        commands.extend(coordinator.refresh_rooms());

        debug!(
            "Opened {:?} draft in state {} with {} initial commands",
            coordinator.variant,
            coordinator.state,
            commands.len()
        );

        (coordinator, commands)
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn draft(&self) -> &SessionDraft {
        &self.draft
    }

    pub fn variant(&self) -> &FlowVariant {
        &self.variant
    }

    pub fn candidates(&self) -> &[WorkShift] {
        &self.candidates
    }

    pub fn plan_bounds(&self) -> Option<&TreatmentPlanBounds> {
        match &self.plan {
            PlanState::Loaded(bounds) => Some(bounds),
            _ => None,
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Applies one event and returns the queries to run next.
    pub fn dispatch(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::StaffChanged(staff_id) => self.on_staff_changed(staff_id),
            Event::DateChanged(date) => self.on_date_changed(date),
            Event::StartTimeChanged(time) => {
                if self.ignore_locked_edit("start time") {
                    return Vec::new();
                }
                self.draft.start_time = time;
                self.refresh_rooms()
            }
            Event::EndTimeChanged(time) => {
                if self.ignore_locked_edit("end time") {
                    return Vec::new();
                }
                self.draft.end_time = time;
                self.refresh_rooms()
            }
            Event::RoomChanged(room_id) => {
                if !self.ignore_locked_edit("room") {
                    self.draft.room_id = room_id;
                    self.warn_if_room_unavailable();
                }
                Vec::new()
            }
            Event::NotesChanged(notes) => {
                self.draft.notes = notes;
                Vec::new()
            }
            Event::StatusChanged(status) => {
                if self.permissions.can_change_status() {
                    self.draft.status = status;
                } else {
                    self.notices.push(Notice::warning(
                        NoticeCode::NotPermitted,
                        "You are not allowed to change the booking status",
                    ));
                }
                Vec::new()
            }
            Event::UserSelectedShift(schedule_id) => self.on_shift_selected(&schedule_id),
            Event::UserClearedShift => self.on_shift_cleared(),
            Event::ShiftsLoaded { ticket, result } => self.on_shifts_loaded(ticket, result),
            Event::RoomsLoaded { ticket, result } => {
                self.on_rooms_loaded(ticket, result);
                Vec::new()
            }
            Event::PlanLoaded { ticket, result } => self.on_plan_loaded(ticket, result),
        }
    }

    // ==========================================================================
    // FIELD EDITS
    // ==========================================================================

    fn on_staff_changed(&mut self, staff_id: Option<EntityId>) -> Vec<Command> {
        if staff_id == self.draft.staff_id {
            return Vec::new();
        }
        if !self.permissions.can_change_staff(staff_id.as_ref()) {
            warn!("Ignoring staff change to {:?}: not permitted for {:?}", staff_id, self.permissions.role);
            self.notices.push(Notice::warning(
                NoticeCode::NotPermitted,
                "You can only book sessions for yourself",
            ));
            return Vec::new();
        }

        self.draft.staff_id = staff_id;
        self.reset_selection();

        let mut commands = self.search();
        commands.extend(self.refresh_rooms());
        commands
    }

    fn on_date_changed(&mut self, date: Option<NaiveDate>) -> Vec<Command> {
        if date == self.draft.date {
            return Vec::new();
        }
        if self.lookup == ShiftLookup::PlanWindow && self.draft.locked {
            debug!("Ignoring date edit: date follows the selected shift");
            return Vec::new();
        }

        self.draft.date = date;
        self.warn_if_outside_plan();

        let mut commands = match self.lookup {
            ShiftLookup::SameDay => {
                self.reset_selection();
                self.search()
            }
            // Candidates span the whole plan window; a new date does not
            // change them, but manual entries for the old date go.
            ShiftLookup::PlanWindow => {
                self.clear_copied_fields();
                Vec::new()
            }
        };
        commands.extend(self.refresh_rooms());
        commands
    }

    fn ignore_locked_edit(&self, field: &str) -> bool {
        if self.draft.locked {
            debug!("Ignoring {} edit: locked to schedule {:?}", field, self.draft.schedule_id);
        }
        self.draft.locked
    }

    fn on_shift_selected(&mut self, schedule_id: &EntityId) -> Vec<Command> {
        if self.draft.locked && self.draft.schedule_id.as_ref() == Some(schedule_id) {
            return Vec::new();
        }

        let Some(shift) = self.candidates.iter().find(|s| &s.id == schedule_id).cloned() else {
            self.notices.push(Notice::warning(
                NoticeCode::ScheduleNoLongerListed,
                "That schedule is no longer available; pick another or enter the time manually",
            ));
            return Vec::new();
        };

        self.apply_shift(&shift);
        self.notices.push(Notice::info(
            NoticeCode::ScheduleSelected,
            format!(
                "Schedule {}-{} selected",
                format_time(shift.start_time),
                format_time(shift.end_time)
            ),
        ));
        self.refresh_rooms()
    }

    fn on_shift_cleared(&mut self) -> Vec<Command> {
        if !self.draft.locked && self.draft.schedule_id.is_none() {
            return Vec::new();
        }

        self.clear_copied_fields();
        if matches!(self.state, CoordinatorState::AutoFilled | CoordinatorState::NeedsChoice) {
            self.state = CoordinatorState::Manual;
        }
        self.refresh_rooms()
    }

    // ==========================================================================
    // QUERY RESULTS
    // ==========================================================================

    fn on_shifts_loaded(
        &mut self,
        ticket: Ticket<ShiftKey>,
        result: Result<Vec<WorkShift>, QueryFailure>,
    ) -> Vec<Command> {
        if !self.shift_requests.accept(&ticket) {
            debug!(
                "Discarding stale shifts for staff {} ({}..{}), generation {}",
                ticket.key.staff_id,
                ticket.key.start_date,
                ticket.key.end_date,
                ticket.generation.value()
            );
            return Vec::new();
        }

        let shifts = match result {
            Ok(shifts) => eligible_shifts(shifts),
            Err(failure) => {
                warn!("Staff schedule query failed: {}", failure.message);
                self.candidates.clear();
                self.clear_copied_fields();
                self.state = CoordinatorState::Manual;
                self.notices.push(Notice::warning(
                    NoticeCode::ScheduleQueryFailed,
                    "Could not load staff schedules; enter the time and room manually",
                ));
                return self.refresh_rooms();
            }
        };

        self.candidates = shifts;

        match self.candidates.len() {
            1 => {
                let shift = self.candidates[0].clone();
                self.apply_shift(&shift);
                info!("Auto-filled schedule {} for staff {}", shift.id, shift.staff_id);
                self.notices.push(Notice::info(
                    NoticeCode::ScheduleAutoFilled,
                    "Schedule automatically filled in",
                ));
            }
            0 => {
                self.clear_copied_fields();
                self.state = CoordinatorState::Manual;
                self.notices.push(Notice::warning(
                    NoticeCode::NoSchedules,
                    "No available schedules for this staff member; enter the time and room manually",
                ));
            }
            count => {
                self.clear_copied_fields();
                self.state = CoordinatorState::NeedsChoice;
                self.notices.push(Notice::warning(
                    NoticeCode::AmbiguousSchedules,
                    format!(
                        "Found {} available schedules; choose one from the list or enter the time manually",
                        count
                    ),
                ));
            }
        }

        self.refresh_rooms()
    }

    fn on_rooms_loaded(
        &mut self,
        ticket: Ticket<RoomWindow>,
        result: Result<Vec<AvailableRoom>, QueryFailure>,
    ) {
        if !self.room_requests.accept(&ticket) {
            debug!("Discarding stale rooms for {:?}", ticket.key);
            return;
        }

        let rooms = result.unwrap_or_else(|failure| {
            warn!("Room availability query failed: {}", failure.message);
            self.notices.push(Notice::warning(
                NoticeCode::RoomQueryFailed,
                "Could not check room availability for this time",
            ));
            Vec::new()
        });

        self.rooms = RoomCheck::Loaded {
            window: ticket.key,
            rooms,
        };
        self.warn_if_room_unavailable();
    }

    fn on_plan_loaded(
        &mut self,
        ticket: Ticket<EntityId>,
        result: Result<TreatmentPlanBounds, QueryFailure>,
    ) -> Vec<Command> {
        if !self.plan_requests.accept(&ticket) {
            debug!("Discarding stale plan {}", ticket.key);
            return Vec::new();
        }

        // Plan-window lookups wait for the bounds before searching.
        let waiting = self.lookup == ShiftLookup::PlanWindow
            && self.editing.is_none()
            && self.draft.schedule_id.is_none()
            && matches!(self.state, CoordinatorState::Searching | CoordinatorState::Empty);

        match result {
            Ok(bounds) => {
                self.plan = PlanState::Loaded(bounds);
                self.warn_if_outside_plan();
            }
            Err(failure) => {
                warn!("Treatment plan {} query failed: {}", ticket.key, failure.message);
                self.plan = PlanState::Unavailable;
                self.notices.push(Notice::warning(
                    NoticeCode::PlanQueryFailed,
                    "Could not load the treatment plan dates",
                ));
                if self.lookup == ShiftLookup::PlanWindow && !self.draft.locked {
                    debug!("No plan window to search; falling back to same-day lookup");
                    self.lookup = ShiftLookup::SameDay;
                }
            }
        }

        if waiting {
            let mut commands = self.search();
            commands.extend(self.refresh_rooms());
            return commands;
        }
        Vec::new()
    }

    // ==========================================================================
    // INTERNALS
    // ==========================================================================

    fn has_search_inputs(&self) -> bool {
        self.draft.staff_id.is_some() && self.draft.date.is_some()
    }

    /// Range of dates shifts are looked up in, if it can be known yet.
    fn search_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.lookup, &self.plan) {
            (ShiftLookup::PlanWindow, PlanState::Loaded(bounds)) => {
                Some((bounds.start_date, bounds.end_date))
            }
            (ShiftLookup::PlanWindow, _) => None,
            (ShiftLookup::SameDay, _) => self.draft.date.map(|date| (date, date)),
        }
    }

    /// Starts a shift search for the current staff/date, or settles in
    /// `Empty` when inputs are missing.
    fn search(&mut self) -> Vec<Command> {
        self.shift_requests.invalidate();
        self.candidates.clear();

        let Some(staff_id) = self.draft.staff_id.clone() else {
            self.state = CoordinatorState::Empty;
            return Vec::new();
        };

        if self.lookup == ShiftLookup::PlanWindow && self.plan == PlanState::Pending {
            self.state = CoordinatorState::Searching;
            return Vec::new();
        }

        let Some((start_date, end_date)) = self.search_range() else {
            self.state = CoordinatorState::Empty;
            return Vec::new();
        };

        self.state = CoordinatorState::Searching;
        let ticket = self.shift_requests.issue(ShiftKey {
            staff_id,
            start_date,
            end_date,
        });
        vec![Command::FetchShifts(ticket)]
    }

    /// Drops any selection and the values copied from it.
    fn reset_selection(&mut self) {
        self.clear_copied_fields();
        self.candidates.clear();
        self.shift_requests.invalidate();
    }

    fn clear_copied_fields(&mut self) {
        if self.lookup == ShiftLookup::PlanWindow && self.draft.locked {
            self.draft.date = None;
        }
        self.draft.start_time = None;
        self.draft.end_time = None;
        self.draft.room_id = None;
        self.draft.schedule_id = None;
        self.draft.locked = false;
    }

    fn apply_shift(&mut self, shift: &WorkShift) {
        if self.lookup == ShiftLookup::PlanWindow {
            self.draft.date = Some(shift.shift_date);
        }
        self.draft.start_time = Some(shift.start_time);
        self.draft.end_time = Some(shift.end_time);
        self.draft.room_id = shift.room_id.clone();
        self.draft.schedule_id = Some(shift.id.clone());
        self.draft.locked = true;
        self.state = CoordinatorState::AutoFilled;
    }

    fn current_window(&self) -> Option<RoomWindow> {
        self.draft
            .time_window()
            .map(|(date, start, end)| RoomWindow::on(date, start, end))
            .filter(RoomWindow::is_well_formed)
    }

    /// Re-queries rooms whenever the booked window changes.
    fn refresh_rooms(&mut self) -> Vec<Command> {
        let Some(window) = self.current_window() else {
            self.rooms = RoomCheck::Idle;
            self.room_requests.invalidate();
            return Vec::new();
        };

        let already_tracked = match &self.rooms {
            RoomCheck::Pending(pending) => *pending == window,
            RoomCheck::Loaded { window: loaded, .. } => *loaded == window,
            RoomCheck::Idle => false,
        };
        if already_tracked {
            return Vec::new();
        }

        self.rooms = RoomCheck::Pending(window);
        vec![Command::FetchRooms(self.room_requests.issue(window))]
    }

    fn selected_room_available(&self) -> Option<bool> {
        let room_id = self.draft.room_id.as_ref()?;
        match &self.rooms {
            RoomCheck::Loaded { window, rooms } => Some(
                rooms.iter().any(|room| &room.id == room_id)
                    || self.held_room.as_ref() == Some(&(*window, room_id.clone())),
            ),
            _ => None,
        }
    }

    fn warn_if_room_unavailable(&mut self) {
        if self.selected_room_available() == Some(false) {
            if let Some(room_id) = &self.draft.room_id {
                self.notices.push(Notice::warning(
                    NoticeCode::RoomUnavailable,
                    format!("Room {} is not available for the selected time", room_id),
                ));
            }
        }
    }

    fn warn_if_outside_plan(&mut self) {
        let (Some(bounds), Some(date)) = (self.plan_bounds(), self.draft.date) else {
            return;
        };
        if let Err(violation) = bounds.check(date) {
            let message = violation.to_string();
            self.notices.push(Notice::warning(NoticeCode::OutsidePlanBounds, message));
        }
    }

    fn room_check_status(&self) -> RoomCheckStatus {
        match (&self.rooms, self.selected_room_available()) {
            (RoomCheck::Idle, _) => RoomCheckStatus::NotApplicable,
            (RoomCheck::Pending(_), _) => RoomCheckStatus::Pending,
            (RoomCheck::Loaded { .. }, None) => RoomCheckStatus::NoRoomSelected,
            (RoomCheck::Loaded { .. }, Some(true)) => RoomCheckStatus::Available,
            (RoomCheck::Loaded { .. }, Some(false)) => RoomCheckStatus::Unavailable,
        }
    }

    /// Rooms free for the current window. Empty when the selected room is
    /// not among them: nothing on offer is trusted until the window changes
    /// or another room is picked from a fresh result.
    pub fn room_options(&self) -> Vec<AvailableRoom> {
        match (&self.rooms, self.selected_room_available()) {
            (RoomCheck::Loaded { rooms, .. }, Some(true) | None) => rooms.clone(),
            _ => Vec::new(),
        }
    }

    // ==========================================================================
    // SUBMISSION
    // ==========================================================================

    /// Checks the draft locally and builds the upstream request.
    pub fn prepare_submission(&self) -> Result<SubmissionRequest, ValidationError> {
        let draft = &self.draft;

        let mut missing = Vec::new();
        if draft.staff_id.is_none() {
            missing.push("staff");
        }
        if draft.room_id.is_none() {
            missing.push("room");
        }
        if draft.date.is_none() {
            missing.push("date");
        }
        if draft.start_time.is_none() {
            missing.push("start time");
        }
        if draft.end_time.is_none() {
            missing.push("end time");
        }

        let (Some(staff_id), Some(room_id), Some(date), Some(start), Some(end)) = (
            draft.staff_id.clone(),
            draft.room_id.clone(),
            draft.date,
            draft.start_time,
            draft.end_time,
        ) else {
            return Err(ValidationError::MissingFields(missing));
        };

        if start >= end {
            return Err(ValidationError::TimeRangeBackwards { start, end });
        }

        match &self.plan {
            PlanState::Loaded(bounds) => bounds.check(date)?,
            PlanState::Pending => return Err(ValidationError::PlanCheckPending),
            PlanState::Unavailable | PlanState::NotApplicable => {}
        }

        if matches!(self.state, CoordinatorState::Searching | CoordinatorState::Empty) {
            return Err(ValidationError::NotSubmittable(self.state));
        }

        match self.selected_room_available() {
            Some(true) => {}
            Some(false) => {
                return Err(ValidationError::RoomUnavailable {
                    room_id,
                    date,
                    start,
                    end,
                })
            }
            None => return Err(ValidationError::RoomCheckPending),
        }

        Ok(SubmissionRequest {
            variant: self.variant.clone(),
            editing: self.editing.clone(),
            payload: SubmissionPayload {
                staff_id,
                date,
                start_time: start,
                end_time: end,
                room_id,
                schedule_id: draft.schedule_id.clone(),
                notes: draft.notes.clone(),
                status: draft.status,
                treatment_plan_id: self.variant.plan_id().cloned(),
            },
        })
    }

    /// Records a refused submission; the draft stays editable.
    pub fn record_submission_failure(&mut self, message: impl Into<String>) {
        self.notices.push(Notice::error(NoticeCode::SubmissionRejected, message));
    }

    /// Current view of the draft. Drains pending notices.
    pub fn snapshot(&mut self) -> DraftSnapshot {
        let validation = self.prepare_submission();
        DraftSnapshot {
            state: self.state,
            variant: self.variant.clone(),
            editing: self.editing.clone(),
            draft: self.draft.clone(),
            candidates: self.candidates.clone(),
            room_options: self.room_options(),
            room_check: self.room_check_status(),
            plan: self.plan_bounds().cloned(),
            notices: self.take_notices(),
            can_submit: validation.is_ok(),
            blocking_reason: validation.err().map(|e| e.to_string()),
        }
    }
}
