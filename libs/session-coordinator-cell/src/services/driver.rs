use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use room_cell::RoomAvailabilityService;
use shared_api_client::ApiClient;
use shared_config::AppConfig;
use staff_schedule_cell::StaffScheduleService;
use treatment_plan_cell::TreatmentPlanService;

use crate::events::{Command, Event, QueryFailure};
use crate::services::coordinator::AvailabilityCoordinator;
use crate::services::sources::{PlanSource, RoomSource, ShiftSource};

/// Upper bound on command/event round trips for a single settle. Each round
/// only reacts to results of the previous one, so a healthy draft settles in
/// two or three.
const MAX_SETTLE_ROUNDS: usize = 8;

/// Runs coordinator commands against the query sources and feeds the
/// results back as events.
#[derive(Clone)]
pub struct CoordinatorDriver {
    shifts: Arc<dyn ShiftSource>,
    rooms: Arc<dyn RoomSource>,
    plans: Arc<dyn PlanSource>,
}

impl CoordinatorDriver {
    pub fn new(config: &AppConfig) -> Self {
        let client = Arc::new(ApiClient::new(config));
        Self {
            shifts: Arc::new(StaffScheduleService::with_client(client.clone())),
            rooms: Arc::new(RoomAvailabilityService::with_client(client.clone())),
            plans: Arc::new(TreatmentPlanService::with_client(client)),
        }
    }

    pub fn with_sources(
        shifts: Arc<dyn ShiftSource>,
        rooms: Arc<dyn RoomSource>,
        plans: Arc<dyn PlanSource>,
    ) -> Self {
        Self { shifts, rooms, plans }
    }

    /// Runs all commands concurrently. Failures become failed `*Loaded`
    /// events rather than errors.
    pub async fn execute(&self, commands: Vec<Command>, auth_token: &str) -> Vec<Event> {
        join_all(
            commands
                .into_iter()
                .map(|command| self.run_command(command, auth_token)),
        )
        .await
    }

    async fn run_command(&self, command: Command, auth_token: &str) -> Event {
        match command {
            Command::FetchShifts(ticket) => {
                let result = self
                    .shifts
                    .fetch_shifts(&ticket.key, auth_token)
                    .await
                    .map_err(QueryFailure::from);
                Event::ShiftsLoaded { ticket, result }
            }
            Command::FetchRooms(ticket) => {
                let result = self
                    .rooms
                    .fetch_rooms(&ticket.key, auth_token)
                    .await
                    .map_err(QueryFailure::from);
                Event::RoomsLoaded { ticket, result }
            }
            Command::FetchPlan(ticket) => {
                let result = self
                    .plans
                    .fetch_plan(&ticket.key, auth_token)
                    .await
                    .map_err(QueryFailure::from);
                Event::PlanLoaded { ticket, result }
            }
        }
    }

    /// Drives an exclusively owned coordinator until no queries remain.
    pub async fn settle(
        &self,
        coordinator: &mut AvailabilityCoordinator,
        commands: Vec<Command>,
        auth_token: &str,
    ) {
        let mut pending = commands;
        for round in 0..MAX_SETTLE_ROUNDS {
            if pending.is_empty() {
                return;
            }
            debug!("Settle round {}: {} commands", round, pending.len());
            let events = self.execute(pending, auth_token).await;
            pending = events
                .into_iter()
                .flat_map(|event| coordinator.dispatch(event))
                .collect();
        }
        if !pending.is_empty() {
            warn!("Draft did not settle after {} rounds; {} commands dropped", MAX_SETTLE_ROUNDS, pending.len());
        }
    }

    /// Like [`settle`](Self::settle) for a coordinator shared behind a
    /// mutex. The lock is released while requests are in flight, so other
    /// events may land in between; tickets decide which results still apply.
    pub async fn settle_shared(
        &self,
        coordinator: &Mutex<AvailabilityCoordinator>,
        commands: Vec<Command>,
        auth_token: &str,
    ) {
        let mut pending = commands;
        for round in 0..MAX_SETTLE_ROUNDS {
            if pending.is_empty() {
                return;
            }
            debug!("Settle round {}: {} commands", round, pending.len());
            let events = self.execute(pending, auth_token).await;

            let mut guard = coordinator.lock().await;
            pending = events
                .into_iter()
                .flat_map(|event| guard.dispatch(event))
                .collect();
        }
        if !pending.is_empty() {
            warn!("Draft did not settle after {} rounds; {} commands dropped", MAX_SETTLE_ROUNDS, pending.len());
        }
    }
}
