//! Seams between the coordinator and the REST API.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use room_cell::{AvailableRoom, RoomAvailabilityService, RoomWindow};
use shared_models::EntityId;
use staff_schedule_cell::{StaffScheduleService, WorkShift};
use treatment_plan_cell::{TreatmentPlanBounds, TreatmentPlanService};

use crate::events::ShiftKey;
use crate::models::{FlowVariant, SubmissionPayload};

#[async_trait]
pub trait ShiftSource: Send + Sync {
    /// Raw shifts for the key; eligibility is decided by the coordinator.
    async fn fetch_shifts(&self, key: &ShiftKey, auth_token: &str) -> Result<Vec<WorkShift>>;
}

#[async_trait]
pub trait RoomSource: Send + Sync {
    async fn fetch_rooms(&self, window: &RoomWindow, auth_token: &str) -> Result<Vec<AvailableRoom>>;
}

#[async_trait]
pub trait PlanSource: Send + Sync {
    async fn fetch_plan(&self, plan_id: &EntityId, auth_token: &str) -> Result<TreatmentPlanBounds>;
}

#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn create(
        &self,
        variant: &FlowVariant,
        payload: &SubmissionPayload,
        auth_token: &str,
    ) -> Result<Value>;

    async fn update(
        &self,
        variant: &FlowVariant,
        id: &EntityId,
        payload: &SubmissionPayload,
        auth_token: &str,
    ) -> Result<Value>;
}

#[async_trait]
impl ShiftSource for StaffScheduleService {
    async fn fetch_shifts(&self, key: &ShiftKey, auth_token: &str) -> Result<Vec<WorkShift>> {
        self.get_staff_schedule(&key.staff_id, key.start_date, key.end_date, auth_token)
            .await
    }
}

#[async_trait]
impl RoomSource for RoomAvailabilityService {
    async fn fetch_rooms(&self, window: &RoomWindow, auth_token: &str) -> Result<Vec<AvailableRoom>> {
        self.get_available_rooms(window, auth_token).await
    }
}

#[async_trait]
impl PlanSource for TreatmentPlanService {
    async fn fetch_plan(&self, plan_id: &EntityId, auth_token: &str) -> Result<TreatmentPlanBounds> {
        self.get_plan_bounds(plan_id, auth_token).await
    }
}
