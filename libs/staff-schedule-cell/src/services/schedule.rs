use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use shared_api_client::ApiClient;
use shared_config::AppConfig;
use shared_models::formats::format_date;
use shared_models::EntityId;

use crate::models::{eligible_shifts, WorkShift};

pub struct StaffScheduleService {
    client: Arc<ApiClient>,
}

impl StaffScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Arc::new(ApiClient::new(config)),
        }
    }

    pub fn with_client(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Every shift of a staff member between two dates, inclusive.
    pub async fn get_staff_schedule(
        &self,
        staff_id: &EntityId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<WorkShift>> {
        if end_date < start_date {
            return Err(anyhow!(
                "Schedule range end {} is before start {}",
                end_date,
                start_date
            ));
        }

        debug!(
            "Fetching schedule for staff {} from {} to {}",
            staff_id, start_date, end_date
        );

        let query = [
            ("staffId", staff_id.to_string()),
            ("startDate", format_date(start_date)),
            ("endDate", format_date(end_date)),
        ];

        let shifts: Vec<WorkShift> = self
            .client
            .get("/staff-schedules", &query, auth_token)
            .await?;

        // The API filters by staff already; shifts for anyone else are dropped.
        let shifts: Vec<WorkShift> = shifts
            .into_iter()
            .filter(|shift| &shift.staff_id == staff_id)
            .collect();

        debug!("Received {} shifts for staff {}", shifts.len(), staff_id);
        Ok(shifts)
    }

    /// Shifts open for booking. Failures degrade to an empty list.
    pub async fn get_eligible_shifts(
        &self,
        staff_id: &EntityId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        auth_token: &str,
    ) -> Vec<WorkShift> {
        match self
            .get_staff_schedule(staff_id, start_date, end_date, auth_token)
            .await
        {
            Ok(shifts) => eligible_shifts(shifts),
            Err(e) => {
                warn!("Staff schedule query failed for {}: {}", staff_id, e);
                Vec::new()
            }
        }
    }
}
