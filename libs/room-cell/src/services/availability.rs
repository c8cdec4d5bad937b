use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::debug;

use shared_api_client::ApiClient;
use shared_config::AppConfig;

use crate::models::{AvailableRoom, RoomWindow};

pub struct RoomAvailabilityService {
    client: Arc<ApiClient>,
}

impl RoomAvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Arc::new(ApiClient::new(config)),
        }
    }

    pub fn with_client(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Rooms with no booking overlapping `window`.
    pub async fn get_available_rooms(
        &self,
        window: &RoomWindow,
        auth_token: &str,
    ) -> Result<Vec<AvailableRoom>> {
        if !window.is_well_formed() {
            return Err(anyhow!(
                "Room window {} {}-{} is not a forward range",
                window.start_date,
                window.start_time,
                window.end_time
            ));
        }

        debug!(
            "Fetching rooms free on {}..{} {}-{}",
            window.start_date, window.end_date, window.start_time, window.end_time
        );

        let rooms: Vec<AvailableRoom> = self
            .client
            .get("/rooms/available", &window.to_query(), auth_token)
            .await?;

        debug!("{} rooms available", rooms.len());
        Ok(rooms)
    }
}
