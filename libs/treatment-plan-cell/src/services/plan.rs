use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::debug;

use shared_api_client::ApiClient;
use shared_config::AppConfig;
use shared_models::EntityId;

use crate::models::TreatmentPlanBounds;

pub struct TreatmentPlanService {
    client: Arc<ApiClient>,
}

impl TreatmentPlanService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Arc::new(ApiClient::new(config)),
        }
    }

    pub fn with_client(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get_plan_bounds(
        &self,
        plan_id: &EntityId,
        auth_token: &str,
    ) -> Result<TreatmentPlanBounds> {
        debug!("Fetching treatment plan {}", plan_id);

        let path = format!("/treatment-plans/{}", plan_id);
        let plan: TreatmentPlanBounds = self.client.get(&path, &[], auth_token).await?;

        if plan.end_date < plan.start_date {
            return Err(anyhow!(
                "Treatment plan {} ends ({}) before it starts ({})",
                plan.id,
                plan.end_date,
                plan.start_date
            ));
        }

        Ok(plan)
    }
}
