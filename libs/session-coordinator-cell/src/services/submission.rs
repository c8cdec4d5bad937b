use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use shared_api_client::ApiClient;
use shared_config::AppConfig;
use shared_models::EntityId;

use crate::error::SubmissionError;
use crate::models::{FlowVariant, SubmissionPayload, SubmissionRequest};
use crate::services::sources::SessionSink;

/// Commits drafts to the appointments / treatment-sessions endpoints.
pub struct SessionSubmissionService {
    client: Arc<ApiClient>,
}

impl SessionSubmissionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Arc::new(ApiClient::new(config)),
        }
    }

    pub fn with_client(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionSink for SessionSubmissionService {
    async fn create(
        &self,
        variant: &FlowVariant,
        payload: &SubmissionPayload,
        auth_token: &str,
    ) -> Result<Value> {
        debug!("Creating booking at {}", variant.resource_path());
        self.client
            .send_json(Method::POST, variant.resource_path(), payload, auth_token)
            .await
    }

    async fn update(
        &self,
        variant: &FlowVariant,
        id: &EntityId,
        payload: &SubmissionPayload,
        auth_token: &str,
    ) -> Result<Value> {
        let path = format!("{}/{}", variant.resource_path(), id);
        debug!("Updating booking at {}", path);
        self.client
            .send_json(Method::PUT, &path, payload, auth_token)
            .await
    }
}

/// Sends a validated request to the sink, classifying failures.
pub async fn submit(
    sink: &dyn SessionSink,
    request: &SubmissionRequest,
    auth_token: &str,
) -> Result<Value, SubmissionError> {
    let result = match &request.editing {
        Some(id) => sink.update(&request.variant, id, &request.payload, auth_token).await,
        None => sink.create(&request.variant, &request.payload, auth_token).await,
    };

    match result {
        Ok(created) => {
            info!(
                "Booked staff {} in room {} on {} ({})",
                request.payload.staff_id,
                request.payload.room_id,
                request.payload.date,
                if request.editing.is_some() { "update" } else { "create" }
            );
            Ok(created)
        }
        Err(e) => {
            let err = SubmissionError::from_upstream(e);
            warn!("Booking submission failed: {}", err);
            Err(err)
        }
    }
}
