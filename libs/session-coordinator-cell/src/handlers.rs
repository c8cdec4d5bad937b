use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{ActorRole, User};
use shared_models::error::AppError;
use shared_models::EntityId;
use shared_utils::extractor::BearerToken;

use crate::error::SubmissionError;
use crate::events::{Event, UserEvent};
use crate::models::{FlowVariant, Permissions, SessionDraft, ShiftLookup};
use crate::services::coordinator::{AvailabilityCoordinator, CoordinatorOptions};
use crate::services::desk::{DeskState, DraftEntry};
use crate::services::submission::submit;

// ==============================================================================
// REQUEST BODIES
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenDraftRequest {
    pub variant: FlowVariant,
    #[serde(default)]
    pub lookup: ShiftLookup,
    /// Appointment/session being edited; `seed` then holds its values.
    #[serde(default)]
    pub editing_id: Option<EntityId>,
    #[serde(default)]
    pub seed: Option<SessionDraft>,
}

// ==============================================================================
// HANDLERS
// ==============================================================================

async fn find_draft(
    state: &DeskState,
    draft_id: Uuid,
    user: &User,
) -> Result<Arc<DraftEntry>, AppError> {
    state
        .drafts
        .get(draft_id, &user.id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Draft {} not found", draft_id)))
}

/// Opens a booking draft and resolves its initial queries.
#[axum::debug_handler]
pub async fn open_draft(
    State(state): State<Arc<DeskState>>,
    Extension(user): Extension<User>,
    Extension(token): Extension<BearerToken>,
    Json(request): Json<OpenDraftRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let permissions = Permissions::for_user(&user);
    if permissions.role == ActorRole::Unknown {
        return Err(AppError::Forbidden("Your role cannot book sessions".to_string()));
    }
    if request.lookup == ShiftLookup::PlanWindow && request.variant == FlowVariant::Appointment {
        return Err(AppError::BadRequest(
            "Plan-window lookup requires a treatment session".to_string(),
        ));
    }
    if request.editing_id.is_some() && request.seed.is_none() {
        return Err(AppError::BadRequest(
            "Editing an existing booking requires its current values as seed".to_string(),
        ));
    }

    let mut options = CoordinatorOptions::new(request.variant, permissions).with_lookup(request.lookup);
    options = match (request.editing_id, request.seed) {
        (Some(id), Some(existing)) => options.editing(id, existing),
        (None, Some(seed)) => options.with_seed(seed),
        _ => options,
    };

    let (coordinator, commands) = AvailabilityCoordinator::open(options);
    let (draft_id, entry) = state.drafts.insert(&user.id, coordinator).await;

    state
        .driver
        .settle_shared(&entry.coordinator, commands, token.as_str())
        .await;

    let snapshot = entry.coordinator.lock().await.snapshot();

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "draft_id": draft_id,
            "snapshot": snapshot,
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_draft(
    State(state): State<Arc<DeskState>>,
    Extension(user): Extension<User>,
    Path(draft_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let entry = find_draft(&state, draft_id, &user).await?;
    let snapshot = entry.coordinator.lock().await.snapshot();

    Ok(Json(json!({
        "draft_id": draft_id,
        "opened_at": entry.opened_at,
        "snapshot": snapshot,
    })))
}

/// Applies one form event and waits for the queries it triggers.
#[axum::debug_handler]
pub async fn apply_event(
    State(state): State<Arc<DeskState>>,
    Extension(user): Extension<User>,
    Extension(token): Extension<BearerToken>,
    Path(draft_id): Path<Uuid>,
    Json(event): Json<UserEvent>,
) -> Result<Json<Value>, AppError> {
    let entry = find_draft(&state, draft_id, &user).await?;
    debug!("Draft {} event {:?}", draft_id, event);

    let commands = entry.coordinator.lock().await.dispatch(Event::from(event));
    state
        .driver
        .settle_shared(&entry.coordinator, commands, token.as_str())
        .await;

    let snapshot = entry.coordinator.lock().await.snapshot();
    Ok(Json(json!({
        "draft_id": draft_id,
        "snapshot": snapshot,
    })))
}

/// Validates the draft locally, then creates or updates the booking.
/// The draft is closed on success and kept open on any failure.
#[axum::debug_handler]
pub async fn submit_draft(
    State(state): State<Arc<DeskState>>,
    Extension(user): Extension<User>,
    Extension(token): Extension<BearerToken>,
    Path(draft_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let entry = find_draft(&state, draft_id, &user).await?;

    // Held across the upstream call so the draft cannot change mid-submit.
    let mut coordinator = entry.coordinator.lock().await;

    let request = coordinator
        .prepare_submission()
        .map_err(SubmissionError::from)?;

    match submit(state.sink.as_ref(), &request, token.as_str()).await {
        Ok(booking) => {
            drop(coordinator);
            state.drafts.remove(draft_id, &user.id).await;
            Ok(Json(json!({
                "success": true,
                "booking": booking,
                "message": if request.editing.is_some() {
                    "Booking updated"
                } else {
                    "Booking created"
                }
            })))
        }
        Err(err) => {
            coordinator.record_submission_failure(err.to_string());
            Err(err.into())
        }
    }
}

#[axum::debug_handler]
pub async fn close_draft(
    State(state): State<Arc<DeskState>>,
    Extension(user): Extension<User>,
    Path(draft_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.drafts.remove(draft_id, &user.id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Draft {} not found", draft_id)))
    }
}
