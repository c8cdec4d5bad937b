use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use shared_api_client::ApiError;
use shared_models::error::AppError;
use shared_models::EntityId;
use treatment_plan_cell::PlanBoundsViolation;

use crate::models::CoordinatorState;

/// Reasons a draft is held back before anything is sent upstream.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("End time {end} must be after start time {start}")]
    TimeRangeBackwards { start: NaiveTime, end: NaiveTime },

    #[error(transparent)]
    OutsidePlanBounds(#[from] PlanBoundsViolation),

    #[error("Treatment plan dates are still loading")]
    PlanCheckPending,

    #[error("Room {room_id} is not available on {date} from {start} to {end}")]
    RoomUnavailable {
        room_id: EntityId,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("Room availability is still being checked")]
    RoomCheckPending,

    #[error("Cannot submit while the draft is {0}")]
    NotSubmittable(CoordinatorState),
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The API refused the booking, typically a conflict the local checks
    /// could not see. The draft stays open.
    #[error("Booking rejected: {0}")]
    Rejected(String),

    #[error("Booking failed: {0}")]
    Upstream(String),
}

impl SubmissionError {
    pub fn from_upstream(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ApiError>() {
            Some(
                ApiError::Rejected { message, .. }
                | ApiError::Unauthorized(message)
                | ApiError::NotFound(message),
            ) => SubmissionError::Rejected(message.clone()),
            Some(api_error) => SubmissionError::Upstream(api_error.to_string()),
            None => SubmissionError::Upstream(err.to_string()),
        }
    }
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(e) => AppError::ValidationError(e.to_string()),
            SubmissionError::Rejected(message) => AppError::Conflict(message),
            SubmissionError::Upstream(message) => AppError::Upstream(message),
        }
    }
}
