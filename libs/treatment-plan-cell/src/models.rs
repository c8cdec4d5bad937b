use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::EntityId;

/// Date window every session of a treatment plan must fall in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPlanBounds {
    pub id: EntityId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanBoundsViolation {
    #[error("Session date {date} is before the treatment plan starts ({start} to {end})")]
    BeforeStart {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Session date {date} is after the treatment plan ends ({start} to {end})")]
    AfterEnd {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl TreatmentPlanBounds {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn check(&self, date: NaiveDate) -> Result<(), PlanBoundsViolation> {
        let (start, end) = (self.start_date, self.end_date);
        if date < start {
            Err(PlanBoundsViolation::BeforeStart { date, start, end })
        } else if date > end {
            Err(PlanBoundsViolation::AfterEnd { date, start, end })
        } else {
            Ok(())
        }
    }
}
