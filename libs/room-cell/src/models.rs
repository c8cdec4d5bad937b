use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_models::formats::{format_date, format_time, hhmm};
use shared_models::EntityId;

/// A room with no booking overlapping the window it was queried for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableRoom {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub floor_number: Option<i32>,
}

/// The exact date/time window a room must be free for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl RoomWindow {
    /// Single-day window, the shape every booking form produces.
    pub fn on(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_date: date,
            end_date: date,
            start_time,
            end_time,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.start_date <= self.end_date && self.start_time < self.end_time
    }

    pub fn to_query(&self) -> [(&'static str, String); 4] {
        [
            ("startDate", format_date(self.start_date)),
            ("endDate", format_date(self.end_date)),
            ("startTime", format_time(self.start_time)),
            ("endTime", format_time(self.end_time)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_window_requires_forward_time_range() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(RoomWindow::on(day, t(9, 0), t(12, 0)).is_well_formed());
        assert!(!RoomWindow::on(day, t(12, 0), t(9, 0)).is_well_formed());
        assert!(!RoomWindow::on(day, t(9, 0), t(9, 0)).is_well_formed());
    }

    #[test]
    fn test_query_uses_wire_formats() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let query = RoomWindow::on(day, t(9, 0), t(12, 30)).to_query();

        assert_eq!(query[0], ("startDate", "2024-05-01".to_string()));
        assert_eq!(query[3], ("endTime", "12:30".to_string()));
    }
}
