//! Wire formats shared with the dashboard API: dates as `YYYY-MM-DD`,
//! times as `HH:mm` (seconds tolerated on input).

use chrono::{NaiveDate, NaiveTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// `#[serde(with = "hhmm")]` for `NaiveTime` fields.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time '{}', expected HH:mm", raw)))
    }
}

/// `#[serde(with = "hhmm_option", default)]` for `Option<NaiveTime>` fields.
/// Empty strings read as `None`.
pub mod hhmm_option {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_str(&super::format_time(*t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => super::parse_time(value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid time '{}', expected HH:mm", value))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Slot {
        #[serde(with = "hhmm")]
        start: NaiveTime,
        #[serde(with = "hhmm_option", default)]
        end: Option<NaiveTime>,
    }

    #[test]
    fn test_time_accepts_seconds_but_writes_minutes() {
        let slot: Slot = serde_json::from_str(r#"{"start":"09:00:00","end":"12:30"}"#).unwrap();
        assert_eq!(slot.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());

        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["start"], "09:00");
        assert_eq!(json["end"], "12:30");
    }

    #[test]
    fn test_optional_time_treats_empty_as_none() {
        let slot: Slot = serde_json::from_str(r#"{"start":"09:00","end":""}"#).unwrap();
        assert!(slot.end.is_none());

        let slot: Slot = serde_json::from_str(r#"{"start":"09:00"}"#).unwrap();
        assert!(slot.end.is_none());
    }

    #[test]
    fn test_rejects_malformed_time() {
        assert!(serde_json::from_str::<Slot>(r#"{"start":"9am"}"#).is_err());
        assert!(parse_date("2024-13-01").is_none());
        assert_eq!(
            parse_date("2024-05-01"),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
    }
}
