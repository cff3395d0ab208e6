//! A single day of a trip.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::DayId;

use super::Activity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub day_id: DayId,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl Day {
    /// Creates an empty day under a freshly generated id.
    pub fn new(date: NaiveDate, title: Option<String>) -> Self {
        Self {
            day_id: DayId::new(),
            date,
            title: title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            activities: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_is_dropped() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        assert_eq!(Day::new(date, Some("   ".into())).title, None);
        assert_eq!(
            Day::new(date, Some(" Arrival ".into())).title.as_deref(),
            Some("Arrival")
        );
    }
}
