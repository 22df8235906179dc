use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationType {
    InPerson,
    Video,
    Phone,
}

impl ConsultationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationType::InPerson => "in_person",
            ConsultationType::Video => "video",
            ConsultationType::Phone => "phone",
        }
    }
}

impl fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsultationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_person" => Ok(ConsultationType::InPerson),
            "video" => Ok(ConsultationType::Video),
            "phone" => Ok(ConsultationType::Phone),
            other => Err(format!("unknown consultation type '{}'", other)),
        }
    }
}

/// One way a provider can be consulted, with its price and length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationOption {
    #[serde(rename = "type")]
    pub kind: ConsultationType,
    pub fee: i64,
    pub duration_minutes: u32,
}

/// Daily window `[start, end)` in which a provider takes appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub specialization: String,
    pub consultation_types: Vec<ConsultationOption>,
    pub working_hours: WorkingHours,
}

impl Provider {
    /// The offered option for `kind`, if the provider offers it at all.
    pub fn consultation(&self, kind: ConsultationType) -> Option<&ConsultationOption> {
        self.consultation_types.iter().find(|c| c.kind == kind)
    }

    pub fn offers(&self, kind: ConsultationType) -> bool {
        self.consultation(kind).is_some()
    }

    /// Whether a visit of `minutes` starting at `start` ends within working hours.
    pub fn fits(&self, date: NaiveDate, start: NaiveTime, minutes: u32) -> bool {
        let begins = date.and_time(start);
        let ends = begins + Duration::minutes(i64::from(minutes));
        begins >= date.and_time(self.working_hours.start)
            && ends <= date.and_time(self.working_hours.end)
    }
}
