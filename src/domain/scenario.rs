use crate::domain::model::{MaritalType, Sex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// No violation, no idle time and the makespan lower bound was reached.
    Optimal,
    /// Every hard rule holds.
    Feasible,
}

impl SolveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledActivity {
    pub activity_id: String,
    pub activity_name: String,
    pub activity_color: Option<String>,
    pub room_id: String,
    pub room_name: String,
    pub floor: i64,
    pub start: String,
    pub end: String,
    pub start_minute: i64,
    pub end_minute: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTransfer {
    pub from_floor: i64,
    pub to_floor: i64,
    pub start: String,
    pub end: String,
    pub start_minute: i64,
    pub end_minute: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduledEntry {
    Activity(ScheduledActivity),
    Transfer(ScheduledTransfer),
}

impl ScheduledEntry {
    pub fn start_minute(&self) -> i64 {
        match self {
            ScheduledEntry::Activity(a) => a.start_minute,
            ScheduledEntry::Transfer(t) => t.start_minute,
        }
    }

    pub fn end_minute(&self) -> i64 {
        match self {
            ScheduledEntry::Activity(a) => a.end_minute,
            ScheduledEntry::Transfer(t) => t.end_minute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientScenario {
    pub client_number: u32,
    /// Name of the assessment the client is booked on.
    pub client_type: String,
    #[serde(rename = "type")]
    pub marital_type: MaritalType,
    pub sex: Sex,
    pub single_client_no: Option<u32>,
    pub couple_client_no: Option<u32>,
    pub client_room: Option<String>,
    pub start_time: String,
    pub activities: Vec<ScheduledEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedScenario {
    pub status: SolveStatus,
    pub objective: i64,
    pub gap_minutes: i64,
    pub makespan_minutes: i64,
    pub soft_violations: u32,
    pub iterations: u64,
    pub elapsed_ms: u64,
    pub generated_at: DateTime<Utc>,
    pub clients: Vec<ClientScenario>,
}

impl GeneratedScenario {
    /// One row per activity / transfer, used for the CSV export.
    pub fn rows(&self) -> Vec<ScheduleRow> {
        let mut rows = Vec::new();
        for client in &self.clients {
            for entry in &client.activities {
                let row = match entry {
                    ScheduledEntry::Activity(a) => ScheduleRow {
                        client_number: client.client_number,
                        client_type: client.client_type.clone(),
                        sex: format!("{:?}", client.sex).to_uppercase(),
                        kind: "ACTIVITY".to_string(),
                        activity: a.activity_name.clone(),
                        room: a.room_name.clone(),
                        floor: a.floor.to_string(),
                        start: a.start.clone(),
                        end: a.end.clone(),
                    },
                    ScheduledEntry::Transfer(t) => ScheduleRow {
                        client_number: client.client_number,
                        client_type: client.client_type.clone(),
                        sex: format!("{:?}", client.sex).to_uppercase(),
                        kind: "TRANSFER".to_string(),
                        activity: "Transfer".to_string(),
                        room: String::new(),
                        floor: format!("{}->{}", t.from_floor, t.to_floor),
                        start: t.start.clone(),
                        end: t.end.clone(),
                    },
                };
                rows.push(row);
            }
        }
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub client_number: u32,
    pub client_type: String,
    pub sex: String,
    pub kind: String,
    pub activity: String,
    pub room: String,
    pub floor: String,
    pub start: String,
    pub end: String,
}
