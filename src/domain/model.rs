//! Records served by the resource, activity and assessment APIs, and the
//! scenario action that describes one clinic day.

use crate::utils::error::{Result as ScenarioResult, ScenarioError};
use crate::utils::time::parse_clock;
use crate::utils::validation::Validate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Room types known to the clinic. Upstream values outside this list are
/// kept verbatim.
pub mod room_types {
    pub const CLIENT: &str = "CLIENT";
    pub const SINGLE_CLIENT_ROOM: &str = "SINGLE_CLIENT_ROOM";
    pub const DOUBLE_CLIENT_ROOM: &str = "DOUBLE_CLIENT_ROOM";
    pub const DOUBLE_ACCESSIBLE: &str = "DOUBLE_ACCESSIBLE";
    pub const ULTRASOUND_ROOM: &str = "ULTRASOUND_ROOM";
    pub const MRI_15T_ROOM: &str = "MRI_1.5T_ROOM";
    pub const MRI_3T_ROOM: &str = "MRI_3T_ROOM";
    pub const CARDIAC_ROOM: &str = "CARDIAC_ROOM";
    pub const DOCTOR_ROOM: &str = "DOCTOR_ROOM";
    pub const EYES_AND_EARS_ROOM: &str = "EYES_AND_EARS_ROOM";
    pub const PHLEBOTOMY_ROOM: &str = "PHLEBOTOMY_ROOM";
    pub const RADIOLOGY_ROOM: &str = "RADIOLOGY_ROOM";
    pub const PURE_SPORTS_ROOM: &str = "PURE_SPORTS_ROOM";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Client,
    #[default]
    #[serde(other)]
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Client => "CLIENT",
            ResourceType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub resource_id: String,
    #[serde(default)]
    pub resource_name: String,
    #[serde(default, rename = "type")]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub room_type: Option<String>,
    /// Floor the room is on.
    #[serde(default, deserialize_with = "de::i64_from_any")]
    pub location: i64,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

impl Resource {
    /// Key used to match activities to rooms: every client room shares the
    /// `CLIENT` key, other rooms are keyed by room type.
    pub fn room_key(&self) -> String {
        match self.resource_type {
            ResourceType::Client => room_types::CLIENT.to_string(),
            ResourceType::Other => self.room_type.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAllocation {
    #[serde(default, deserialize_with = "de::opt_i64_from_any")]
    pub male: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64_from_any")]
    pub female: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64_from_any")]
    pub default_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub activity_id: String,
    pub activity_name: String,
    #[serde(default)]
    pub activity_color: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub is_gender_time_allocated: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub time_allocations: TimeAllocation,
    #[serde(default)]
    pub mandatory_conditions_count: u32,
    #[serde(default)]
    pub optional_conditions_count: u32,
}

impl Activity {
    /// Room key this activity needs; falls back to the resource type when the
    /// activity has no room type.
    pub fn room_key(&self) -> String {
        match self.room_type.as_deref().map(str::trim) {
            Some(room_type) if !room_type.is_empty() => room_type.to_string(),
            _ => self.resource_type.as_str().to_string(),
        }
    }

    pub fn duration_for(&self, sex: Sex) -> Option<i64> {
        let allocations = &self.time_allocations;
        if self.is_gender_time_allocated {
            let specific = match sex {
                Sex::Male => allocations.male,
                Sex::Female => allocations.female,
            };
            specific.or(allocations.default_time)
        } else {
            allocations.default_time
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub assessment_id: String,
    pub assessment_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionType {
    Before,
    After,
    RightAfter,
    Between,
    Within,
    InFixedOrderAs,
    /// Any type this service does not schedule; rejected during assembly.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaType {
    Activity,
    Time,
    Order,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetweenValues {
    #[serde(default, deserialize_with = "de::opt_string_from_any")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string_from_any")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    #[serde(default)]
    pub criteria_type: Option<CriteriaType>,
    #[serde(default)]
    pub between_values: BetweenValues,
    #[serde(default, deserialize_with = "de::opt_string_from_any")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default)]
    pub condition_id: String,
    pub activity_id: String,
    #[serde(default)]
    pub assessment_id: String,
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub generate: bool,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub criteria: Criteria,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaritalType {
    Single,
    Couple,
}

/// Number of clients of one assessment, by sex and marital type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMix {
    #[serde(default)]
    pub single_male: u32,
    #[serde(default)]
    pub single_female: u32,
    #[serde(default)]
    pub couple_male_female: u32,
    #[serde(default)]
    pub couple_male_male: u32,
    #[serde(default)]
    pub couple_female_female: u32,
}

impl ClientMix {
    pub fn singles(&self) -> u32 {
        self.single_male + self.single_female
    }

    pub fn couples(&self) -> u32 {
        self.couple_male_female + self.couple_male_male + self.couple_female_female
    }

    /// Number of people: a couple is two clients.
    pub fn headcount(&self) -> u32 {
        self.singles() + 2 * self.couples()
    }

    pub fn is_empty(&self) -> bool {
        self.headcount() == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioActionData {
    #[serde(default, alias = "outOrderRooms")]
    pub out_of_order_rooms: Vec<String>,
    #[serde(default)]
    pub client_elite: ClientMix,
    #[serde(default)]
    pub client_ultimate: ClientMix,
    /// Mixes of other assessments, keyed `client<AssessmentName>`.
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

impl ScenarioActionData {
    /// Client mix booked on the named assessment (`Elite` → `clientElite`).
    pub fn client_mix(&self, assessment_name: &str) -> ClientMix {
        let name = assessment_name.trim().to_lowercase();
        match name.as_str() {
            "elite" => self.client_elite.clone(),
            "ultimate" => self.client_ultimate.clone(),
            _ => {
                let key = format!("client{}", capitalize(&name));
                self.other
                    .get(&key)
                    .and_then(|value| serde_json::from_value(value.clone()).ok())
                    .unwrap_or_default()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioAction {
    pub first_client_arrival_time: String,
    #[serde(default = "default_max_gap", deserialize_with = "de::i64_from_any")]
    pub max_gap: i64,
    #[serde(default, deserialize_with = "de::opt_i64_from_any")]
    pub total_male: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64_from_any")]
    pub total_female: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64_from_any")]
    pub doctors_on_duty: Option<i64>,
    #[serde(default)]
    pub allow_simultaneous_transfers: bool,
    #[serde(default)]
    pub data: ScenarioActionData,
}

impl Validate for ScenarioAction {
    fn validate(&self) -> ScenarioResult<()> {
        parse_clock("firstClientArrivalTime", &self.first_client_arrival_time)?;
        if self.max_gap < 0 {
            return Err(ScenarioError::validation(format!(
                "maxGap must not be negative, got {}",
                self.max_gap
            )));
        }
        if let Some(doctors) = self.doctors_on_duty.filter(|&n| n < 0) {
            return Err(ScenarioError::validation(format!(
                "doctorsOnDuty must not be negative, got {}",
                doctors
            )));
        }

        let data = &self.data;
        let mut headcount = data.client_elite.headcount() + data.client_ultimate.headcount();
        for value in data.other.values() {
            if let Ok(mix) = serde_json::from_value::<ClientMix>(value.clone()) {
                headcount += mix.headcount();
            }
        }
        if headcount == 0 {
            return Err(ScenarioError::validation(
                "data must book at least one client (clientElite, clientUltimate, ...)",
            ));
        }
        Ok(())
    }
}

/// Body of a scenario request: the scenario action plus the authorization
/// value forwarded to the upstream APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRequest {
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

/// Everything fetched from the upstream APIs for one scenario.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub resources: Vec<Resource>,
    pub activities: Vec<Activity>,
    pub assessments: Vec<Assessment>,
    /// Conditions per assessment id.
    pub conditions: HashMap<String, Vec<Condition>>,
}

fn default_true() -> bool {
    true
}

fn default_max_gap() -> i64 {
    10
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upstream APIs are not consistent about numbers vs numeric strings.
mod de {
    use super::*;
    use serde::de::Error;
    use serde_json::Value;

    pub fn opt_string_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(D::Error::custom(format!("expected a string, got {}", other))),
        }
    }

    pub fn opt_i64_from_any<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid number {}", n))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid number '{}': {}", s, e))),
            Some(other) => Err(D::Error::custom(format!("expected a number, got {}", other))),
        }
    }

    pub fn i64_from_any<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        opt_i64_from_any(deserializer).map(|value| value.unwrap_or_default())
    }
}
