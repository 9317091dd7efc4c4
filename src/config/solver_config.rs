use crate::utils::error::{Result, ScenarioError};
use crate::utils::time::parse_clock;
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Clinic rules and search settings, loaded from `solver.toml`.
///
/// Every table is optional; a missing file means the built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SolverConfig {
    #[serde(default)]
    pub solver: SolverSettings,
    #[serde(default)]
    pub rules: RuleSettings,
    #[serde(default)]
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub hints: Vec<ArrivalHint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverMode {
    /// Minimise idle minutes, then the makespan.
    #[default]
    Gaps,
    /// Minimise the latest end, then idle minutes.
    Makespan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Overrides `SOLVER_MAX_MINUTES` when set.
    pub max_minutes: Option<f64>,
    pub max_iterations: Option<u64>,
    /// Iterations without improvement before the search gives up.
    pub max_stall_iterations: u64,
    pub seed: Option<u64>,
    pub granularity_minutes: i64,
    pub transfer_minutes: i64,
    pub day_end: String,
    pub mode: SolverMode,
    /// How far (in granularity steps) a client's arrival may be pushed back
    /// while searching for a gap-free placement.
    pub max_arrival_shift_steps: i64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_minutes: None,
            max_iterations: None,
            max_stall_iterations: 5_000,
            seed: None,
            granularity_minutes: 5,
            transfer_minutes: 5,
            day_end: "23:00:00".to_string(),
            mode: SolverMode::Gaps,
            max_arrival_shift_steps: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomCapacity {
    pub activity: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotAlias {
    /// Case-insensitive regular expression matched against activity names.
    pub pattern: String,
    pub slot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    pub anchor_activity: String,
    pub same_room_as_anchor: Vec<String>,
    pub exclusive_activities: Vec<String>,
    pub staggered_activities: Vec<String>,
    pub room_capacities: Vec<RoomCapacity>,
    pub slot_aliases: Vec<SlotAlias>,
    pub doctor_room_type: String,
}

impl Default for RuleSettings {
    fn default() -> Self {
        let anchor = "Check-in, Consent & Change".to_string();
        Self {
            same_room_as_anchor: vec!["Lunch".to_string(), "Checkout".to_string()],
            exclusive_activities: vec![anchor.clone()],
            anchor_activity: anchor,
            staggered_activities: vec!["MRI".to_string()],
            room_capacities: vec![
                RoomCapacity {
                    activity: "First Consultation".to_string(),
                    capacity: 3,
                },
                RoomCapacity {
                    activity: "Final Consultation".to_string(),
                    capacity: 3,
                },
            ],
            slot_aliases: vec![SlotAlias {
                pattern: "MRI".to_string(),
                slot: "MRI".to_string(),
            }],
            doctor_room_type: crate::domain::model::room_types::DOCTOR_ROOM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_millis: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 2,
            retry_delay_millis: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HintMix {
    #[serde(default)]
    pub singles: u32,
    #[serde(default)]
    pub couples: u32,
}

/// Known-good anchor start times for a given client mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalHint {
    /// Client mix per lower-cased assessment name.
    pub mix: BTreeMap<String, HintMix>,
    /// Anchor start times (`HH:MM:SS`), one per client in client order.
    pub arrivals: Vec<String>,
}

impl SolverConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ScenarioError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn load_optional<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) if path.as_ref().exists() => {
                tracing::info!(
                    "📁 Loading solver configuration from {}",
                    path.as_ref().display()
                );
                Self::from_file(path)
            }
            Some(path) => {
                tracing::warn!(
                    "⚠️ Solver configuration {} not found, using defaults",
                    path.as_ref().display()
                );
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ScenarioError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SOLVER_SEED})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ScenarioError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Hint whose client mix equals `mix` exactly.
    pub fn hint_for(&self, mix: &BTreeMap<String, HintMix>) -> Option<&ArrivalHint> {
        let wanted: BTreeMap<&String, &HintMix> = mix
            .iter()
            .filter(|(_, m)| m.singles + m.couples > 0)
            .collect();
        self.hints.iter().find(|hint| {
            let have: BTreeMap<&String, &HintMix> = hint
                .mix
                .iter()
                .filter(|(_, m)| m.singles + m.couples > 0)
                .collect();
            have == wanted
        })
    }
}

impl Validate for SolverConfig {
    fn validate(&self) -> Result<()> {
        let solver = &self.solver;
        if let Some(max_minutes) = solver.max_minutes {
            validate_range("solver.max_minutes", max_minutes, 0.0, 24.0 * 60.0)?;
        }
        validate_range("solver.granularity_minutes", solver.granularity_minutes, 1, 60)?;
        validate_range("solver.transfer_minutes", solver.transfer_minutes, 0, 120)?;
        validate_range("solver.max_stall_iterations", solver.max_stall_iterations, 1, u64::MAX)?;
        validate_range("solver.max_arrival_shift_steps", solver.max_arrival_shift_steps, 0, 1000)?;
        parse_clock("solver.day_end", &solver.day_end)?;

        validate_non_empty_string("rules.anchor_activity", &self.rules.anchor_activity)?;
        for alias in &self.rules.slot_aliases {
            regex::Regex::new(&alias.pattern).map_err(|e| ScenarioError::InvalidConfigValueError {
                field: "rules.slot_aliases.pattern".to_string(),
                value: alias.pattern.clone(),
                reason: e.to_string(),
            })?;
            validate_non_empty_string("rules.slot_aliases.slot", &alias.slot)?;
        }
        for capacity in &self.rules.room_capacities {
            validate_range("rules.room_capacities.capacity", capacity.capacity, 1, 1000)?;
        }

        for hint in &self.hints {
            for arrival in &hint.arrivals {
                parse_clock("hints.arrivals", arrival)?;
            }
        }

        validate_range("upstream.timeout_seconds", self.upstream.timeout_seconds, 1, 900)?;
        validate_range("upstream.retry_attempts", self.upstream.retry_attempts, 0, 10)?;

        Ok(())
    }
}
