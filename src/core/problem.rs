//! Scheduling problem in solver terms: minutes from the first arrival,
//! indices instead of upstream ids.

use crate::config::solver_config::SolverMode;
use crate::domain::model::{MaritalType, Sex};
use chrono::NaiveTime;

#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub floor: i64,
    pub is_doctor_room: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityInfo {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

/// One way of performing a slot: an activity in a room for a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomOption {
    pub room: usize,
    pub activity: usize,
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotPlan {
    pub key: String,
    /// No two clients perform this slot at the same time.
    pub exclusive: bool,
    /// Starts and ends never coincide across clients.
    pub staggered: bool,
    /// Maximum number of clients a room hosts this slot for over the day.
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// end(slot) <= start(other)
    EndsBeforeStartOf { slot: usize, other: usize },
    /// start(slot) >= end(other)
    StartsAfterEndOf { slot: usize, other: usize },
    /// start(slot) == end(other)
    StartsAtEndOf { slot: usize, other: usize },
    /// end(slot) <= minute
    EndsBy { slot: usize, minute: i64 },
    /// start(slot) >= minute
    StartsFrom { slot: usize, minute: i64 },
    /// end(anchor) <= start(slot) <= start(anchor) + minutes
    StartsWithin {
        slot: usize,
        anchor: usize,
        minutes: i64,
    },
    OrderBelow { slot: usize, order: usize },
    OrderAbove { slot: usize, order: usize },
    OrderAt { slot: usize, order: usize },
}

impl Rule {
    pub fn slot(&self) -> usize {
        match *self {
            Rule::EndsBeforeStartOf { slot, .. }
            | Rule::StartsAfterEndOf { slot, .. }
            | Rule::StartsAtEndOf { slot, .. }
            | Rule::EndsBy { slot, .. }
            | Rule::StartsFrom { slot, .. }
            | Rule::StartsWithin { slot, .. }
            | Rule::OrderBelow { slot, .. }
            | Rule::OrderAbove { slot, .. }
            | Rule::OrderAt { slot, .. } => slot,
        }
    }

    /// `(before, after)` when the rule fixes the relative order of two slots.
    pub fn precedence(&self) -> Option<(usize, usize)> {
        match *self {
            Rule::EndsBeforeStartOf { slot, other } => Some((slot, other)),
            Rule::StartsAfterEndOf { slot, other } | Rule::StartsAtEndOf { slot, other } => {
                Some((other, slot))
            }
            Rule::StartsWithin { slot, anchor, .. } => Some((anchor, slot)),
            _ => None,
        }
    }
}

/// An upstream condition compiled to rules. A condition is violated when any
/// of its rules is.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    pub condition_id: String,
    pub mandatory: bool,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentPlan {
    pub name: String,
    pub slots: Vec<SlotPlan>,
    pub anchor: Option<usize>,
    pub same_room_as_anchor: Vec<usize>,
    pub conditions: Vec<CompiledCondition>,
}

impl AssessmentPlan {
    /// Anchor plus companions: slots that share the client's room.
    pub fn in_client_room(&self, slot: usize) -> bool {
        self.anchor == Some(slot) || self.same_room_as_anchor.contains(&slot)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.conditions.iter().flat_map(|c| c.rules.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientPlan {
    pub number: u32,
    pub assessment: usize,
    pub sex: Sex,
    pub marital_type: MaritalType,
    pub single_client_no: Option<u32>,
    pub couple_client_no: Option<u32>,
    /// Options per slot, indexed like the assessment's slots.
    pub options: Vec<Vec<RoomOption>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSettings {
    pub origin: NaiveTime,
    pub horizon: i64,
    pub granularity: i64,
    pub transfer: i64,
    pub max_gap: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingProblem {
    pub time: TimeSettings,
    pub mode: SolverMode,
    pub simultaneous_transfers: bool,
    pub doctors_on_duty: Option<u32>,
    pub rooms: Vec<Room>,
    pub activities: Vec<ActivityInfo>,
    pub assessments: Vec<AssessmentPlan>,
    pub clients: Vec<ClientPlan>,
    /// Earliest anchor start per client taken from a configured hint.
    pub arrival_hints: Vec<Option<i64>>,
}

impl SchedulingProblem {
    pub fn assessment_of(&self, client: usize) -> &AssessmentPlan {
        &self.assessments[self.clients[client].assessment]
    }

    pub fn slot_count(&self, client: usize) -> usize {
        self.clients[client].options.len()
    }

    pub fn option(&self, client: usize, slot: usize, option: usize) -> &RoomOption {
        &self.clients[client].options[slot][option]
    }

    pub fn min_duration(&self, client: usize, slot: usize) -> i64 {
        self.clients[client].options[slot]
            .iter()
            .map(|o| o.duration)
            .min()
            .unwrap_or(0)
    }

    /// Makespan no schedule can beat: clients start at least one granularity
    /// step apart, each needs the sum of its shortest options, plus one
    /// transfer per extra floor it must visit.
    pub fn makespan_lower_bound(&self) -> i64 {
        (0..self.clients.len())
            .map(|client| {
                let work: i64 = (0..self.slot_count(client))
                    .map(|slot| self.min_duration(client, slot))
                    .sum();
                let mut floors: Vec<i64> = self.clients[client]
                    .options
                    .iter()
                    .filter_map(|options| {
                        let floor = self.rooms[options.first()?.room].floor;
                        options
                            .iter()
                            .all(|o| self.rooms[o.room].floor == floor)
                            .then_some(floor)
                    })
                    .collect();
                floors.sort_unstable();
                floors.dedup();
                let transfers = floors.len().saturating_sub(1) as i64 * self.time.transfer;
                client as i64 * self.time.granularity + work + transfers
            })
            .max()
            .unwrap_or(0)
    }

    pub fn buckets(&self) -> usize {
        (self.time.horizon / self.time.granularity).max(0) as usize
    }
}
