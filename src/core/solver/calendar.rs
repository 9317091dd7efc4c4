use crate::core::problem::SchedulingProblem;
use std::collections::{HashMap, HashSet};

/// Scheduling properties of one assessment slot, shared across assessments
/// through the slot key.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotTraits {
    pub key: usize,
    pub exclusive: bool,
    pub staggered: bool,
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Default)]
struct KeyState {
    busy: Vec<bool>,
    starts: HashSet<i64>,
    ends: HashSet<i64>,
    hosted: HashMap<usize, u32>,
}

/// Bucketed occupancy of every shared resource. A bucket is one
/// granularity step.
#[derive(Debug, Clone)]
pub(crate) struct Calendar {
    granularity: i64,
    horizon: i64,
    traits: Vec<Vec<SlotTraits>>,
    rooms: Vec<Vec<bool>>,
    keys: Vec<KeyState>,
    transfers: Vec<bool>,
    check_transfers: bool,
    doctors: Vec<u32>,
    doctor_limit: Option<u32>,
    doctor_rooms: Vec<bool>,
    client_rooms: Vec<bool>,
}

impl Calendar {
    pub fn new(problem: &SchedulingProblem) -> Self {
        let buckets = problem.buckets();
        let mut key_ids: HashMap<String, usize> = HashMap::new();
        let traits = problem
            .assessments
            .iter()
            .map(|plan| {
                plan.slots
                    .iter()
                    .enumerate()
                    .map(|(slot, slot_plan)| {
                        let next = key_ids.len();
                        let key = *key_ids
                            .entry(slot_plan.key.trim().to_lowercase())
                            .or_insert(next);
                        // 每位客人的 check-in 房間不可共用
                        let capacity = if plan.anchor == Some(slot) {
                            Some(slot_plan.capacity.map_or(1, |c| c.min(1)))
                        } else {
                            slot_plan.capacity
                        };
                        SlotTraits {
                            key,
                            exclusive: slot_plan.exclusive,
                            staggered: slot_plan.staggered,
                            capacity,
                        }
                    })
                    .collect()
            })
            .collect();

        let keys = (0..key_ids.len())
            .map(|_| KeyState {
                busy: vec![false; buckets],
                ..KeyState::default()
            })
            .collect();

        Self {
            granularity: problem.time.granularity,
            horizon: problem.time.horizon,
            traits,
            rooms: vec![vec![false; buckets]; problem.rooms.len()],
            keys,
            transfers: vec![false; buckets],
            check_transfers: !problem.simultaneous_transfers,
            doctors: vec![0; buckets],
            doctor_limit: problem.doctors_on_duty,
            doctor_rooms: problem.rooms.iter().map(|r| r.is_doctor_room).collect(),
            client_rooms: vec![false; problem.rooms.len()],
        }
    }

    fn range(&self, start: i64, end: i64) -> std::ops::Range<usize> {
        let first = (start / self.granularity).max(0) as usize;
        let last = (end / self.granularity).max(0) as usize;
        first..last
    }

    /// Whether `room` can host the slot over `[start, end)`.
    pub fn fits(&self, assessment: usize, slot: usize, room: usize, start: i64, end: i64) -> bool {
        if start < 0 || end > self.horizon || end <= start {
            return false;
        }
        let traits = self.traits[assessment][slot];
        let range = self.range(start, end);

        if self.rooms[room][range.clone()].iter().any(|&busy| busy) {
            return false;
        }

        let key = &self.keys[traits.key];
        if traits.exclusive && key.busy[range.clone()].iter().any(|&busy| busy) {
            return false;
        }
        if traits.staggered
            && (key.starts.contains(&start)
                || key.ends.contains(&start)
                || key.starts.contains(&end)
                || key.ends.contains(&end))
        {
            return false;
        }
        if let Some(capacity) = traits.capacity {
            if key.hosted.get(&room).copied().unwrap_or(0) >= capacity {
                return false;
            }
        }

        if let (Some(limit), true) = (self.doctor_limit, self.doctor_rooms[room]) {
            if self.doctors[range].iter().any(|&n| n >= limit) {
                return false;
            }
        }

        true
    }

    /// Earliest start at or after `from` where the slot fits.
    pub fn earliest_fit(
        &self,
        assessment: usize,
        slot: usize,
        room: usize,
        duration: i64,
        from: i64,
    ) -> Option<i64> {
        let g = self.granularity;
        let mut start = (from.max(0) + g - 1) / g * g;
        while start + duration <= self.horizon {
            if self.fits(assessment, slot, room, start, start + duration) {
                return Some(start);
            }
            start += g;
        }
        None
    }

    pub fn transfer_free(&self, start: i64, end: i64) -> bool {
        if end > self.horizon {
            return false;
        }
        !self.check_transfers || !self.transfers[self.range(start, end)].iter().any(|&busy| busy)
    }

    pub fn is_client_room_claimed(&self, room: usize) -> bool {
        self.client_rooms[room]
    }

    pub fn book(&mut self, assessment: usize, slot: usize, room: usize, start: i64, end: i64) {
        let range = self.range(start, end.min(self.horizon));
        let traits = self.traits[assessment][slot];

        for busy in &mut self.rooms[room][range.clone()] {
            *busy = true;
        }

        let key = &mut self.keys[traits.key];
        if traits.exclusive {
            for busy in &mut key.busy[range.clone()] {
                *busy = true;
            }
        }
        if traits.staggered {
            key.starts.insert(start);
            key.ends.insert(end);
        }
        if traits.capacity.is_some() {
            *key.hosted.entry(room).or_insert(0) += 1;
        }

        if self.doctor_rooms[room] {
            for load in &mut self.doctors[range] {
                *load += 1;
            }
        }
    }

    pub fn book_transfer(&mut self, start: i64, end: i64) {
        let range = self.range(start, end.min(self.horizon));
        for busy in &mut self.transfers[range] {
            *busy = true;
        }
    }

    pub fn claim_client_room(&mut self, room: usize) {
        self.client_rooms[room] = true;
    }
}
