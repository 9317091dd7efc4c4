use super::decode::Schedule;
use crate::config::solver_config::SolverMode;
use crate::core::problem::{Rule, SchedulingProblem};
use std::collections::HashMap;

const MAX_REPORTED_VIOLATIONS: usize = 20;

/// Outcome of checking a schedule against every rule, independently of how
/// it was built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub hard: u32,
    pub soft: u32,
    pub gap_minutes: i64,
    pub makespan: i64,
    pub violations: Vec<String>,
}

impl Evaluation {
    pub fn is_feasible(&self) -> bool {
        self.hard == 0
    }

    /// Lexicographic comparison key; smaller is better.
    pub fn key(&self, mode: SolverMode) -> (u32, u32, i64, i64) {
        match mode {
            SolverMode::Gaps => (self.hard, self.soft, self.gap_minutes, self.makespan),
            SolverMode::Makespan => (self.hard, self.soft, self.makespan, self.gap_minutes),
        }
    }

    pub fn objective(&self, mode: SolverMode) -> i64 {
        match mode {
            SolverMode::Gaps => self.gap_minutes,
            SolverMode::Makespan => self.makespan,
        }
    }

    fn hard(&mut self, message: String) {
        self.hard += 1;
        self.report(message);
    }

    fn soft(&mut self, message: String) {
        self.soft += 1;
        self.report(message);
    }

    fn report(&mut self, message: String) {
        if self.violations.len() < MAX_REPORTED_VIOLATIONS {
            self.violations.push(message);
        }
    }
}

pub fn evaluate(problem: &SchedulingProblem, schedule: &Schedule) -> Evaluation {
    let mut eval = Evaluation::default();
    let time = &problem.time;
    let g = time.granularity;

    if schedule.clients.len() != problem.clients.len() {
        eval.hard(format!(
            "{} clients scheduled, {} expected",
            schedule.clients.len(),
            problem.clients.len()
        ));
        return eval;
    }

    let mut room_use: HashMap<usize, Vec<(i64, i64)>> = HashMap::new();
    let mut exclusive_use: HashMap<String, Vec<(i64, i64)>> = HashMap::new();
    let mut hosted: HashMap<(String, usize), u32> = HashMap::new();
    let mut anchor_hosted: HashMap<usize, u32> = HashMap::new();
    let mut staggered: HashMap<String, (Vec<i64>, Vec<i64>)> = HashMap::new();
    let mut doctor_load = vec![0u32; problem.buckets()];
    let mut transfers: Vec<(i64, i64)> = Vec::new();
    let mut previous_first: Option<i64> = None;

    for (client, scheduled) in schedule.clients.iter().enumerate() {
        let number = problem.clients[client].number;
        let plan = problem.assessment_of(client);
        let slots = problem.slot_count(client);

        // slot -> (position, start, end, room)
        let mut performed: Vec<Option<(usize, i64, i64, usize)>> = vec![None; slots];
        for (position, placement) in scheduled.placements.iter().enumerate() {
            let Some(option) = problem.clients[client]
                .options
                .get(placement.slot)
                .and_then(|options| options.get(placement.option))
            else {
                eval.hard(format!("client {}: unknown option for slot {}", number, placement.slot));
                continue;
            };
            if performed[placement.slot].is_some() {
                eval.hard(format!(
                    "client {}: '{}' scheduled twice",
                    number, plan.slots[placement.slot].key
                ));
                continue;
            }
            if placement.end - placement.start != option.duration
                || placement.start < 0
                || placement.end > time.horizon
                || placement.start % g != 0
            {
                eval.hard(format!(
                    "client {}: '{}' at {}..{} is outside the day grid",
                    number, plan.slots[placement.slot].key, placement.start, placement.end
                ));
            }
            performed[placement.slot] =
                Some((position, placement.start, placement.end, option.room));

            let slot_plan = &plan.slots[placement.slot];
            let key = slot_plan.key.trim().to_lowercase();
            room_use
                .entry(option.room)
                .or_default()
                .push((placement.start, placement.end));
            if slot_plan.exclusive {
                exclusive_use
                    .entry(key.clone())
                    .or_default()
                    .push((placement.start, placement.end));
            }
            if slot_plan.staggered {
                let (starts, ends) = staggered.entry(key.clone()).or_default();
                starts.push(placement.start);
                ends.push(placement.end);
            }
            if let Some(capacity) = slot_plan.capacity {
                let count = hosted.entry((key.clone(), option.room)).or_insert(0);
                *count += 1;
                if *count == capacity + 1 {
                    eval.hard(format!(
                        "room {} hosts '{}' for more than {} clients",
                        problem.rooms[option.room].name, slot_plan.key, capacity
                    ));
                }
            }
            if plan.anchor == Some(placement.slot) {
                let count = anchor_hosted.entry(option.room).or_insert(0);
                *count += 1;
                if *count == 2 {
                    eval.hard(format!(
                        "room {} is the client room of several clients",
                        problem.rooms[option.room].name
                    ));
                }
            }
            if problem.rooms[option.room].is_doctor_room {
                let first = (placement.start / g).max(0) as usize;
                let last = ((placement.end / g).max(0) as usize).min(doctor_load.len());
                for load in doctor_load.iter_mut().take(last).skip(first) {
                    *load += 1;
                }
            }
        }

        for (slot, done) in performed.iter().enumerate() {
            if done.is_none() {
                eval.hard(format!("client {}: '{}' not scheduled", number, plan.slots[slot].key));
            }
        }

        // sequence, transfers and idle time
        let mut matched_transfers = 0;
        for pair in scheduled.placements.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let options = &problem.clients[client].options;
            let (Some(prev_option), Some(next_option)) = (
                options.get(prev.slot).and_then(|o| o.get(prev.option)),
                options.get(next.slot).and_then(|o| o.get(next.option)),
            ) else {
                continue;
            };
            let from_floor = problem.rooms[prev_option.room].floor;
            let to_floor = problem.rooms[next_option.room].floor;
            let ready = if from_floor != to_floor {
                let found = scheduled.transfers.iter().any(|t| {
                    t.start == prev.end
                        && t.end == prev.end + time.transfer
                        && t.from_floor == from_floor
                        && t.to_floor == to_floor
                });
                if found {
                    matched_transfers += 1;
                } else {
                    eval.hard(format!(
                        "client {}: no transfer from floor {} to floor {} at {}",
                        number, from_floor, to_floor, prev.end
                    ));
                }
                prev.end + time.transfer
            } else {
                prev.end
            };

            let idle = next.start - ready;
            if idle < 0 {
                eval.hard(format!(
                    "client {}: '{}' starts before the previous activity is over",
                    number, plan.slots[next.slot].key
                ));
            } else {
                eval.gap_minutes += idle;
                if idle > time.max_gap {
                    eval.hard(format!(
                        "client {}: {} idle minutes before '{}' (max {})",
                        number, idle, plan.slots[next.slot].key, time.max_gap
                    ));
                }
            }
        }
        if scheduled.transfers.len() != matched_transfers {
            eval.hard(format!("client {}: unexpected transfers", number));
        }
        for transfer in &scheduled.transfers {
            transfers.push((transfer.start, transfer.end));
            if transfer.end > time.horizon {
                eval.hard(format!("client {}: transfer after the end of day", number));
            }
        }

        // arrival order
        if let Some(first) = scheduled.first_start() {
            match previous_first {
                None if first != 0 => eval.hard(format!(
                    "client {}: first activity starts at {}, not 0",
                    number, first
                )),
                Some(previous) if first <= previous => eval.hard(format!(
                    "client {}: starts at {}, not after the previous client ({})",
                    number, first, previous
                )),
                _ => {}
            }
            previous_first = Some(first);
        }
        if let Some(last) = scheduled.placements.iter().map(|p| p.end).max() {
            eval.makespan = eval.makespan.max(last);
        }

        // client room
        if let Some(anchor) = plan.anchor {
            if let Some((_, _, _, anchor_room)) = performed[anchor] {
                for &companion in &plan.same_room_as_anchor {
                    if let Some((_, _, _, room)) = performed[companion] {
                        if room != anchor_room {
                            eval.hard(format!(
                                "client {}: '{}' is not in the client room",
                                number, plan.slots[companion].key
                            ));
                        }
                    }
                }
            }
        }

        // conditions
        for condition in &plan.conditions {
            let violated = condition.rules.iter().any(|rule| !rule_holds(rule, &performed));
            if !violated {
                continue;
            }
            let message = format!(
                "client {}: condition {} violated",
                number, condition.condition_id
            );
            if condition.mandatory {
                eval.hard(message);
            } else {
                eval.soft(message);
            }
        }
    }

    for (room, intervals) in room_use {
        let overlaps = count_overlaps(intervals);
        if overlaps > 0 {
            eval.hard(format!(
                "room {} double-booked {} times",
                problem.rooms[room].name, overlaps
            ));
        }
    }
    for (key, intervals) in exclusive_use {
        let overlaps = count_overlaps(intervals);
        if overlaps > 0 {
            eval.hard(format!("'{}' performed by several clients at once", key));
        }
    }
    for (key, (mut starts, mut ends)) in staggered {
        let coinciding = starts.iter().filter(|s| ends.contains(s)).count();
        starts.sort_unstable();
        ends.sort_unstable();
        let repeated = starts.windows(2).filter(|w| w[0] == w[1]).count()
            + ends.windows(2).filter(|w| w[0] == w[1]).count();
        if coinciding + repeated > 0 {
            eval.hard(format!("'{}' starts or ends coincide", key));
        }
    }
    if !problem.simultaneous_transfers {
        let overlaps = count_overlaps(transfers);
        if overlaps > 0 {
            eval.hard(format!("{} simultaneous transfers", overlaps));
        }
    }
    if let Some(limit) = problem.doctors_on_duty {
        if let Some(bucket) = doctor_load.iter().position(|&load| load > limit) {
            eval.hard(format!(
                "more than {} clients with a doctor at minute {}",
                limit,
                bucket as i64 * g
            ));
        }
    }

    eval
}

fn rule_holds(rule: &Rule, performed: &[Option<(usize, i64, i64, usize)>]) -> bool {
    let get = |slot: usize| performed.get(slot).copied().flatten();
    let Some((position, start, end, _)) = get(rule.slot()) else {
        return false;
    };
    match *rule {
        Rule::EndsBeforeStartOf { other, .. } => get(other).is_some_and(|(_, s, _, _)| end <= s),
        Rule::StartsAfterEndOf { other, .. } => get(other).is_some_and(|(_, _, e, _)| start >= e),
        Rule::StartsAtEndOf { other, .. } => get(other).is_some_and(|(_, _, e, _)| start == e),
        Rule::EndsBy { minute, .. } => end <= minute,
        Rule::StartsFrom { minute, .. } => start >= minute,
        Rule::StartsWithin { anchor, minutes, .. } => {
            get(anchor).is_some_and(|(_, s, e, _)| start >= e && start <= s + minutes)
        }
        Rule::OrderBelow { order, .. } => position < order,
        Rule::OrderAbove { order, .. } => position > order,
        Rule::OrderAt { order, .. } => position == order,
    }
}

fn count_overlaps(mut intervals: Vec<(i64, i64)>) -> usize {
    intervals.sort_unstable();
    let mut overlaps = 0;
    let mut busy_until = i64::MIN;
    for (start, end) in intervals {
        if start < busy_until {
            overlaps += 1;
        }
        busy_until = busy_until.max(end);
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::solver::decode::{ClientSchedule, Placement, Transfer};
    use crate::core::solver::test_support::problem_with;

    fn placement(slot: usize, option: usize, start: i64, end: i64) -> Placement {
        Placement {
            slot,
            option,
            start,
            end,
        }
    }

    /// check-in 0-20 room 0, MRI 25-55 room 1, consultation 60-90 room 4,
    /// lunch 90-110 room 0
    fn single_client() -> ClientSchedule {
        ClientSchedule {
            placements: vec![
                placement(0, 0, 0, 20),
                placement(1, 0, 25, 55),
                placement(2, 0, 60, 90),
                placement(3, 0, 90, 110),
            ],
            transfers: vec![
                Transfer {
                    start: 20,
                    end: 25,
                    from_floor: 0,
                    to_floor: 1,
                },
                Transfer {
                    start: 55,
                    end: 60,
                    from_floor: 1,
                    to_floor: 0,
                },
            ],
        }
    }

    #[test]
    fn test_valid_schedule_has_no_violation() {
        let problem = problem_with(1, |_| {});
        let eval = evaluate(&problem, &Schedule {
            clients: vec![single_client()],
        });
        assert_eq!(eval.hard, 0, "{:?}", eval.violations);
        assert_eq!(eval.gap_minutes, 0);
        assert_eq!(eval.makespan, 110);
    }

    #[test]
    fn test_missing_transfer_and_gap_are_hard() {
        let problem = problem_with(1, |p| p.time.max_gap = 5);
        let mut client = single_client();
        client.transfers.remove(0);
        client.placements[3] = placement(3, 0, 100, 120);
        let eval = evaluate(&problem, &Schedule {
            clients: vec![client],
        });
        assert_eq!(eval.hard, 2, "{:?}", eval.violations);
        assert_eq!(eval.gap_minutes, 10);
    }

    #[test]
    fn test_first_client_must_start_at_zero() {
        let problem = problem_with(1, |_| {});
        let mut client = single_client();
        for p in &mut client.placements {
            p.start += 5;
            p.end += 5;
        }
        for t in &mut client.transfers {
            t.start += 5;
            t.end += 5;
        }
        let eval = evaluate(&problem, &Schedule {
            clients: vec![client],
        });
        assert_eq!(eval.hard, 1, "{:?}", eval.violations);
    }

    #[test]
    fn test_shared_rooms_and_transfers_are_detected() {
        let problem = problem_with(2, |_| {});
        let first = single_client();
        let mut second = single_client();
        // same anchor room and overlapping check-in
        for p in &mut second.placements {
            p.start += 5;
            p.end += 5;
        }
        for t in &mut second.transfers {
            t.start += 5;
            t.end += 5;
        }
        let eval = evaluate(&problem, &Schedule {
            clients: vec![first,
            second],
        });
        assert!(eval.hard >= 4, "{:?}", eval.violations);
        assert!(eval.violations.iter().any(|v| v.contains("client room of several")));
        assert!(eval.violations.iter().any(|v| v.contains("double-booked")));
    }

    #[test]
    fn test_soft_condition_counts_separately() {
        let problem = problem_with(1, |p| {
            p.assessments[0].conditions.push(crate::core::problem::CompiledCondition {
                condition_id: "late-lunch".to_string(),
                mandatory: false,
                rules: vec![Rule::StartsFrom {
                    slot: 3,
                    minute: 120,
                }],
            });
        });
        let eval = evaluate(&problem, &Schedule {
            clients: vec![single_client()],
        });
        assert_eq!(eval.hard, 0);
        assert_eq!(eval.soft, 1);
        assert!(eval.key(SolverMode::Gaps) > (0, 0, 0, 0));
    }

    #[test]
    fn test_key_orders_by_mode_objective() {
        let tight_gaps = Evaluation {
            gap_minutes: 10,
            makespan: 200,
            ..Default::default()
        };
        let short_day = Evaluation {
            gap_minutes: 30,
            makespan: 100,
            ..Default::default()
        };
        assert!(tight_gaps.key(SolverMode::Gaps) < short_day.key(SolverMode::Gaps));
        assert!(short_day.key(SolverMode::Makespan) < tight_gaps.key(SolverMode::Makespan));
        assert_eq!(short_day.objective(SolverMode::Makespan), 100);

        // hard 違規永遠優先
        let infeasible = Evaluation {
            hard: 1,
            ..Default::default()
        };
        assert!(short_day.key(SolverMode::Makespan) < infeasible.key(SolverMode::Makespan));
    }

    #[test]
    fn test_rule_holds_for_each_rule_shape() {
        // check-in 0-20, MRI 25-55, consultation 60-90, lunch 90-110
        let performed: Vec<Option<(usize, i64, i64, usize)>> = vec![
            Some((0, 0, 20, 0)),
            Some((1, 25, 55, 1)),
            Some((2, 60, 90, 4)),
            Some((3, 90, 110, 0)),
        ];
        let holds = |rule: Rule| rule_holds(&rule, &performed);

        assert!(holds(Rule::StartsAtEndOf { slot: 3, other: 2 }));
        assert!(!holds(Rule::StartsAtEndOf { slot: 2, other: 1 }));

        assert!(holds(Rule::StartsWithin {
            slot: 1,
            anchor: 0,
            minutes: 30,
        }));
        assert!(!holds(Rule::StartsWithin {
            slot: 1,
            anchor: 0,
            minutes: 20,
        }));
        assert!(!holds(Rule::StartsWithin {
            slot: 0,
            anchor: 1,
            minutes: 60,
        }));

        // consultation between MRI and lunch
        assert!(holds(Rule::StartsAfterEndOf { slot: 2, other: 1 }));
        assert!(holds(Rule::EndsBeforeStartOf { slot: 2, other: 3 }));
        assert!(!holds(Rule::StartsAfterEndOf { slot: 1, other: 2 }));
        assert!(!holds(Rule::EndsBeforeStartOf { slot: 3, other: 2 }));

        // MRI strictly between positions 0 and 2
        assert!(holds(Rule::OrderAbove { slot: 1, order: 0 }));
        assert!(holds(Rule::OrderBelow { slot: 1, order: 2 }));
        assert!(!holds(Rule::OrderBelow { slot: 2, order: 2 }));
        assert!(!holds(Rule::OrderAbove { slot: 0, order: 0 }));
        assert!(holds(Rule::OrderAt { slot: 3, order: 3 }));

        assert!(holds(Rule::EndsBy {
            slot: 2,
            minute: 90,
        }));
        assert!(!holds(Rule::StartsFrom {
            slot: 2,
            minute: 65,
        }));

        let missing: Vec<Option<(usize, i64, i64, usize)>> = vec![Some((0, 0, 20, 0)), None];
        assert!(!rule_holds(&Rule::StartsAtEndOf { slot: 1, other: 0 }, &missing));
        assert!(!rule_holds(&Rule::StartsAfterEndOf { slot: 0, other: 1 }, &missing));
    }

    #[test]
    fn test_room_capacity_exceeded_is_hard() {
        let problem = problem_with(2, |p| p.assessments[0].slots[2].capacity = Some(1));
        let first = single_client();
        // 第二位客戶換報到房，同一間醫師房
        let mut second = single_client();
        for p in &mut second.placements {
            p.start += 100;
            p.end += 100;
        }
        second.placements[0].option = 1;
        second.placements[3].option = 1;
        for t in &mut second.transfers {
            t.start += 100;
            t.end += 100;
        }

        let eval = evaluate(&problem, &Schedule {
            clients: vec![first.clone(),
            second.clone()],
        });
        assert_eq!(eval.hard, 1, "{:?}", eval.violations);
        assert!(eval.violations[0].contains("more than 1 clients"));

        second.placements[2].option = 1;
        let eval = evaluate(&problem, &Schedule {
            clients: vec![first,
            second],
        });
        assert_eq!(eval.hard, 0, "{:?}", eval.violations);
    }
}
