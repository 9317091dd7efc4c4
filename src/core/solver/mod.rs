//! Time-bounded anytime search over activity sequences.
//!
//! Every candidate is a sequence of slots per client. The decoder turns it
//! into a timed schedule against shared calendars, the evaluator scores it
//! independently, and the search keeps the best schedule seen.

mod calendar;
pub mod decode;
pub mod evaluate;
mod sequence;

pub use decode::{ClientSchedule, Placement, Schedule, Transfer};
pub use evaluate::{evaluate, Evaluation};

use crate::config::solver_config::SolverSettings;
use crate::core::problem::SchedulingProblem;
use crate::domain::scenario::SolveStatus;
use crate::utils::error::{Result, ScenarioError};
use decode::Decoder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sequence::SequenceRules;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub time_limit: Duration,
    pub max_iterations: Option<u64>,
    pub max_stall_iterations: u64,
    pub seed: u64,
    pub max_arrival_shift_steps: i64,
}

impl SolverOptions {
    /// `budget_minutes` applies unless the settings carry their own limit.
    pub fn new(settings: &SolverSettings, budget_minutes: f64) -> Self {
        let minutes = settings.max_minutes.unwrap_or(budget_minutes).max(0.0);
        Self {
            time_limit: Duration::from_secs_f64(minutes * 60.0),
            max_iterations: settings.max_iterations,
            max_stall_iterations: settings.max_stall_iterations.max(1),
            seed: settings.seed.unwrap_or_else(rand::random),
            max_arrival_shift_steps: settings.max_arrival_shift_steps,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub schedule: Schedule,
    pub evaluation: Evaluation,
    pub status: SolveStatus,
    pub iterations: u64,
    pub elapsed: Duration,
    pub seed: u64,
}

struct Candidate {
    sequences: Vec<Vec<usize>>,
    schedule: Schedule,
    evaluation: Evaluation,
}

pub fn solve(problem: &SchedulingProblem, options: &SolverOptions) -> Result<Solution> {
    let started = Instant::now();
    let mode = problem.mode;
    let mut rng = StdRng::seed_from_u64(options.seed);
    let rules: Vec<SequenceRules> = problem.assessments.iter().map(SequenceRules::new).collect();
    let decoder = Decoder::new(problem, options.max_arrival_shift_steps);
    let lower_bound = problem.makespan_lower_bound();

    tracing::info!(
        "🔍 Solving {} clients (mode {:?}, seed {}, budget {:.1}s, makespan bound {})",
        problem.clients.len(),
        mode,
        options.seed,
        options.time_limit.as_secs_f64(),
        lower_bound
    );

    let run = |sequences: Vec<Vec<usize>>, use_hints: bool, rng: &mut StdRng| {
        let schedule = decoder.decode(&sequences, use_hints, rng);
        let evaluation = evaluate(problem, &schedule);
        Candidate {
            sequences,
            schedule,
            evaluation,
        }
    };
    let fresh = |rng: &mut StdRng| -> Vec<Vec<usize>> {
        problem
            .clients
            .iter()
            .map(|client| rules[client.assessment].random_sequence(rng))
            .collect()
    };
    let is_optimal = |evaluation: &Evaluation| {
        evaluation.hard == 0
            && evaluation.soft == 0
            && evaluation.gap_minutes == 0
            && evaluation.makespan <= lower_bound
    };

    let initial = fresh(&mut rng);
    let mut best = run(initial, true, &mut rng);
    let mut iterations = 1u64;
    let mut stall = 0u64;

    while !is_optimal(&best.evaluation) {
        if started.elapsed() >= options.time_limit {
            tracing::debug!("⏱️ Time budget spent");
            break;
        }
        if options.max_iterations.is_some_and(|max| iterations >= max) {
            tracing::debug!("Iteration limit reached");
            break;
        }
        if stall >= options.max_stall_iterations {
            tracing::debug!("No improvement for {} iterations", stall);
            break;
        }

        let sequences = if rng.gen_bool(0.7) {
            mutate(problem, &rules, &best.sequences, &mut rng)
        } else {
            fresh(&mut rng)
        };
        let candidate = run(sequences, false, &mut rng);
        iterations += 1;

        if candidate.evaluation.key(mode) < best.evaluation.key(mode) {
            tracing::debug!(
                "✨ Iteration {}: hard {} soft {} gaps {} makespan {}",
                iterations,
                candidate.evaluation.hard,
                candidate.evaluation.soft,
                candidate.evaluation.gap_minutes,
                candidate.evaluation.makespan
            );
            best = candidate;
            stall = 0;
        } else {
            stall += 1;
        }
    }

    let elapsed = started.elapsed();
    if !best.evaluation.is_feasible() {
        tracing::warn!(
            "❌ No feasible schedule after {} iterations: {:?}",
            iterations,
            best.evaluation.violations
        );
        return Err(ScenarioError::InfeasibleError {
            message: format!(
                "{} hard rule violations remain after {} iterations ({})",
                best.evaluation.hard,
                iterations,
                best.evaluation
                    .violations
                    .first()
                    .map(String::as_str)
                    .unwrap_or("no detail")
            ),
        });
    }

    let status = if is_optimal(&best.evaluation) {
        SolveStatus::Optimal
    } else {
        SolveStatus::Feasible
    };
    tracing::info!(
        "🏁 {} after {} iterations in {:.2}s: gaps {} min, makespan {} min, {} soft violations",
        status.as_str(),
        iterations,
        elapsed.as_secs_f64(),
        best.evaluation.gap_minutes,
        best.evaluation.makespan,
        best.evaluation.soft
    );

    Ok(Solution {
        schedule: best.schedule,
        evaluation: best.evaluation,
        status,
        iterations,
        elapsed,
        seed: options.seed,
    })
}

/// Neighbour of `sequences`: a swap in one client's order, or a fresh order
/// for that client when no valid swap exists.
fn mutate(
    problem: &SchedulingProblem,
    rules: &[SequenceRules],
    sequences: &[Vec<usize>],
    rng: &mut StdRng,
) -> Vec<Vec<usize>> {
    let mut next = sequences.to_vec();
    if next.is_empty() {
        return next;
    }
    let moves = rng.gen_range(1..=2);
    for _ in 0..moves {
        let client = rng.gen_range(0..next.len());
        let client_rules = &rules[problem.clients[client].assessment];
        next[client] = match client_rules.neighbour(&next[client], rng) {
            Some(sequence) => sequence,
            None => client_rules.random_sequence(rng),
        };
    }
    next
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::solver_config::SolverMode;
    use crate::core::problem::*;
    use crate::domain::model::{MaritalType, Sex};
    use chrono::NaiveTime;

    /// Rooms: 0, 3, 6 client rooms (floor 0), 1-2 MRI (floor 1), 4-5 doctor
    /// rooms (floor 0). Slots: check-in 20, MRI 30, consultation 30, lunch 20.
    pub fn problem_with(
        clients: usize,
        tweak: impl FnOnce(&mut SchedulingProblem),
    ) -> SchedulingProblem {
        let room = |id: &str, floor: i64, doctor: bool| Room {
            id: id.to_string(),
            name: id.to_string(),
            floor,
            is_doctor_room: doctor,
        };
        let option = |room: usize, activity: usize, duration: i64| RoomOption {
            room,
            activity,
            duration,
        };
        let slot = |key: &str, exclusive: bool, staggered: bool, capacity: Option<u32>| SlotPlan {
            key: key.to_string(),
            exclusive,
            staggered,
            capacity,
        };

        let mut problem = SchedulingProblem {
            time: TimeSettings {
                origin: NaiveTime::from_hms_opt(7, 15, 0).unwrap(),
                horizon: 945,
                granularity: 5,
                transfer: 5,
                max_gap: 10,
            },
            mode: SolverMode::Gaps,
            simultaneous_transfers: false,
            doctors_on_duty: None,
            rooms: vec![
                room("client-a", 0, false),
                room("mri-1", 1, false),
                room("mri-2", 1, false),
                room("client-b", 0, false),
                room("doctor-1", 0, true),
                room("doctor-2", 0, true),
                room("client-c", 0, false),
            ],
            activities: ["Check-in", "MRI", "First Consultation", "Lunch"]
                .iter()
                .enumerate()
                .map(|(i, name)| ActivityInfo {
                    id: format!("a-{}", i),
                    name: name.to_string(),
                    color: None,
                })
                .collect(),
            assessments: vec![AssessmentPlan {
                name: "Elite".to_string(),
                slots: vec![
                    slot("Check-in", true, false, None),
                    slot("MRI", false, true, None),
                    slot("First Consultation", false, false, Some(3)),
                    slot("Lunch", false, false, None),
                ],
                anchor: Some(0),
                same_room_as_anchor: vec![3],
                conditions: vec![],
            }],
            clients: (0..clients)
                .map(|i| ClientPlan {
                    number: i as u32 + 1,
                    assessment: 0,
                    sex: Sex::Male,
                    marital_type: MaritalType::Single,
                    single_client_no: Some(i as u32 + 1),
                    couple_client_no: None,
                    options: vec![
                        vec![option(0, 0, 20), option(3, 0, 20), option(6, 0, 20)],
                        vec![option(1, 1, 30), option(2, 1, 30)],
                        vec![option(4, 2, 30), option(5, 2, 30)],
                        vec![option(0, 3, 20), option(3, 3, 20), option(6, 3, 20)],
                    ],
                })
                .collect(),
            arrival_hints: vec![None; clients],
        };
        tweak(&mut problem);
        problem
    }
}
