use crate::core::problem::SchedulingProblem;
use crate::core::solver::Solution;
use crate::domain::scenario::{
    ClientScenario, GeneratedScenario, ScheduledActivity, ScheduledEntry, ScheduledTransfer,
};
use crate::utils::time::format_offset;
use chrono::Utc;

/// Turns a solved schedule back into upstream ids and clock times.
pub fn render(problem: &SchedulingProblem, solution: &Solution) -> GeneratedScenario {
    let origin = problem.time.origin;

    let clients = solution
        .schedule
        .clients
        .iter()
        .enumerate()
        .map(|(index, scheduled)| {
            let client = &problem.clients[index];
            let plan = problem.assessment_of(index);

            let mut entries: Vec<ScheduledEntry> = scheduled
                .placements
                .iter()
                .map(|placement| {
                    let option = problem.option(index, placement.slot, placement.option);
                    let room = &problem.rooms[option.room];
                    let activity = &problem.activities[option.activity];
                    ScheduledEntry::Activity(ScheduledActivity {
                        activity_id: activity.id.clone(),
                        activity_name: activity.name.clone(),
                        activity_color: activity.color.clone(),
                        room_id: room.id.clone(),
                        room_name: room.name.clone(),
                        floor: room.floor,
                        start: format_offset(origin, placement.start),
                        end: format_offset(origin, placement.end),
                        start_minute: placement.start,
                        end_minute: placement.end,
                    })
                })
                .chain(scheduled.transfers.iter().map(|transfer| {
                    ScheduledEntry::Transfer(ScheduledTransfer {
                        from_floor: transfer.from_floor,
                        to_floor: transfer.to_floor,
                        start: format_offset(origin, transfer.start),
                        end: format_offset(origin, transfer.end),
                        start_minute: transfer.start,
                        end_minute: transfer.end,
                    })
                }))
                .collect();
            entries.sort_by_key(|entry| (entry.start_minute(), entry.end_minute()));

            let client_room = plan.anchor.and_then(|anchor| {
                scheduled
                    .placements
                    .iter()
                    .find(|p| p.slot == anchor)
                    .map(|p| {
                        let room = problem.option(index, anchor, p.option).room;
                        problem.rooms[room].name.clone()
                    })
            });

            ClientScenario {
                client_number: client.number,
                client_type: plan.name.clone(),
                marital_type: client.marital_type,
                sex: client.sex,
                single_client_no: client.single_client_no,
                couple_client_no: client.couple_client_no,
                client_room,
                start_time: format_offset(origin, scheduled.first_start().unwrap_or(0)),
                activities: entries,
            }
        })
        .collect();

    GeneratedScenario {
        status: solution.status,
        objective: solution.evaluation.objective(problem.mode),
        gap_minutes: solution.evaluation.gap_minutes,
        makespan_minutes: solution.evaluation.makespan,
        soft_violations: solution.evaluation.soft,
        iterations: solution.iterations,
        elapsed_ms: solution.elapsed.as_millis() as u64,
        generated_at: Utc::now(),
        clients,
    }
}
