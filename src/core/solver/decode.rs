use super::calendar::Calendar;
use crate::core::problem::{Rule, SchedulingProblem};
use rand::rngs::StdRng;
use rand::Rng;

/// One slot performed by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub slot: usize,
    pub option: usize,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub start: i64,
    pub end: i64,
    pub from_floor: i64,
    pub to_floor: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSchedule {
    /// In the order the client performs them.
    pub placements: Vec<Placement>,
    pub transfers: Vec<Transfer>,
}

impl ClientSchedule {
    pub fn first_start(&self) -> Option<i64> {
        self.placements.first().map(|p| p.start)
    }

    pub fn last_end(&self) -> Option<i64> {
        self.placements.last().map(|p| p.end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub clients: Vec<ClientSchedule>,
}

/// Serial schedule generation: clients in order, each client's slots in
/// its sequence, every slot at the earliest feasible minute.
pub(crate) struct Decoder<'a> {
    problem: &'a SchedulingProblem,
    max_shift_steps: i64,
}

struct Attempt {
    schedule: ClientSchedule,
    conflicts: u32,
    gap: i64,
}

impl Attempt {
    fn score(&self) -> (u32, i64, i64) {
        (self.conflicts, self.gap, self.schedule.last_end().unwrap_or(0))
    }
}

impl<'a> Decoder<'a> {
    pub fn new(problem: &'a SchedulingProblem, max_shift_steps: i64) -> Self {
        Self {
            problem,
            max_shift_steps: max_shift_steps.max(0),
        }
    }

    pub fn decode(&self, sequences: &[Vec<usize>], use_hints: bool, rng: &mut StdRng) -> Schedule {
        let problem = self.problem;
        let g = problem.time.granularity;
        let mut calendar = Calendar::new(problem);
        let mut clients = Vec::with_capacity(problem.clients.len());
        let mut previous_first: Option<i64> = None;

        for (client, sequence) in sequences.iter().enumerate() {
            let mut base = previous_first.map_or(0, |first| first + g);
            if use_hints && client > 0 {
                if let Some(hint) = problem.arrival_hints.get(client).copied().flatten() {
                    base = base.max(hint);
                }
            }
            // 第一位客人固定在 0 分開始
            let shifts = if client == 0 { 0 } else { self.max_shift_steps };

            let mut best: Option<Attempt> = None;
            for step in 0..=shifts {
                let release = base + step * g;
                if release >= problem.time.horizon && best.is_some() {
                    break;
                }
                let attempt = self.place_client(&calendar, client, sequence, release, rng);
                let clean = attempt.conflicts == 0 && attempt.gap == 0;
                if best.as_ref().map_or(true, |b| attempt.score() < b.score()) {
                    best = Some(attempt);
                }
                if clean {
                    break;
                }
            }

            let schedule = best.map(|b| b.schedule).unwrap_or_default();
            self.commit(&mut calendar, client, &schedule);
            previous_first = schedule.first_start().or(previous_first);
            clients.push(schedule);
        }

        Schedule { clients }
    }

    fn commit(&self, calendar: &mut Calendar, client: usize, schedule: &ClientSchedule) {
        let plan = self.problem.assessment_of(client);
        for placement in &schedule.placements {
            let option = self.problem.option(client, placement.slot, placement.option);
            calendar.book(
                self.problem.clients[client].assessment,
                placement.slot,
                option.room,
                placement.start,
                placement.end,
            );
            if plan.in_client_room(placement.slot) {
                calendar.claim_client_room(option.room);
            }
        }
        for transfer in &schedule.transfers {
            calendar.book_transfer(transfer.start, transfer.end);
        }
    }

    fn place_client(
        &self,
        calendar: &Calendar,
        client: usize,
        sequence: &[usize],
        release: i64,
        rng: &mut StdRng,
    ) -> Attempt {
        let problem = self.problem;
        let time = &problem.time;
        let assessment = problem.clients[client].assessment;
        let plan = problem.assessment_of(client);

        let mut placed: Vec<Option<(i64, i64)>> = vec![None; problem.slot_count(client)];
        let mut attempt = Attempt {
            schedule: ClientSchedule::default(),
            conflicts: 0,
            gap: 0,
        };
        let mut client_room: Option<usize> = None;
        let mut previous: Option<(i64, i64)> = None;

        for &slot in sequence {
            let lower_bound = self.lower_bound(client, slot, &placed);
            let options = &problem.clients[client].options[slot];
            let in_client_room = plan.in_client_room(slot);

            let mut usable: Vec<usize> = (0..options.len())
                .filter(|&i| {
                    let room = options[i].room;
                    !in_client_room
                        || match client_room {
                            Some(chosen) => chosen == room,
                            None => !calendar.is_client_room_claimed(room),
                        }
                })
                .collect();
            let mut penalty = 0;
            if usable.is_empty() {
                usable = (0..options.len()).collect();
                penalty = 1;
            }

            let mut best: Option<((u32, i64, u32), Placement, Option<Transfer>, i64, i64)> = None;
            for index in usable {
                let option = options[index];
                let floor = problem.rooms[option.room].floor;
                let (ready, transfer) = match previous {
                    None => (release, None),
                    Some((end, from_floor)) if from_floor != floor => (
                        end + time.transfer,
                        Some(Transfer {
                            start: end,
                            end: end + time.transfer,
                            from_floor,
                            to_floor: floor,
                        }),
                    ),
                    Some((end, _)) => (end, None),
                };

                let from = ready.max(lower_bound);
                let earliest =
                    calendar.earliest_fit(assessment, slot, option.room, option.duration, from);
                let (start, fits) = match earliest {
                    Some(start) => (start, true),
                    None => (from, false),
                };
                let end = start + option.duration;
                let idle = if previous.is_some() { start - ready } else { 0 };

                let mut conflicts = penalty + u32::from(!fits);
                if let Some(t) = transfer {
                    conflicts += u32::from(!calendar.transfer_free(t.start, t.end));
                }
                conflicts += u32::from(idle > time.max_gap);

                let key = (conflicts, end, rng.gen::<u32>());
                if best.as_ref().map_or(true, |(k, ..)| key < *k) {
                    best = Some((
                        key,
                        Placement {
                            slot,
                            option: index,
                            start,
                            end,
                        },
                        transfer,
                        idle,
                        floor,
                    ));
                }
            }

            let Some(((conflicts, ..), placement, transfer, idle, floor)) = best else {
                continue;
            };
            attempt.conflicts += conflicts;
            attempt.gap += idle;
            if let Some(transfer) = transfer {
                attempt.schedule.transfers.push(transfer);
            }
            if in_client_room && client_room.is_none() {
                client_room = Some(options[placement.option].room);
            }
            placed[slot] = Some((placement.start, placement.end));
            previous = Some((placement.end, floor));
            attempt.schedule.placements.push(placement);
        }

        attempt
    }

    /// Earliest start the client's conditions allow, given what is placed.
    fn lower_bound(&self, client: usize, slot: usize, placed: &[Option<(i64, i64)>]) -> i64 {
        let mut bound = 0;
        for rule in self.problem.assessment_of(client).rules() {
            if let Rule::StartsFrom { slot: s, minute } = *rule {
                if s == slot {
                    bound = bound.max(minute);
                }
            }
            if let Some((before, after)) = rule.precedence() {
                if after == slot {
                    if let Some((_, end)) = placed[before] {
                        bound = bound.max(end);
                    }
                }
            }
        }
        bound
    }
}
