use crate::core::problem::{AssessmentPlan, Rule};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Ordering constraints of one assessment, derived from its conditions.
#[derive(Debug, Clone)]
pub(crate) struct SequenceRules {
    anchor: Option<usize>,
    predecessors: Vec<Vec<usize>>,
    /// position == n
    at: Vec<Option<usize>>,
    /// position > n
    above: Vec<Option<usize>>,
    /// position < n
    below: Vec<Option<usize>>,
    /// must directly follow this slot
    right_after: Vec<Option<usize>>,
    deadline: Vec<Option<i64>>,
}

impl SequenceRules {
    pub fn new(plan: &AssessmentPlan) -> Self {
        let n = plan.slots.len();
        let mut rules = Self {
            anchor: plan.anchor,
            predecessors: vec![Vec::new(); n],
            at: vec![None; n],
            above: vec![None; n],
            below: vec![None; n],
            right_after: vec![None; n],
            deadline: vec![None; n],
        };

        for rule in plan.rules() {
            if let Some((before, after)) = rule.precedence() {
                if before != after && !rules.predecessors[after].contains(&before) {
                    rules.predecessors[after].push(before);
                }
            }
            match *rule {
                Rule::OrderAt { slot, order } => rules.at[slot] = Some(order),
                Rule::OrderAbove { slot, order } => {
                    rules.above[slot] = Some(rules.above[slot].map_or(order, |o| o.max(order)))
                }
                Rule::OrderBelow { slot, order } => {
                    rules.below[slot] = Some(rules.below[slot].map_or(order, |o| o.min(order)))
                }
                Rule::StartsAtEndOf { slot, other } => rules.right_after[slot] = Some(other),
                Rule::EndsBy { slot, minute } => {
                    rules.deadline[slot] =
                        Some(rules.deadline[slot].map_or(minute, |d| d.min(minute)))
                }
                _ => {}
            }
        }

        rules
    }

    fn allowed_at(&self, slot: usize, position: usize, done: &[bool]) -> bool {
        self.predecessors[slot].iter().all(|&p| done[p])
            && self.at[slot].map_or(true, |o| o == position)
            && self.above[slot].map_or(true, |o| position > o)
            && self.below[slot].map_or(true, |o| position < o)
    }

    /// Whether `sequence` honours every ordering constraint.
    pub fn accepts(&self, sequence: &[usize]) -> bool {
        let mut done = vec![false; sequence.len()];
        for (position, &slot) in sequence.iter().enumerate() {
            if !self.allowed_at(slot, position, &done) {
                return false;
            }
            if let Some(previous) = self.right_after[slot] {
                if position == 0 || sequence[position - 1] != previous {
                    return false;
                }
            }
            done[slot] = true;
        }
        true
    }

    /// Random activity order. Constraints are followed where they can be;
    /// contradictory conditions still yield a complete sequence.
    pub fn random_sequence(&self, rng: &mut StdRng) -> Vec<usize> {
        let n = self.predecessors.len();
        let mut sequence = Vec::with_capacity(n);
        let mut done = vec![false; n];

        for position in 0..n {
            let candidates: Vec<usize> = (0..n)
                .filter(|&slot| !done[slot] && self.allowed_at(slot, position, &done))
                .collect();
            let last = sequence.last().copied();

            let forced = candidates
                .iter()
                .copied()
                .find(|&slot| self.at[slot] == Some(position))
                .or_else(|| {
                    candidates
                        .iter()
                        .copied()
                        .find(|&slot| last.is_some() && self.right_after[slot] == last)
                })
                .or_else(|| {
                    candidates
                        .iter()
                        .copied()
                        .find(|&slot| self.below[slot] == Some(position + 1))
                })
                .or_else(|| {
                    self.anchor
                        .filter(|anchor| position == 0 && candidates.contains(anchor))
                });

            let pick = match forced {
                Some(slot) => slot,
                None if candidates.is_empty() => match (0..n).find(|&slot| !done[slot]) {
                    Some(slot) => slot,
                    None => break,
                },
                None => {
                    let free: Vec<usize> = candidates
                        .iter()
                        .copied()
                        .filter(|&slot| self.right_after[slot].is_none())
                        .collect();
                    let pool = if free.is_empty() { &candidates } else { &free };
                    let urgent = pool
                        .iter()
                        .copied()
                        .filter(|&slot| self.deadline[slot].is_some())
                        .min_by_key(|&slot| self.deadline[slot]);
                    match urgent {
                        Some(slot) if rng.gen_bool(0.5) => slot,
                        _ => *pool.choose(rng).unwrap_or(&pool[0]),
                    }
                }
            };

            done[pick] = true;
            sequence.push(pick);
        }

        sequence
    }

    /// Swaps two neighbours, keeping the result only when it still honours
    /// the ordering constraints.
    pub fn neighbour(&self, sequence: &[usize], rng: &mut StdRng) -> Option<Vec<usize>> {
        if sequence.len() < 2 {
            return None;
        }
        for _ in 0..8 {
            let i = rng.gen_range(0..sequence.len() - 1);
            let j = if rng.gen_bool(0.7) {
                i + 1
            } else {
                rng.gen_range(0..sequence.len())
            };
            if i == j {
                continue;
            }
            let mut candidate = sequence.to_vec();
            candidate.swap(i, j);
            if self.accepts(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}
