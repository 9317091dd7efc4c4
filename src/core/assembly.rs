use crate::config::solver_config::{HintMix, SolverConfig};
use crate::core::problem::{
    ActivityInfo, AssessmentPlan, ClientPlan, CompiledCondition, Room, RoomOption, Rule,
    SchedulingProblem, SlotPlan, TimeSettings,
};
use crate::domain::model::{
    Activity, Assessment, Catalog, ClientMix, Condition, ConditionType, CriteriaType, MaritalType,
    ScenarioAction, Sex,
};
use crate::utils::error::{Result, ScenarioError};
use crate::utils::time::{minutes_between, parse_clock, parse_duration_minutes, round_up};
use chrono::NaiveTime;
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Builds the solver's view of one clinic day from the upstream catalog and
/// the scenario action.
pub fn build_problem(
    catalog: &Catalog,
    action: &ScenarioAction,
    config: &SolverConfig,
) -> Result<SchedulingProblem> {
    let time = time_settings(action, config)?;

    let out_of_order: HashSet<&str> = action
        .data
        .out_of_order_rooms
        .iter()
        .map(String::as_str)
        .collect();
    let rooms: Vec<Room> = catalog
        .resources
        .iter()
        .filter(|r| r.available && !r.deleted)
        .filter(|r| {
            !out_of_order.contains(r.resource_id.as_str())
                && !out_of_order.contains(r.resource_name.as_str())
        })
        .map(|r| Room {
            id: r.resource_id.clone(),
            name: r.resource_name.clone(),
            floor: r.location,
            is_doctor_room: r
                .room_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(&config.rules.doctor_room_type)),
        })
        .collect();
    let mut rooms_by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, resource) in catalog
        .resources
        .iter()
        .filter(|r| r.available && !r.deleted)
        .filter(|r| {
            !out_of_order.contains(r.resource_id.as_str())
                && !out_of_order.contains(r.resource_name.as_str())
        })
        .enumerate()
    {
        rooms_by_key.entry(resource.room_key()).or_default().push(index);
    }
    tracing::debug!(
        "🏥 {} rooms usable ({} out of order)",
        rooms.len(),
        out_of_order.len()
    );

    let activities: Vec<&Activity> = catalog
        .activities
        .iter()
        .filter(|a| a.enabled && !a.deleted)
        .collect();
    let activity_infos: Vec<ActivityInfo> = activities
        .iter()
        .map(|a| ActivityInfo {
            id: a.activity_id.clone(),
            name: a.activity_name.clone(),
            color: a.activity_color.clone(),
        })
        .collect();

    let assessments: Vec<&Assessment> = catalog
        .assessments
        .iter()
        .filter(|a| a.enabled && !a.deleted)
        .collect();
    let aliases = compile_aliases(config)?;

    let mut plans = Vec::new();
    let mut clients = Vec::new();
    let mut hint_mix = BTreeMap::new();
    let mut single_no = 0u32;
    let mut couple_no = 0u32;

    for assessment in &assessments {
        let mix = action.data.client_mix(&assessment.assessment_name);
        if mix.is_empty() {
            tracing::debug!("Skipping assessment {} without clients", assessment.assessment_name);
            continue;
        }
        hint_mix.insert(
            assessment.assessment_name.to_lowercase(),
            HintMix {
                singles: mix.singles(),
                couples: mix.couples(),
            },
        );

        let members = assessment_activities(&activities, assessment, &assessments)?;
        if members.is_empty() {
            return Err(ScenarioError::validation(format!(
                "assessment '{}' has no activities",
                assessment.assessment_name
            )));
        }

        // slot key -> activity indices, in first-seen order
        let mut slot_keys: Vec<String> = Vec::new();
        let mut slot_members: Vec<Vec<usize>> = Vec::new();
        let mut slot_of_activity: HashMap<String, usize> = HashMap::new();
        for &index in &members {
            let activity = activities[index];
            let key = slot_key(&activity.activity_name, &aliases);
            let slot = match slot_keys.iter().position(|k| *k == key) {
                Some(slot) => slot,
                None => {
                    slot_keys.push(key);
                    slot_members.push(Vec::new());
                    slot_keys.len() - 1
                }
            };
            slot_members[slot].push(index);
            slot_of_activity.insert(activity.activity_id.clone(), slot);
        }

        let plan_index = plans.len();
        let plan = assessment_plan(
            assessment,
            &slot_keys,
            &slot_of_activity,
            catalog
                .conditions
                .get(&assessment.assessment_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            config,
            time.origin,
        )?;

        for (sex, marital_type, couple) in expand_clients(&mix) {
            let (single_client_no, couple_client_no) = match (marital_type, couple) {
                (MaritalType::Single, _) => {
                    single_no += 1;
                    (Some(single_no), None)
                }
                (MaritalType::Couple, first_partner) => {
                    if first_partner {
                        couple_no += 1;
                    }
                    (None, Some(couple_no))
                }
            };

            let mut options = Vec::with_capacity(slot_members.len());
            for (slot, members) in slot_members.iter().enumerate() {
                let mut slot_options = Vec::new();
                for &activity_index in members {
                    let activity = activities[activity_index];
                    let duration = activity.duration_for(sex).ok_or_else(|| {
                        ScenarioError::validation(format!(
                            "activity '{}' has no time allocation",
                            activity.activity_name
                        ))
                    })?;
                    if duration <= 0 {
                        return Err(ScenarioError::validation(format!(
                            "activity '{}' has a non-positive duration ({})",
                            activity.activity_name, duration
                        )));
                    }
                    let duration = round_up(duration, time.granularity);
                    for &room in rooms_by_key.get(&activity.room_key()).into_iter().flatten() {
                        slot_options.push(RoomOption {
                            room,
                            activity: activity_index,
                            duration,
                        });
                    }
                }
                if slot_options.is_empty() {
                    return Err(ScenarioError::validation(format!(
                        "no available room for '{}' in assessment '{}'",
                        plan.slots[slot].key, assessment.assessment_name
                    )));
                }
                options.push(slot_options);
            }

            clients.push(ClientPlan {
                number: clients.len() as u32 + 1,
                assessment: plan_index,
                sex,
                marital_type,
                single_client_no,
                couple_client_no,
                options,
            });
        }
        plans.push(plan);
    }

    if clients.is_empty() {
        return Err(ScenarioError::validation(
            "the scenario action books no clients on an enabled assessment",
        ));
    }
    check_totals(action, &clients);

    let arrival_hints = match config.hint_for(&hint_mix) {
        Some(hint) => {
            tracing::info!("💡 Using arrival hint with {} arrivals", hint.arrivals.len());
            let mut hints = Vec::with_capacity(clients.len());
            for index in 0..clients.len() {
                let minute = match hint.arrivals.get(index) {
                    Some(arrival) => {
                        let clock = parse_clock("hints.arrivals", arrival)?;
                        Some(round_up(minutes_between(time.origin, clock).max(0), time.granularity))
                    }
                    None => None,
                };
                hints.push(minute);
            }
            hints
        }
        None => vec![None; clients.len()],
    };

    let doctors_on_duty = action
        .doctors_on_duty
        .filter(|&n| n > 0)
        .map(|n| n as u32);

    Ok(SchedulingProblem {
        time,
        mode: config.solver.mode,
        simultaneous_transfers: action.allow_simultaneous_transfers,
        doctors_on_duty,
        rooms,
        activities: activity_infos,
        assessments: plans,
        clients,
        arrival_hints,
    })
}

fn time_settings(action: &ScenarioAction, config: &SolverConfig) -> Result<TimeSettings> {
    let origin = parse_clock("firstClientArrivalTime", &action.first_client_arrival_time)?;
    let day_end = parse_clock("solver.day_end", &config.solver.day_end)?;
    let granularity = config.solver.granularity_minutes.max(1);
    let horizon = minutes_between(origin, day_end).div_euclid(granularity) * granularity;
    if horizon <= 0 {
        return Err(ScenarioError::validation(format!(
            "first client arrival {} is not before the end of day {}",
            action.first_client_arrival_time, config.solver.day_end
        )));
    }
    if action.max_gap < 0 {
        return Err(ScenarioError::validation(format!(
            "maxGap must not be negative, got {}",
            action.max_gap
        )));
    }

    Ok(TimeSettings {
        origin,
        horizon,
        granularity,
        transfer: round_up(config.solver.transfer_minutes.max(0), granularity),
        max_gap: action.max_gap,
    })
}

fn compile_aliases(config: &SolverConfig) -> Result<Vec<(Regex, String)>> {
    config
        .rules
        .slot_aliases
        .iter()
        .map(|alias| {
            RegexBuilder::new(&alias.pattern)
                .case_insensitive(true)
                .build()
                .map(|re| (re, alias.slot.clone()))
                .map_err(|e| ScenarioError::InvalidConfigValueError {
                    field: "rules.slot_aliases.pattern".to_string(),
                    value: alias.pattern.clone(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

fn slot_key(activity_name: &str, aliases: &[(Regex, String)]) -> String {
    aliases
        .iter()
        .find(|(re, _)| re.is_match(activity_name))
        .map(|(_, slot)| slot.clone())
        .unwrap_or_else(|| activity_name.to_string())
}

/// Activities of `assessment`: every activity whose name does not mention
/// another enabled assessment.
fn assessment_activities(
    activities: &[&Activity],
    assessment: &Assessment,
    assessments: &[&Assessment],
) -> Result<Vec<usize>> {
    let others: Vec<String> = assessments
        .iter()
        .filter(|a| a.assessment_id != assessment.assessment_id)
        .map(|a| regex::escape(a.assessment_name.trim()))
        .filter(|name| !name.is_empty())
        .collect();
    if others.is_empty() {
        return Ok((0..activities.len()).collect());
    }

    let pattern = RegexBuilder::new(&format!("({})", others.join("|")))
        .case_insensitive(true)
        .build()
        .map_err(|e| ScenarioError::ProcessingError {
            message: format!("cannot build assessment name pattern: {}", e),
        })?;

    Ok(activities
        .iter()
        .enumerate()
        .filter(|(_, a)| !pattern.is_match(&a.activity_name))
        .map(|(index, _)| index)
        .collect())
}

fn assessment_plan(
    assessment: &Assessment,
    slot_keys: &[String],
    slot_of_activity: &HashMap<String, usize>,
    conditions: &[Condition],
    config: &SolverConfig,
    origin: NaiveTime,
) -> Result<AssessmentPlan> {
    let rules = &config.rules;
    let find = |name: &str| {
        slot_keys
            .iter()
            .position(|key| key.trim().eq_ignore_ascii_case(name.trim()))
    };
    let listed = |names: &[String], key: &str| {
        names
            .iter()
            .any(|name| name.trim().eq_ignore_ascii_case(key.trim()))
    };

    let slots: Vec<SlotPlan> = slot_keys
        .iter()
        .map(|key| SlotPlan {
            key: key.clone(),
            exclusive: listed(&rules.exclusive_activities, key),
            staggered: listed(&rules.staggered_activities, key),
            capacity: rules
                .room_capacities
                .iter()
                .find(|c| c.activity.trim().eq_ignore_ascii_case(key.trim()))
                .map(|c| c.capacity),
        })
        .collect();

    let anchor = find(&rules.anchor_activity);
    let same_room_as_anchor = match anchor {
        Some(_) => rules
            .same_room_as_anchor
            .iter()
            .filter_map(|name| find(name))
            .collect(),
        None => {
            tracing::warn!(
                "⚠️ Assessment '{}' has no '{}' activity; room pinning disabled",
                assessment.assessment_name,
                rules.anchor_activity
            );
            Vec::new()
        }
    };

    let mut compiled = Vec::new();
    for condition in conditions.iter().filter(|c| c.enabled) {
        let Some(&slot) = slot_of_activity.get(&condition.activity_id) else {
            tracing::warn!(
                "⚠️ Condition {} refers to activity {} outside assessment '{}', skipped",
                condition.condition_id,
                condition.activity_id,
                assessment.assessment_name
            );
            continue;
        };
        match compile_condition(condition, slot, slot_of_activity, anchor, origin)? {
            Compiled::Rules(rules) => compiled.push(CompiledCondition {
                condition_id: condition.condition_id.clone(),
                mandatory: condition.mandatory,
                rules,
            }),
            Compiled::ForeignActivity => tracing::warn!(
                "⚠️ Condition {} refers to an activity outside assessment '{}', skipped",
                condition.condition_id,
                assessment.assessment_name
            ),
            Compiled::NoAnchor => tracing::warn!(
                "⚠️ Condition {} is WITHIN the anchor activity, which '{}' lacks; skipped",
                condition.condition_id,
                assessment.assessment_name
            ),
        }
    }
    tracing::debug!(
        "📋 Assessment {}: {} slots, {} conditions",
        assessment.assessment_name,
        slots.len(),
        compiled.len()
    );

    Ok(AssessmentPlan {
        name: assessment.assessment_name.clone(),
        slots,
        anchor,
        same_room_as_anchor,
        conditions: compiled,
    })
}

/// Outcome of compiling one condition.
#[derive(Debug, PartialEq)]
enum Compiled {
    Rules(Vec<Rule>),
    /// Points at an activity the assessment does not schedule.
    ForeignActivity,
    /// `WITHIN` but the assessment has no anchor activity.
    NoAnchor,
}

fn compile_condition(
    condition: &Condition,
    slot: usize,
    slot_of_activity: &HashMap<String, usize>,
    anchor: Option<usize>,
    origin: NaiveTime,
) -> Result<Compiled> {
    let criteria = &condition.criteria;
    let invalid = |what: &str| {
        ScenarioError::validation(format!(
            "condition {}: {} for {:?}",
            condition.condition_id, what, condition.condition_type
        ))
    };
    let value = || criteria.value.as_deref().ok_or_else(|| invalid("missing criteria value"));
    let between = || {
        criteria
            .between_values
            .start
            .as_deref()
            .zip(criteria.between_values.end.as_deref())
            .ok_or_else(|| invalid("missing between values"))
    };
    let clock = |raw: &str| -> Result<i64> {
        Ok(minutes_between(origin, parse_clock("criteria.value", raw)?))
    };
    let order = |raw: &str| -> Result<usize> {
        raw.trim()
            .parse::<usize>()
            .map_err(|_| invalid(&format!("order '{}' is not a non-negative integer", raw)))
    };

    let rules = match (condition.condition_type, criteria.criteria_type) {
        (ConditionType::Unknown, _) => {
            return Err(ScenarioError::validation(format!(
                "condition {}: unsupported condition type",
                condition.condition_id
            )))
        }
        (ConditionType::Within, _) => {
            let Some(anchor) = anchor else {
                return Ok(Compiled::NoAnchor);
            };
            let minutes = parse_duration_minutes("criteria.value", value()?)?;
            vec![Rule::StartsWithin {
                slot,
                anchor,
                minutes,
            }]
        }
        (ConditionType::Before, Some(CriteriaType::Activity)) => {
            let Some(&other) = slot_of_activity.get(value()?) else {
                return Ok(Compiled::ForeignActivity);
            };
            vec![Rule::EndsBeforeStartOf { slot, other }]
        }
        (ConditionType::Before, Some(CriteriaType::Time)) => vec![Rule::EndsBy {
            slot,
            minute: clock(value()?)?,
        }],
        (ConditionType::Before, Some(CriteriaType::Order)) => vec![Rule::OrderBelow {
            slot,
            order: order(value()?)?,
        }],
        (ConditionType::After, Some(CriteriaType::Activity)) => {
            let Some(&other) = slot_of_activity.get(value()?) else {
                return Ok(Compiled::ForeignActivity);
            };
            vec![Rule::StartsAfterEndOf { slot, other }]
        }
        (ConditionType::After, Some(CriteriaType::Time)) => vec![Rule::StartsFrom {
            slot,
            minute: clock(value()?)?,
        }],
        (ConditionType::After, Some(CriteriaType::Order)) => vec![Rule::OrderAbove {
            slot,
            order: order(value()?)?,
        }],
        (ConditionType::RightAfter, Some(CriteriaType::Activity)) => {
            let Some(&other) = slot_of_activity.get(value()?) else {
                return Ok(Compiled::ForeignActivity);
            };
            vec![Rule::StartsAtEndOf { slot, other }]
        }
        (ConditionType::Between, Some(CriteriaType::Activity)) => {
            let (start, end) = between()?;
            let (Some(&first), Some(&last)) =
                (slot_of_activity.get(start), slot_of_activity.get(end))
            else {
                return Ok(Compiled::ForeignActivity);
            };
            vec![
                Rule::StartsAfterEndOf { slot, other: first },
                Rule::EndsBeforeStartOf { slot, other: last },
            ]
        }
        (ConditionType::Between, Some(CriteriaType::Time)) => {
            let (start, end) = between()?;
            vec![
                Rule::StartsFrom {
                    slot,
                    minute: clock(start)?,
                },
                Rule::EndsBy {
                    slot,
                    minute: clock(end)?,
                },
            ]
        }
        (ConditionType::Between, Some(CriteriaType::Order)) => {
            let (start, end) = between()?;
            vec![
                Rule::OrderAbove {
                    slot,
                    order: order(start)?,
                },
                Rule::OrderBelow {
                    slot,
                    order: order(end)?,
                },
            ]
        }
        (ConditionType::InFixedOrderAs, Some(CriteriaType::Order)) => vec![Rule::OrderAt {
            slot,
            order: order(value()?)?,
        }],
        (_, None) => return Err(invalid("missing criteria type")),
        (_, Some(criteria_type)) => {
            return Err(invalid(&format!("unsupported criteria type {:?}", criteria_type)))
        }
    };

    Ok(Compiled::Rules(rules))
}

/// `(sex, marital type, first partner of a couple)` per client, singles
/// first, then couples partner by partner.
fn expand_clients(mix: &ClientMix) -> Vec<(Sex, MaritalType, bool)> {
    let mut clients = Vec::new();
    for _ in 0..mix.single_male {
        clients.push((Sex::Male, MaritalType::Single, false));
    }
    for _ in 0..mix.single_female {
        clients.push((Sex::Female, MaritalType::Single, false));
    }
    let couples = [
        (mix.couple_male_female, Sex::Male, Sex::Female),
        (mix.couple_male_male, Sex::Male, Sex::Male),
        (mix.couple_female_female, Sex::Female, Sex::Female),
    ];
    for (count, first, second) in couples {
        for _ in 0..count {
            clients.push((first, MaritalType::Couple, true));
            clients.push((second, MaritalType::Couple, false));
        }
    }
    clients
}

fn check_totals(action: &ScenarioAction, clients: &[ClientPlan]) {
    let males = clients.iter().filter(|c| c.sex == Sex::Male).count() as i64;
    let females = clients.len() as i64 - males;
    if let Some(total) = action.total_male.filter(|&t| t != males) {
        tracing::warn!("⚠️ totalMale is {} but the client mix has {} men", total, males);
    }
    if let Some(total) = action.total_female.filter(|&t| t != females) {
        tracing::warn!("⚠️ totalFemale is {} but the client mix has {} women", total, females);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::solver_config::ArrivalHint;
    use crate::domain::model::{Criteria, Resource, ResourceType, TimeAllocation};
    use serde_json::json;

    fn resource(id: &str, room_type: &str, floor: i64) -> Resource {
        Resource {
            resource_id: id.to_string(),
            resource_name: format!("Room {}", id),
            resource_type: if room_type == "CLIENT" {
                ResourceType::Client
            } else {
                ResourceType::Other
            },
            room_type: Some(room_type.to_string()),
            location: floor,
            available: true,
            deleted: false,
            created: None,
            updated: None,
        }
    }

    fn activity(id: &str, name: &str, room_type: &str, minutes: i64) -> Activity {
        Activity {
            activity_id: id.to_string(),
            activity_name: name.to_string(),
            activity_color: None,
            room_type: Some(room_type.to_string()),
            resource_type: ResourceType::Other,
            is_gender_time_allocated: false,
            enabled: true,
            deleted: false,
            time_allocations: TimeAllocation {
                male: None,
                female: None,
                default_time: Some(minutes),
            },
            mandatory_conditions_count: 0,
            optional_conditions_count: 0,
        }
    }

    fn assessment(id: &str, name: &str) -> Assessment {
        Assessment {
            assessment_id: id.to_string(),
            assessment_name: name.to_string(),
            enabled: true,
            deleted: false,
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            resources: vec![
                resource("c1", "CLIENT", 0),
                resource("c2", "CLIENT", 0),
                resource("mri15", "MRI_1.5T_ROOM", 1),
                resource("mri3", "MRI_3T_ROOM", 1),
                resource("doc", "DOCTOR_ROOM", 0),
            ],
            activities: vec![
                activity("checkin", "Check-in, Consent & Change", "CLIENT", 20),
                activity("mri-a", "MRI 1.5T", "MRI_1.5T_ROOM", 45),
                activity("mri-b", "MRI 3T", "MRI_3T_ROOM", 42),
                activity("consult", "First Consultation", "DOCTOR_ROOM", 30),
                activity("ult-extra", "Ultimate Sports Test", "DOCTOR_ROOM", 30),
            ],
            assessments: vec![assessment("elite", "Elite"), assessment("ult", "Ultimate")],
            conditions: HashMap::new(),
        }
    }

    fn action(elite: serde_json::Value) -> ScenarioAction {
        serde_json::from_value(json!({
            "firstClientArrivalTime": "07:15:00",
            "maxGap": 10,
            "data": {"clientElite": elite}
        }))
        .unwrap()
    }

    fn build(catalog: &Catalog, elite: serde_json::Value) -> Result<SchedulingProblem> {
        build_problem(catalog, &action(elite), &SolverConfig::default())
    }

    #[test]
    fn test_builds_slots_and_clients() {
        let problem = build_problem(
            &catalog(),
            &action(json!({"singleMale": 1, "coupleMaleFemale": 1})),
            &SolverConfig::default(),
        )
        .unwrap();

        assert_eq!(problem.time.horizon, 945);
        assert_eq!(problem.clients.len(), 3);
        assert_eq!(problem.assessments.len(), 1);

        let plan = &problem.assessments[0];
        let keys: Vec<&str> = plan.slots.iter().map(|s| s.key.as_str()).collect();
        // The "Ultimate ..." activity belongs to the other assessment.
        assert_eq!(keys, vec!["Check-in, Consent & Change", "MRI", "First Consultation"]);
        assert_eq!(plan.anchor, Some(0));
        assert!(plan.slots[0].exclusive);
        assert!(plan.slots[1].staggered);
        assert_eq!(plan.slots[2].capacity, Some(3));

        // MRI slot: both machines, 42 minutes rounds up to 45.
        let mri = &problem.clients[0].options[1];
        assert_eq!(mri.len(), 2);
        assert!(mri.iter().all(|o| o.duration == 45));

        let couple: Vec<_> = problem.clients[1..].iter().map(|c| c.couple_client_no).collect();
        assert_eq!(couple, vec![Some(1), Some(1)]);
        assert_eq!(problem.clients[2].sex, Sex::Female);
        assert!(problem.rooms[4].is_doctor_room);
    }

    #[test]
    fn test_out_of_order_room_is_excluded() {
        let mut action = action(json!({"singleMale": 1}));
        action.data.out_of_order_rooms = vec!["mri3".to_string()];
        let problem = build_problem(&catalog(), &action, &SolverConfig::default()).unwrap();
        assert_eq!(problem.clients[0].options[1].len(), 1);
        assert!(problem.rooms.iter().all(|r| r.id != "mri3"));
    }

    #[test]
    fn test_missing_room_type_is_an_error() {
        let mut catalog = catalog();
        catalog.resources.retain(|r| r.resource_id != "doc");
        let err = build(&catalog, json!({"singleMale": 1})).unwrap_err();
        assert!(err.to_string().contains("First Consultation"));
    }

    #[test]
    fn test_no_clients_is_an_error() {
        let err = build(&catalog(), json!({})).unwrap_err();
        assert!(matches!(err, ScenarioError::ValidationError { .. }));
    }

    #[test]
    fn test_compiles_conditions() {
        let mut catalog = catalog();
        let condition =
            |id: &str, activity: &str, kind: ConditionType, criteria: Criteria| Condition {
                condition_id: id.to_string(),
                activity_id: activity.to_string(),
                assessment_id: "elite".to_string(),
                condition_type: kind,
                enabled: true,
                generate: true,
                mandatory: true,
                criteria,
            };
        catalog.conditions.insert(
            "elite".to_string(),
            vec![
                condition(
                    "c-order",
                    "checkin",
                    ConditionType::InFixedOrderAs,
                    serde_json::from_value(json!({"criteriaType": "ORDER", "value": "0"})).unwrap(),
                ),
                condition(
                    "c-time",
                    "consult",
                    ConditionType::Between,
                    serde_json::from_value(json!({
                        "criteriaType": "TIME",
                        "betweenValues": {"start": "08:15:00", "end": "10:15:00"}
                    }))
                    .unwrap(),
                ),
                condition(
                    "c-within",
                    "mri-b",
                    ConditionType::Within,
                    serde_json::from_value(json!({"value": "01:00:00"})).unwrap(),
                ),
                condition(
                    "c-foreign",
                    "ult-extra",
                    ConditionType::Before,
                    serde_json::from_value(json!({"criteriaType": "ORDER", "value": 2})).unwrap(),
                ),
            ],
        );

        let problem = build(&catalog, json!({"singleMale": 1})).unwrap();
        let conditions = &problem.assessments[0].conditions;
        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions[0].rules, vec![Rule::OrderAt { slot: 0, order: 0 }]);
        assert_eq!(
            conditions[1].rules,
            vec![
                Rule::StartsFrom {
                    slot: 2,
                    minute: 60,
                },
                Rule::EndsBy {
                    slot: 2,
                    minute: 180,
                },
            ]
        );
        assert_eq!(
            conditions[2].rules,
            vec![Rule::StartsWithin {
                slot: 1,
                anchor: 0,
                minutes: 60,
            }]
        );
    }

    #[test]
    fn test_invalid_criteria_combination_is_rejected() {
        let mut catalog = catalog();
        catalog.conditions.insert(
            "elite".to_string(),
            vec![Condition {
                condition_id: "bad".to_string(),
                activity_id: "consult".to_string(),
                assessment_id: "elite".to_string(),
                condition_type: ConditionType::RightAfter,
                enabled: true,
                generate: true,
                mandatory: false,
                criteria: serde_json::from_value(json!({
                    "criteriaType": "TIME",
                    "value": "09:00:00"
                }))
                .unwrap(),
            }],
        );
        let err = build(&catalog, json!({"singleMale": 1})).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_unknown_condition_vocabulary_is_a_validation_error() {
        let unknown_criteria: Condition = serde_json::from_value(json!({
            "conditionId": "c-duration",
            "activityId": "consult",
            "assessmentId": "elite",
            "type": "BEFORE",
            "criteria": {"criteriaType": "DURATION", "value": "00:30:00"}
        }))
        .unwrap();
        assert_eq!(unknown_criteria.criteria.criteria_type, Some(CriteriaType::Unknown));

        let unknown_type: Condition = serde_json::from_value(json!({
            "conditionId": "c-sometimes",
            "activityId": "consult",
            "assessmentId": "elite",
            "type": "SOMETIMES",
            "criteria": {"criteriaType": "ACTIVITY", "value": "checkin"}
        }))
        .unwrap();
        assert_eq!(unknown_type.condition_type, ConditionType::Unknown);

        for (condition, id) in [(unknown_criteria, "c-duration"), (unknown_type, "c-sometimes")] {
            let mut catalog = catalog();
            catalog.conditions.insert("elite".to_string(), vec![condition]);
            let err = build(&catalog, json!({"singleMale": 1})).unwrap_err();
            assert!(matches!(err, ScenarioError::ValidationError { .. }));
            assert_eq!(err.http_status(), 400);
            assert!(err.to_string().contains(id));
        }
    }

    #[test]
    fn test_within_without_anchor_is_skipped_as_no_anchor() {
        let condition: Condition = serde_json::from_value(json!({
            "conditionId": "c-within",
            "activityId": "consult",
            "assessmentId": "elite",
            "type": "WITHIN",
            "criteria": {"value": "01:00:00"}
        }))
        .unwrap();
        let origin = NaiveTime::from_hms_opt(7, 15, 0).unwrap();
        let slots = HashMap::from([("consult".to_string(), 1)]);

        let compiled = compile_condition(&condition, 1, &slots, None, origin).unwrap();
        assert_eq!(compiled, Compiled::NoAnchor);
        let compiled = compile_condition(&condition, 1, &slots, Some(0), origin).unwrap();
        assert_eq!(
            compiled,
            Compiled::Rules(vec![Rule::StartsWithin {
                slot: 1,
                anchor: 0,
                minutes: 60,
            }])
        );
    }

    #[test]
    fn test_arrival_hint_applies_to_matching_mix() {
        let mut config = SolverConfig::default();
        let elite = HintMix {
            singles: 2,
            couples: 0,
        };
        config.hints.push(ArrivalHint {
            mix: BTreeMap::from([("elite".to_string(), elite)]),
            arrivals: vec!["07:15:00".to_string(), "07:37:00".to_string()],
        });

        let problem =
            build_problem(&catalog(), &action(json!({"singleMale": 2})), &config).unwrap();
        // 07:37 對齊到下一個 5 分鐘格
        assert_eq!(problem.arrival_hints, vec![Some(0), Some(25)]);

        let problem =
            build_problem(&catalog(), &action(json!({"singleMale": 3})), &config).unwrap();
        assert_eq!(problem.arrival_hints, vec![None, None, None]);
    }

    #[test]
    fn test_single_assessment_keeps_every_activity() {
        let mut catalog = catalog();
        catalog.assessments.truncate(1);
        let problem = build(&catalog, json!({"singleFemale": 1})).unwrap();
        assert_eq!(problem.assessments[0].slots.len(), 4);
    }
}
