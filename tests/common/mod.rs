#![allow(dead_code)]

use httpmock::prelude::*;
use scenario_solver::config::solver_config::SolverConfig;
use scenario_solver::domain::model::Catalog;
use scenario_solver::ServiceConfig;
use serde_json::{json, Value};
use std::collections::HashMap;

pub const TOKEN: &str = "Bearer test-token";

/// 三間客房 (1F)、兩台 MRI (2F)、兩間醫師診間 (1F)
pub fn resources() -> Value {
    json!([
        {"resourceId": "c1", "resourceName": "Suite 1", "type": "CLIENT",
         "roomType": "SINGLE_CLIENT_ROOM", "location": 1},
        {"resourceId": "c2", "resourceName": "Suite 2", "type": "CLIENT",
         "roomType": "SINGLE_CLIENT_ROOM", "location": 1},
        {"resourceId": "c3", "resourceName": "Suite 3", "type": "CLIENT",
         "roomType": "DOUBLE_CLIENT_ROOM", "location": "1"},
        {"resourceId": "m1", "resourceName": "MRI 1.5T", "type": "OTHER",
         "roomType": "MRI_1.5T_ROOM", "location": 2},
        {"resourceId": "m2", "resourceName": "MRI 3T", "type": "OTHER",
         "roomType": "MRI_3T_ROOM", "location": 2},
        {"resourceId": "d1", "resourceName": "Doctor A", "type": "OTHER",
         "roomType": "DOCTOR_ROOM", "location": 1},
        {"resourceId": "d2", "resourceName": "Doctor B", "type": "OTHER",
         "roomType": "DOCTOR_ROOM", "location": 1},
        {"resourceId": "x1", "resourceName": "Old MRI", "type": "OTHER",
         "roomType": "MRI_3T_ROOM", "location": 2, "deleted": true}
    ])
}

pub fn activities() -> Value {
    json!([
        {"activityId": "checkin", "activityName": "Check-in, Consent & Change",
         "resourceType": "CLIENT", "activityColor": "#4caf50",
         "timeAllocations": {"defaultTime": 15}},
        {"activityId": "mri-15", "activityName": "MRI 1.5T", "roomType": "MRI_1.5T_ROOM",
         "timeAllocations": {"defaultTime": 40}},
        {"activityId": "mri-3", "activityName": "MRI 3T", "roomType": "MRI_3T_ROOM",
         "timeAllocations": {"defaultTime": 40}},
        {"activityId": "consult", "activityName": "First Consultation", "roomType": "DOCTOR_ROOM",
         "isGenderTimeAllocated": true,
         "timeAllocations": {"male": 20, "female": "25", "defaultTime": 20}},
        {"activityId": "lunch", "activityName": "Lunch", "resourceType": "CLIENT",
         "timeAllocations": {"defaultTime": 20}},
        {"activityId": "retired", "activityName": "Treadmill", "roomType": "DOCTOR_ROOM",
         "enabled": false, "timeAllocations": {"defaultTime": 30}}
    ])
}

pub fn assessments() -> Value {
    json!([
        {"assessmentId": "elite", "assessmentName": "Elite", "enabled": true}
    ])
}

/// Lunch 必須在 First Consultation 之後，報到固定為第一項
pub fn conditions() -> Value {
    json!([
        {"conditionId": "lunch-after-consult", "activityId": "lunch", "assessmentId": "elite",
         "type": "AFTER", "mandatory": true,
         "criteria": {"criteriaType": "ACTIVITY", "value": "consult"}},
        {"conditionId": "checkin-first", "activityId": "checkin", "assessmentId": "elite",
         "type": "IN_FIXED_ORDER_AS", "mandatory": true,
         "criteria": {"criteriaType": "ORDER", "value": 0}}
    ])
}

pub fn catalog() -> Catalog {
    let mut conditions_by_assessment = HashMap::new();
    conditions_by_assessment.insert(
        "elite".to_string(),
        serde_json::from_value(conditions()).unwrap(),
    );
    Catalog {
        resources: serde_json::from_value(resources()).unwrap(),
        activities: serde_json::from_value(activities()).unwrap(),
        assessments: serde_json::from_value(assessments()).unwrap(),
        conditions: conditions_by_assessment,
    }
}

pub fn scenario_request(elite: Value) -> Value {
    json!({
        "authorization": TOKEN,
        "firstClientArrivalTime": "07:15:00",
        "maxGap": 60,
        "allowSimultaneousTransfers": true,
        "data": {"outOfOrderRooms": [], "clientElite": elite}
    })
}

/// 固定亂數種子與迭代數，讓測試結果可重現
pub fn solver_config(seed: u64) -> SolverConfig {
    let mut config = SolverConfig::default();
    config.solver.seed = Some(seed);
    config.solver.max_iterations = Some(200);
    config.upstream.retry_attempts = 0;
    config
}

pub fn service_config(base_url: &str, output_path: &str) -> ServiceConfig {
    ServiceConfig {
        resource_api_url: base_url.to_string(),
        activity_api_url: base_url.to_string(),
        assessment_api_url: base_url.to_string(),
        solver_max_minutes: 0.5,
        output_path: output_path.to_string(),
        solver_config_path: None,
    }
}

/// Mounts the four catalog endpoints, each requiring [`TOKEN`].
pub async fn mount_catalog(server: &MockServer) {
    mount_catalog_with(server, conditions()).await;
}

pub async fn mount_catalog_with(server: &MockServer, conditions: Value) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/resources").header("Authorization", TOKEN);
            then.status(200).json_body(resources());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/activities").header("Authorization", TOKEN);
            then.status(200).json_body(json!({"data": activities()}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/assessments").header("Authorization", TOKEN);
            then.status(200).json_body(assessments());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/assessments/elite/conditions")
                .header("Authorization", TOKEN);
            then.status(200).json_body(json!({"data": conditions}));
        })
        .await;
}
