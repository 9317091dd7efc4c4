mod common;

use anyhow::Result;
use httpmock::prelude::*;
use scenario_solver::domain::scenario::{ScheduledEntry, SolveStatus};
use scenario_solver::{
    GeneratedScenario, HttpCatalogSource, LocalStorage, ScenarioEngine, ScenarioJob,
    ScenarioPipeline, ScenarioRequest,
};
use serde_json::json;
use std::io::Read;
use tempfile::TempDir;

/// 完整流程：mock 上游 API → 排程 → 寫出 zip
#[tokio::test]
async fn test_engine_run_writes_archive() -> Result<()> {
    let server = MockServer::start_async().await;
    common::mount_catalog(&server).await;

    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().replace('\\', "/");

    let service = common::service_config(&server.base_url(), &output_path);
    let solver = common::solver_config(11);
    let body = common::scenario_request(json!({"singleMale": 1, "singleFemale": 1}));
    let request: ScenarioRequest = serde_json::from_value(body)?;

    let source = HttpCatalogSource::new(&service, &solver.upstream)?;
    let job = ScenarioJob::new(request, solver, &service);
    let engine = ScenarioEngine::new(ScenarioPipeline::new(
        LocalStorage::new(output_path.clone()),
        source,
        job,
    ));

    let (scenario, saved_to) = engine.run().await?;
    assert_eq!(saved_to, format!("{}/scenario_output.zip", output_path));
    assert!(matches!(scenario.status, SolveStatus::Optimal | SolveStatus::Feasible));
    assert_eq!(scenario.clients.len(), 2);

    let first = &scenario.clients[0];
    assert_eq!(first.start_time, "07:15:00");
    assert_eq!(first.client_type, "Elite");
    let names: Vec<&str> = first
        .activities
        .iter()
        .filter_map(|entry| match entry {
            ScheduledEntry::Activity(a) => Some(a.activity_name.as_str()),
            ScheduledEntry::Transfer(_) => None,
        })
        .collect();
    assert_eq!(names.len(), 4);
    assert_eq!(names[0], "Check-in, Consent & Change");
    assert!(names.iter().any(|n| n.starts_with("MRI")));
    assert!(!names.contains(&"Treadmill"));

    let file = std::fs::File::open(temp_dir.path().join("scenario_output.zip"))?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut json_content = String::new();
    archive.by_name("scenario.json")?.read_to_string(&mut json_content)?;
    let saved: GeneratedScenario = serde_json::from_str(&json_content)?;
    assert_eq!(saved.clients, scenario.clients);

    let mut csv_content = String::new();
    archive.by_name("schedule.csv")?.read_to_string(&mut csv_content)?;
    assert!(csv_content.contains("TRANSFER"));
    assert!(csv_content.contains("Check-in, Consent & Change"));

    Ok(())
}

#[tokio::test]
async fn test_out_of_order_rooms_are_not_used() -> Result<()> {
    let server = MockServer::start_async().await;
    common::mount_catalog(&server).await;

    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let service = common::service_config(&server.base_url(), &output_path);
    let solver = common::solver_config(3);

    let mut body = common::scenario_request(json!({"singleMale": 1}));
    body["data"]["outOfOrderRooms"] = json!(["m2", "d1"]);
    let request: ScenarioRequest = serde_json::from_value(body)?;

    let source = HttpCatalogSource::new(&service, &solver.upstream)?;
    let job = ScenarioJob::new(request, solver, &service);
    let engine = ScenarioEngine::new(ScenarioPipeline::new(
        LocalStorage::new(output_path),
        source,
        job,
    ));

    let scenario = engine.generate().await?;
    let rooms: Vec<&str> = scenario.clients[0]
        .activities
        .iter()
        .filter_map(|entry| match entry {
            ScheduledEntry::Activity(a) => Some(a.room_id.as_str()),
            ScheduledEntry::Transfer(_) => None,
        })
        .collect();
    assert!(rooms.contains(&"m1"));
    assert!(rooms.contains(&"d2"));
    assert!(!rooms.contains(&"m2"));
    assert!(!rooms.contains(&"d1"));

    // generate() 不寫檔
    assert!(!temp_dir.path().join("scenario_output.zip").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_authorization_surfaces_upstream_error() -> Result<()> {
    let server = MockServer::start_async().await;
    common::mount_catalog(&server).await;

    let service = common::service_config(&server.base_url(), "unused");
    let solver = common::solver_config(1);
    let mut body = common::scenario_request(json!({"singleFemale": 1}));
    body.as_object_mut().unwrap().remove("authorization");
    let request: ScenarioRequest = serde_json::from_value(body)?;

    let source = HttpCatalogSource::new(&service, &solver.upstream)?;
    let job = ScenarioJob::new(request, solver, &service);
    let engine = ScenarioEngine::new(ScenarioPipeline::new(
        LocalStorage::new("unused".to_string()),
        source,
        job,
    ));

    // 沒有 token 的請求不會命中任何 mock，httpmock 回 404
    let err = engine.generate().await.unwrap_err();
    assert_eq!(err.http_status(), 502);
    Ok(())
}
