#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! NDJSON method channel driven from a config file on disk.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use secondscreen_core::config::load_config_file;
use secondscreen_daemon::manager::{ManagerConfig, PresentationManager};
use secondscreen_daemon::platform::HostContext;
use secondscreen_daemon::platform::sim::SimulatedPlatform;
use secondscreen_daemon::server::{MethodHandler, serve};

#[tokio::test]
async fn test_configured_default_router_over_stdio() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"presentation": {"default_router_name": "kiosk"}, "daemon": {"simulated_displays": 2}}"#,
    )
    .unwrap();
    let config = load_config_file(&path).unwrap();
    assert_eq!(config.presentation.entrypoint, "secondaryDisplayMain");

    let sim = SimulatedPlatform::with_external_displays(config.daemon.simulated_displays);
    let (manager, _notifications) =
        PresentationManager::new(sim.platform(), ManagerConfig::from(&config.presentation));
    manager.attach_host(HostContext::new("stdio-host")).await;
    let (tx, rx) = mpsc::channel(8);
    let handler = MethodHandler::new(Arc::new(manager), tx);

    let input = [
        json!({"id": 1, "method": "prewarmEngine"}),
        json!({"id": 2, "method": "showPresentation", "args": {"displayId": 2, "routerName": "kiosk"}}),
        json!({"id": 3, "method": "transferDataToPresentation", "args": {"payload": {"line": "Coffee"}}}),
        json!({"id": 4, "method": "listDisplay", "args": "presentation"}),
        json!({"id": 5, "method": "hideAllPresentations"}),
        json!({"id": 6, "method": "noSuchMethod"}),
    ]
    .iter()
    .map(Value::to_string)
    .collect::<Vec<_>>()
    .join("\n");

    let mut out = Vec::new();
    serve(&handler, input.as_bytes(), &mut out, rx).await.unwrap();

    let responses: Vec<Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 6);
    assert_eq!(responses[0]["result"], true);
    assert_eq!(responses[1]["result"], true);
    assert_eq!(responses[2]["result"], true);
    assert_eq!(responses[3]["result"].as_array().unwrap().len(), 2);
    assert_eq!(responses[4]["result"], 1);
    assert_eq!(responses[5]["error"]["code"], "NOT_IMPLEMENTED");

    assert_eq!(sim.entrypoint_starts("kiosk"), 1);
    assert_eq!(sim.delivered()[0].payload, json!({"line": "Coffee"}));
}
