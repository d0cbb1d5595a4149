use serde_json::Value;
use tempfile::tempdir;

use dashgen::config::GrafanaConfig;
use dashgen::dashboards::{self, traefik};
use dashgen::grafana::{write_dashboard, GrafanaClient, WriteOutcome};

fn collect_ids(panels: &[Value], ids: &mut Vec<u64>) {
    for panel in panels {
        ids.push(panel["id"].as_u64().unwrap());
        if let Some(children) = panel["panels"].as_array() {
            collect_ids(children, ids);
        }
    }
}

#[test]
fn test_traefik_document_shape() {
    let dashboard = traefik().unwrap().build();
    assert_eq!(dashboard["uid"], "traefik");
    assert_eq!(dashboard["title"], "Traefik");
    assert_eq!(dashboard["time"]["from"], "now-6h");

    let variables: Vec<&str> = dashboard["templating"]["list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        variables,
        vec!["DS_PROMETHEUS", "namespace", "instance", "pod", "entrypoint", "service"]
    );

    let panels = dashboard["panels"].as_array().unwrap();
    assert_eq!(panels[0]["type"], "text");
    assert_eq!(panels[0]["gridPos"]["w"], 24);
    assert_eq!(panels[1]["type"], "row");
    assert_eq!(panels[1]["title"], "Overview");
    assert_eq!(panels[1]["gridPos"]["y"], 3);

    // the Go runtime group comes last and keeps its panels nested
    let last = panels.last().unwrap();
    assert_eq!(last["type"], "row");
    assert_eq!(last["collapsed"], true);
    assert!(!last["panels"].as_array().unwrap().is_empty());
}

#[test]
fn test_panel_ids_follow_document_order() {
    let dashboard = traefik().unwrap().build();
    let mut ids = Vec::new();
    collect_ids(dashboard["panels"].as_array().unwrap(), &mut ids);
    let expected: Vec<u64> = (1..=ids.len() as u64).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_panels_stay_on_the_grid() {
    let dashboard = traefik().unwrap().build();
    for panel in dashboard["panels"].as_array().unwrap() {
        let x = panel["gridPos"]["x"].as_u64().unwrap();
        let w = panel["gridPos"]["w"].as_u64().unwrap();
        assert!(x + w <= 24, "{} overflows", panel["title"]);
        for target in panel["targets"].as_array().into_iter().flatten() {
            assert_eq!(target["datasource"]["uid"], "${DS_PROMETHEUS}");
        }
    }
}

#[test]
fn test_generation_is_deterministic() {
    for def in dashboards::DASHBOARDS {
        let first = serde_json::to_string(&(def.build)().unwrap().build()).unwrap();
        let second = serde_json::to_string(&(def.build)().unwrap().build()).unwrap();
        assert_eq!(first, second, "{} differs between runs", def.name);
    }
}

#[tokio::test]
async fn test_write_then_prepare_upload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dashboards/traefik.json");
    let dashboard = traefik().unwrap().build();

    assert_eq!(write_dashboard(&path, &dashboard).await.unwrap(), WriteOutcome::Written);
    assert_eq!(write_dashboard(&path, &dashboard).await.unwrap(), WriteOutcome::Unchanged);

    let settings = GrafanaConfig {
        url: Some("http://grafana:3000".into()),
        prefix: Some("staging".into()),
        ..GrafanaConfig::default()
    };
    let client = GrafanaClient::from_config(&settings).unwrap();
    let payload = client.payload(&dashboard);
    assert_eq!(payload["dashboard"]["uid"], "staging-traefik");
    assert_eq!(payload["dashboard"]["title"], "[staging] Traefik");
    assert_eq!(payload["overwrite"], true);
}
