//! End-to-end plan generation through the CLI surface, offline.

use clap::Parser;
use mission_cli::{run, Cli};
use mission_core::plan::{read_plan, MissionItem};
use serde_json::Value;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

const BOUNDARY_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document><Placemark><LineString><coordinates>
    -105.0,40.0,0 -104.995,40.0,0 -104.995,40.005,0 -105.0,40.005,0 -105.0,40.0,0
  </coordinates></LineString></Placemark></Document>
</kml>"#;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("plan-gen-{}-{}", std::process::id(), name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

async fn generate(args: &[&str], output: &PathBuf) -> PathBuf {
    let mut argv = vec!["plan-gen", "--offline", "--output", output.to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    run(&cli, &CancellationToken::new()).await.unwrap()
}

fn commands(path: &PathBuf) -> Vec<u64> {
    let json: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    json["mission"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["command"].as_u64().unwrap_or(0))
        .collect()
}

#[tokio::test]
async fn mission_writes_reference_plan() {
    let dir = scratch_dir("mission");
    let output = dir.join("mission.plan");
    let written = generate(
        &[
            "mission",
            "--start",
            "40.0, -105.0",
            "--end",
            "40.01, -105.0",
            "--interval",
            "250",
            "--unit",
            "meters",
            "--altitude",
            "30",
        ],
        &output,
    )
    .await;

    assert_eq!(written, output);
    assert_eq!(commands(&output), vec![22, 16, 16, 16, 21]);

    let doc = read_plan(&output).unwrap();
    assert_eq!(doc.file_type, "Plan");
    assert_eq!(doc.mission.vehicle_type, 2);
    assert_eq!(doc.mission.planned_home_position, [40.0, -105.0, 0.0]);
    assert!(doc.geo_fence.polygons.is_empty());
    let ids: Vec<u32> = doc
        .mission
        .items
        .iter()
        .filter_map(|item| match item {
            MissionItem::Simple(simple) => Some(simple.do_jump_id),
            MissionItem::LandingPattern(_) => None,
        })
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn security_perimeter_with_inset_fence() {
    let dir = scratch_dir("security");
    let kml = dir.join("site.kml");
    std::fs::write(&kml, BOUNDARY_KML).unwrap();
    let output = dir.join("security.plan");

    generate(
        &[
            "security",
            "--kml",
            kml.to_str().unwrap(),
            "--buffer",
            "10",
            "--unit",
            "meters",
        ],
        &output,
    )
    .await;

    let codes = commands(&output);
    assert_eq!(codes.first(), Some(&22));
    assert_eq!(codes.last(), Some(&21));

    let doc = read_plan(&output).unwrap();
    assert_eq!(doc.geo_fence.polygons.len(), 1);
    let fence = &doc.geo_fence.polygons[0];
    assert!(fence.inclusion);
    assert!(fence.polygon.len() >= 4);
    assert_ne!(fence.polygon.first(), fence.polygon.last());
}

#[tokio::test]
async fn fixed_wing_delivery_uses_landing_pattern() {
    let dir = scratch_dir("delivery");
    let output = dir.join("delivery.plan");
    generate(
        &[
            "delivery",
            "--origin",
            "40.0, -105.0",
            "--destination",
            "40.02, -105.0",
            "--aircraft",
            "fixed-wing",
        ],
        &output,
    )
    .await;

    let doc = read_plan(&output).unwrap();
    assert_eq!(doc.mission.vehicle_type, 1);
    assert!(matches!(
        doc.mission.items.last(),
        Some(MissionItem::LandingPattern(pattern)) if pattern.complex_item_type == "fwLandingPattern"
    ));
    assert!(commands(&output).contains(&211));
}

#[tokio::test]
async fn missing_kml_is_an_error() {
    let dir = scratch_dir("missing");
    let cli = Cli::try_parse_from([
        "plan-gen",
        "--offline",
        "linear",
        "--kml",
        dir.join("nope.kml").to_str().unwrap(),
    ])
    .unwrap();
    let err = run(&cli, &CancellationToken::new()).await.unwrap_err();
    assert!(err.to_string().contains("failed to load KML"), "{err}");
}
