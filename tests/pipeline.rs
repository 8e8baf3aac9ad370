use terrain_mesher::config::PipelineConfig;
use terrain_mesher::pipeline::run_pipeline;

#[test]
fn json_config_builds_a_pyramid_and_writes_the_report() {
    let report_path = std::env::temp_dir().join(format!(
        "terrain-mesher-report-{}-{}.json",
        std::process::id(),
        fastrand::u32(..)
    ));
    let config = PipelineConfig::from_json(&format!(
        r#"{{
            "profile": "geodetic",
            "min_zoom": 6,
            "workers": 2,
            "report_path": {path:?},
            "dataset": {{
                "kind": "perlin",
                "bounds": {{ "min_x": 8.0, "min_y": 46.0, "max_x": 9.5, "max_y": 47.0 }},
                "width": 96,
                "height": 64,
                "seed": 11,
                "amplitude": 1800.0,
                "frequency": 1.2
            }},
            "tiler": {{ "tile_size": 9, "max_zoom": 8, "cache_capacity": 16 }}
        }}"#,
        path = report_path.to_string_lossy()
    ))
    .unwrap();

    let report = run_pipeline(&config).unwrap();
    assert!(report.is_success());
    assert!(report.tiles_per_zoom.contains_key(&6));
    assert!(report.tiles_per_zoom.contains_key(&8));
    assert_eq!(
        report.tiles_per_zoom.values().sum::<usize>(),
        report.tiles_built
    );

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(written["tiles_built"], report.tiles_built);
    std::fs::remove_file(&report_path).unwrap();
}

#[test]
fn missing_png_is_a_dataset_error() {
    let config = PipelineConfig::from_json(
        r#"{
            "dataset": {
                "kind": "png",
                "path": "/nonexistent/heightmap.png",
                "bounds": { "min_x": 0.0, "min_y": 0.0, "max_x": 1.0, "max_y": 1.0 }
            }
        }"#,
    )
    .unwrap();
    let err = run_pipeline(&config).unwrap_err();
    assert!(err.to_string().starts_with("cannot load dataset"));
}
