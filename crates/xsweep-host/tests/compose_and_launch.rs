use std::fs;

use indexmap::IndexMap;
use serde_json::json;
use tempfile::tempdir;
use xsweep_core::{JobStatus, SweepContext};
use xsweep_host::{
    build_search_path, compose, load_primary, DryRunLauncher, ExplicitSweeperSearchPathPlugin,
    SweeperRegistry,
};

const PRIMARY: &str = r#"
defaults:
  - _self_
  - sweeper: explicit
sweeper:
  combinations:
    - model: resnet18
      lr: 0.1
    - model: resnet50
      lr: 0.01
  seeds: [42, 123]
"#;

#[test]
fn primary_config_overlays_bundled_sweeper_defaults() {
    let dir = tempdir().expect("tempdir");
    let primary_path = dir.path().join("config.yaml");
    fs::write(&primary_path, PRIMARY).expect("write primary");

    let search_path = build_search_path(&[], &[&ExplicitSweeperSearchPathPlugin]);
    let config = compose(
        load_primary(&primary_path).expect("load"),
        &search_path,
        &IndexMap::new(),
    )
    .expect("compose");

    assert!(config.get("defaults").is_none());
    assert_eq!(config["sweeper"]["_target_"], "explicit");
    assert_eq!(config["sweeper"]["seed_key"], "seed");
    assert_eq!(config["sweeper"]["seeds"], json!([42, 123]));
    assert_eq!(config["sweeper"]["combinations"][1]["model"], "resnet50");
}

#[test]
fn user_config_dir_shadows_bundled_option() {
    let dir = tempdir().expect("tempdir");
    let group_dir = dir.path().join("sweeper");
    fs::create_dir_all(&group_dir).expect("group dir");
    fs::write(
        group_dir.join("explicit.yaml"),
        "_target_: explicit\nseed_key: random_seed\ncombinations: []\n",
    )
    .expect("write option");
    fs::write(group_dir.join("repeat.yaml"), "_target_: explicit\nseeds: 3\n").expect("write");

    let search_path = build_search_path(
        &[dir.path().to_path_buf()],
        &[&ExplicitSweeperSearchPathPlugin],
    );
    let options = search_path.list_options("sweeper").expect("options");
    assert_eq!(options.into_iter().collect::<Vec<_>>(), ["explicit", "repeat"]);

    let config = compose(json!({}), &search_path, &IndexMap::new()).expect("compose");
    assert_eq!(config["sweeper"]["seed_key"], "random_seed");

    let mut choices = IndexMap::new();
    choices.insert("sweeper".to_string(), "repeat".to_string());
    let config = compose(json!({}), &search_path, &choices).expect("compose choice");
    assert_eq!(config["sweeper"]["seeds"], 3);
}

#[test]
fn composed_config_drives_registered_sweeper() {
    let dir = tempdir().expect("tempdir");
    let primary_path = dir.path().join("config.yaml");
    fs::write(&primary_path, PRIMARY).expect("write primary");
    let search_path = build_search_path(&[], &[&ExplicitSweeperSearchPathPlugin]);
    let config = compose(
        load_primary(&primary_path).expect("load"),
        &search_path,
        &IndexMap::new(),
    )
    .expect("compose");

    let registry = SweeperRegistry::with_builtin();
    let mut sweeper = registry.instantiate_from_config(&config).expect("sweeper");
    let context = SweepContext::new(dir.path().join("multirun"), "train");
    sweeper
        .setup(context, &config, Box::new(DryRunLauncher))
        .expect("setup");
    let returns = sweeper.sweep(&["epochs=3".to_string()]).expect("sweep");

    let overrides: Vec<Vec<String>> = returns.iter().map(|job| job.overrides.clone()).collect();
    assert_eq!(
        overrides,
        vec![
            vec!["model=resnet18", "lr=0.1", "seed=42", "epochs=3"],
            vec!["model=resnet18", "lr=0.1", "seed=123", "epochs=3"],
            vec!["model=resnet50", "lr=0.01", "seed=42", "epochs=3"],
            vec!["model=resnet50", "lr=0.01", "seed=123", "epochs=3"],
        ]
    );
    assert!(returns.iter().all(|job| job.status == JobStatus::DryRun));
    assert_eq!(
        returns[3].working_dir.as_deref(),
        Some(dir.path().join("multirun").join("3").as_path())
    );
}
