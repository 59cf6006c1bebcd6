use serde_json::json;
use slicepack::file_config::{load_slices, parse_slices};
use slicepack::{Registry, Template};

const SLICES: &str = r#"
logger = true

[[slice]]
name = "user"
reducer_name = "app"
result_initial = { id = 0 }

[[slice]]
name = "theme"
reducer_name = "ui"
template = "simple"
default_initial = "light"

[[slice]]
name = "filters"
reducer_name = "ui"
template = "simple"

[slice.payload_map]
query = { initial = "" }
page = { size = { initial = 20, fallback = 20 }, number = { initial = 1, key = "index" } }
"#;

#[test]
fn parses_declared_slices() {
    let file = parse_slices(SLICES).unwrap();
    assert_eq!(file.logger, Some(true));
    assert_eq!(file.slices.len(), 3);
    assert_eq!(file.slices[0].template, Template::Request);
    assert_eq!(file.slices[1].template, Template::Simple);
    assert_eq!(file.slices[0].result_initial, Some(json!({"id": 0})));
}

#[test]
fn registers_every_slice_with_one_rebuild() {
    let registry = Registry::new();
    let packs = parse_slices(SLICES).unwrap().register_all(&registry).unwrap();

    assert_eq!(packs.len(), 3);
    assert_eq!(registry.rebuild_count(), 1);
    assert!(!registry.is_frozen());
    assert!(registry.logger_on());
    assert_eq!(registry.bucket_names(), vec!["app".to_string(), "ui".to_string()]);

    let filters = &packs[2];
    assert_eq!(
        filters.state_names().unwrap().at(&["page", "number"]),
        Some("filters:page:index")
    );
    assert_eq!(
        filters.initial_state(),
        Some(&json!({"filters:value": {"query": "", "page": {"size": 20, "number": 1}}}))
    );
}

#[test]
fn declared_slices_dispatch() {
    let registry = Registry::new();
    let packs = parse_slices(SLICES).unwrap().register_all(&registry).unwrap();
    let theme = &packs[1];

    registry.dispatch(theme.action("set", json!("dark")).unwrap()).unwrap();
    assert_eq!(theme.select("value"), Some(json!("dark")));
}

#[test]
fn unknown_fields_are_rejected() {
    let err = parse_slices("[[slice]]\nname = \"a\"\nreducer_name = \"b\"\ncolour = 1\n").unwrap_err();
    assert!(format!("{err:#}").contains("colour"));
}

#[test]
fn invalid_slice_names_the_slice_and_still_releases() {
    let registry = Registry::new();
    let file = parse_slices(
        r#"
[[slice]]
name = "broken"
reducer_name = "app"
payload_map = { id = 3 }
"#,
    )
    .unwrap();

    let err = file.register_all(&registry).unwrap_err();
    assert!(format!("{err:#}").contains("broken"));
    assert!(!registry.is_frozen());
    assert!(registry.bucket_names().is_empty());
}

#[test]
fn missing_file_reports_the_path() {
    let err = load_slices(std::path::Path::new("/nonexistent/slices.toml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/slices.toml"));
}

#[test]
fn register_all_joins_an_outer_frozen_batch() {
    let registry = Registry::new();
    registry.freeze_reducer_updates();

    let packs = parse_slices(SLICES).unwrap().register_all(&registry).unwrap();
    assert_eq!(packs.len(), 3);
    assert!(registry.is_frozen());
    assert_eq!(registry.rebuild_count(), 0);

    registry
        .create_pack(
            slicepack::SliceSpec::builder()
                .name("session")
                .reducer_name("auth")
                .build(),
        )
        .unwrap();
    registry.release_reducer_updates().unwrap();

    assert_eq!(registry.rebuild_count(), 1);
    assert_eq!(
        registry.bucket_names(),
        vec!["app".to_string(), "auth".to_string(), "ui".to_string()]
    );
}

#[test]
fn array_seed_with_payload_map_is_rejected() {
    let registry = Registry::new();
    let file = parse_slices(
        r#"
[[slice]]
name = "tags"
reducer_name = "app"
template = "simple"
default_initial = ["a"]
payload_map = { id = { initial = 0 } }
"#,
    )
    .unwrap();

    let err = file.register_all(&registry).unwrap_err();
    assert!(format!("{err:#}").contains("not an object"));
    assert!(registry.bucket_names().is_empty());
}

#[test]
fn bad_file_contents_report_the_path() {
    let path = std::env::temp_dir().join(format!("slicepack-bad-{}.toml", std::process::id()));
    std::fs::write(&path, "[[slice]]\nname = 1\n").unwrap();
    let err = load_slices(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();

    let message = format!("{err:#}");
    assert!(message.contains(&path.display().to_string()));
    assert!(message.contains("Failed to parse slice file"));
}
