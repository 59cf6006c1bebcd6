use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use slicepack::reducer::bucket_object;
use slicepack::{Action, ActionMap, Config, Registry, SliceSpec, Template};
use slicepack_engine::ActionLog;

fn request(name: &str, bucket: &str) -> SliceSpec {
    SliceSpec::builder().name(name).reducer_name(bucket).build()
}

fn simple(name: &str, bucket: &str, initial: Value) -> SliceSpec {
    SliceSpec::builder()
        .name(name)
        .reducer_name(bucket)
        .template(Template::Simple)
        .default_initial(initial)
        .build()
}

// =============================================================================
// Freeze / release
// =============================================================================

#[test]
fn frozen_injections_rebuild_once_on_release() {
    let registry = Registry::new();
    registry.get_root_reducer(BTreeMap::new(), BTreeMap::new()).unwrap();
    let store = registry.store().unwrap();
    let rebuilds = registry.rebuild_count();
    let replacements = store.replacement_count();

    registry.freeze_reducer_updates();
    registry.create_pack(request("a", "one")).unwrap();
    registry.create_pack(request("b", "two")).unwrap();
    registry.create_pack(request("c", "three")).unwrap();

    assert!(registry.is_frozen());
    assert!(registry.has_pending_update());
    assert_eq!(registry.rebuild_count(), rebuilds);
    assert!(registry.state().bucket("one").is_none());

    registry.release_reducer_updates().unwrap();

    assert_eq!(registry.rebuild_count(), rebuilds + 1);
    assert_eq!(store.replacement_count(), replacements + 1);
    let state = registry.state();
    for bucket in ["one", "two", "three"] {
        assert!(state.bucket(bucket).is_some(), "missing bucket {bucket}");
    }
    assert!(!registry.has_pending_update());
}

#[test]
fn release_without_injections_does_not_rebuild() {
    let registry = Registry::new();
    registry.create_pack(request("a", "one")).unwrap();
    let rebuilds = registry.rebuild_count();

    registry.freeze_reducer_updates();
    registry.release_reducer_updates().unwrap();
    assert_eq!(registry.rebuild_count(), rebuilds);
}

#[test]
fn frozen_boot_config_starts_frozen() {
    let registry = Registry::with_config(&Config::default().with_frozen_boot(true));
    assert!(registry.is_frozen());

    registry.create_pack(request("a", "one")).unwrap();
    registry.create_pack(request("b", "one")).unwrap();
    assert_eq!(registry.rebuild_count(), 0);

    registry.release_reducer_updates().unwrap();
    assert_eq!(registry.rebuild_count(), 1);
}

// =============================================================================
// Injection
// =============================================================================

#[test]
fn late_injection_keeps_accumulated_state() {
    let registry = Registry::new();
    let user = registry.create_pack(request("user", "app")).unwrap();
    registry.dispatch(user.action("success", json!({"id": 1})).unwrap()).unwrap();

    let theme = registry.create_pack(simple("theme", "app", json!("light"))).unwrap();

    assert_eq!(user.select("result"), Some(json!({"id": 1})));
    assert_eq!(theme.select("value"), Some(json!("light")));
}

#[test]
fn reinjection_is_idempotent() {
    let registry = Registry::new();
    registry.create_pack(request("user", "app")).unwrap();
    let types = registry.action_types("app");
    let initial = registry.initial_state();

    registry.create_pack(request("user", "app")).unwrap();
    assert_eq!(registry.action_types("app"), types);
    assert_eq!(registry.initial_state(), initial);
}

#[test]
fn inject_rejects_non_object_initial_state() {
    let registry = Registry::new();
    let err = registry
        .inject_reducer_into("app", &ActionMap::new(), &json!(3))
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(registry.bucket_names().is_empty());
}

#[test]
fn failed_generation_leaves_registry_untouched() {
    let registry = Registry::new();
    registry.create_pack(request("user", "app")).unwrap();
    let rebuilds = registry.rebuild_count();
    let initial = registry.initial_state();

    let bad = SliceSpec::builder().name("").reducer_name("app").build();
    assert!(registry.create_pack(bad).is_err());

    assert_eq!(registry.rebuild_count(), rebuilds);
    assert_eq!(registry.initial_state(), initial);
}

#[test]
fn update_reducer_without_store_only_recomposes() {
    let registry = Registry::new();
    registry.create_pack(request("user", "app")).unwrap();
    registry.update_reducer().unwrap();
    assert!(registry.store().is_none());
    assert_eq!(registry.rebuild_count(), 2);
}

// =============================================================================
// Root reducer and store
// =============================================================================

fn ticks() -> ActionMap {
    ActionMap::new().on("clock/tick", |state: &Value, action: &Action| {
        let mut bucket = bucket_object(state, action)?;
        let n = bucket.get("ticks").and_then(Value::as_i64).unwrap_or(0);
        bucket.insert("ticks".to_string(), json!(n + 1));
        Ok(Value::Object(bucket))
    })
}

#[test]
fn external_buckets_join_the_root_reducer() {
    let registry = Registry::new();
    registry.create_pack(request("user", "app")).unwrap();

    let root = registry
        .get_root_reducer(
            BTreeMap::from([("clock".to_string(), ticks())]),
            BTreeMap::from([("clock".to_string(), json!({"ticks": 0}))]),
        )
        .unwrap();
    assert!(root.handles("clock/tick"));
    assert!(root.handles("user/run"));

    registry.dispatch(Action::of_type("clock/tick")).unwrap();
    assert_eq!(registry.state().get("clock", "ticks"), Some(&json!(1)));
    assert_eq!(
        registry.bucket_names(),
        vec!["app".to_string(), "clock".to_string()]
    );
}

#[test]
fn store_is_created_once() {
    let registry = Registry::new();
    registry.get_root_reducer(BTreeMap::new(), BTreeMap::new()).unwrap();
    let first = registry.store().unwrap();
    first.dispatch(Action::of_type("noop")).unwrap();

    registry.get_root_reducer(BTreeMap::new(), BTreeMap::new()).unwrap();
    let second = registry.store().unwrap();
    assert_eq!(second.dispatch_count(), first.dispatch_count());
    assert!(second.dispatch_count() >= 2);
}

#[test]
fn reducer_errors_leave_state_untouched() {
    let registry = Registry::new();
    registry
        .get_root_reducer(
            BTreeMap::from([("clock".to_string(), ticks())]),
            BTreeMap::from([("clock".to_string(), json!("not an object"))]),
        )
        .unwrap();
    let before = registry.state();

    let err = registry.dispatch(Action::of_type("clock/tick")).unwrap_err();
    assert!(err.to_string().contains("clock/tick"));
    assert!(Arc::ptr_eq(&before, &registry.state()));
}

#[test]
fn reducers_inspection_lists_handled_types() {
    let registry = Registry::new();
    registry.create_pack(request("user", "app")).unwrap();
    registry.create_pack(simple("theme", "ui", json!(null))).unwrap();

    let reducers = registry.reducers();
    assert_eq!(reducers["app"], vec!["user/fail", "user/run", "user/success"]);
    assert_eq!(reducers["ui"], vec!["theme/reset", "theme/set"]);
}

#[test]
fn action_log_sink_sees_slice_actions() {
    let registry = Registry::new();
    let user = registry.create_pack(request("user", "app")).unwrap();
    registry.get_root_reducer(BTreeMap::new(), BTreeMap::new()).unwrap();

    let log = Arc::new(ActionLog::default());
    let store = registry.store().unwrap().with_sink(log.clone());
    store.dispatch(user.action("run", Value::Null).unwrap()).unwrap();
    store.dispatch(Action::of_type("other")).unwrap();

    let entries = log.entries();
    assert_eq!(log.action_types(), vec!["user/run", "other"]);
    assert!(entries[0].changed);
    assert!(!entries[1].changed);
}

#[test]
fn logger_flag_is_shared_with_the_store() {
    let registry = Registry::with_config(&Config::default().with_logger(true));
    assert!(registry.logger_on());
    registry.set_logger(false);
    assert!(!registry.logger_on());
}

#[test]
fn concurrent_dispatch_through_the_registry_loses_nothing() {
    let registry = Registry::new();
    let counter = registry
        .create_pack(
            SliceSpec::builder()
                .name("counter")
                .reducer_name("stats")
                .template(Template::Simple)
                .payload_map(slicepack::PayloadMap::new().entry(
                    "count",
                    slicepack::LeafRule::new(json!(0))
                        .modify_value(|_, prev| json!(prev.as_i64().unwrap_or(0) + 1)),
                ))
                .build(),
        )
        .unwrap();
    let set = counter.action("set", json!({"count": 1})).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            let set = set.clone();
            std::thread::spawn(move || {
                for _ in 0..250 {
                    registry.dispatch(set.clone()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.select("count"), Some(json!(1000)));
}
