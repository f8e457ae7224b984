//! Contract: persisted state round-trips across processes
//!
//! State written during one run must be readable by a fresh store
//! instance, and a fresh engine over that reloaded state must treat
//! an already-converged plugin as a no-op.

mod common;

use common::*;
use infra_core::plugin::Observation;
use infra_core::{Engine, FileStateStore, Plugin, PluginOutcome, StateStore};
use serde_json::json;
use tempfile::tempdir;

#[tokio::test]
async fn state_written_in_one_process_reloads_in_the_next() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    // "Process" one: converge and record
    {
        let system = FakeSystem::with_packages(&["a"]);
        let (plugin, _) = PackagesPlugin::new(&system, &["a", "b"], Observation::LiveProbe);
        let store = FileStateStore::open(&path).await.unwrap();

        let engine = Engine::new(
            host_with_plugins("macbook", vec![Plugin::stateful(plugin)]),
            Box::new(store),
        )
        .unwrap();
        engine.run(&["macbook".to_string()]).await.unwrap();
    }

    // "Process" two: a fresh store sees the same record
    let store = FileStateStore::open(&path).await.unwrap();
    assert_eq!(
        store.get("macbook", "packages").await.unwrap(),
        Some(json!(["a", "b"]))
    );
}

#[tokio::test]
async fn trust_store_plugin_is_noop_after_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let system = FakeSystem::with_packages(&["a", "b"]);

    // First process: no history, live probe, records desired
    {
        let (plugin, counters) = PackagesPlugin::new(&system, &["a", "b"], Observation::TrustStore);
        let store = FileStateStore::open(&path).await.unwrap();
        let engine = Engine::new(
            host_with_plugins("macbook", vec![Plugin::stateful(plugin)]),
            Box::new(store),
        )
        .unwrap();
        engine.run(&["macbook".to_string()]).await.unwrap();
        assert_eq!(counters.currents(), 1);
    }

    // Second process: the reloaded record makes the run free
    let (plugin, counters) = PackagesPlugin::new(&system, &["a", "b"], Observation::TrustStore);
    let store = FileStateStore::open(&path).await.unwrap();
    let engine = Engine::new(
        host_with_plugins("macbook", vec![Plugin::stateful(plugin)]),
        Box::new(store),
    )
    .unwrap();
    let report = engine.run(&["macbook".to_string()]).await.unwrap();

    assert_eq!(counters.currents(), 0);
    assert_eq!(counters.handles(), 0);
    assert_eq!(
        report.host("macbook").unwrap().outcome("packages"),
        Some(&PluginOutcome::Satisfied)
    );
}
