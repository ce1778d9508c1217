//! Registry and handle behaviour: identity, recording, labels, and
//! concurrent first registration.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use dnmetrics_core::{Histogram, LabelSet};
use dnmetrics_registry::config::{MismatchPolicy, RegistryConfig};
use dnmetrics_registry::{new_shared_registry, MetricRegistry};

fn rejecting() -> MetricRegistry {
    let mut cfg = RegistryConfig::default();
    cfg.registry.schema_mismatch = MismatchPolicy::Reject;
    MetricRegistry::from_config(&cfg).unwrap()
}

#[test]
fn same_name_shares_one_histogram() {
    let registry = MetricRegistry::new();
    let first = registry
        .create_or_get_handle("get_feed", "feed latency", &["kind"])
        .unwrap();
    let second = registry
        .create_or_get_handle("get_feed", "another description", &["other", "labels"])
        .unwrap();

    assert!(Histogram::ptr_eq(first.histogram(), second.histogram()));
    assert_eq!(registry.len(), 1);
    // first writer wins
    assert_eq!(second.histogram().help(), "feed latency");
    assert_eq!(second.histogram().label_names(), &["kind".to_string()]);
}

#[test]
fn distinct_names_get_distinct_histograms() {
    let registry = MetricRegistry::new();
    let a = registry.create_or_get_handle("a", "a", &[]).unwrap();
    let b = registry.create_or_get_handle("b", "b", &[]).unwrap();

    assert!(!Histogram::ptr_eq(a.histogram(), b.histogram()));
    assert_eq!(
        registry.names(),
        vec!["audius_dn_a".to_string(), "audius_dn_b".to_string()]
    );
}

#[test]
fn names_are_namespaced() {
    let registry = MetricRegistry::new();
    let handle = registry.create_or_get_handle("get_saves", "saves", &[]).unwrap();

    assert_eq!(handle.name(), "audius_dn_get_saves");
    assert_eq!(registry.fully_qualified("get_saves"), "audius_dn_get_saves");
    assert!(registry.get("get_saves").is_some());
    assert!(registry.get("audius_dn_get_saves").is_none());
}

#[test]
fn elapsed_is_non_negative_and_non_decreasing() {
    let registry = MetricRegistry::new();
    let handle = registry.create_or_get_handle("timer", "t", &[]).unwrap();

    let mut last = handle.elapsed();
    assert!(last >= 0.0);
    for _ in 0..5 {
        thread::sleep(Duration::from_millis(1));
        let now = handle.elapsed();
        assert!(now >= last);
        last = now;
    }
    assert!(last >= 0.005);
}

#[test]
fn unlabeled_record_adds_one_count_and_the_value() {
    let registry = MetricRegistry::new();
    let handle = registry.create_or_get_handle("plain", "plain", &[]).unwrap();

    handle.record(0.42, None).unwrap();
    let snap = handle.histogram().snapshot();
    assert_eq!(snap.count, 1);
    assert!((snap.sum - 0.42).abs() < 1e-12);

    // empty label sets count as absent
    handle.record(0.08, Some(&LabelSet::new())).unwrap();
    let snap = handle.histogram().snapshot();
    assert_eq!(snap.count, 2);
    assert!((snap.sum - 0.5).abs() < 1e-12);
}

#[test]
fn labeled_record_only_touches_its_series() {
    let registry = MetricRegistry::new();
    let handle = registry.create_or_get_handle("labeled", "l", &["k"]).unwrap();
    let labels = LabelSet::from([("k", "v")]);

    handle.record(1.5, Some(&labels)).unwrap();

    let family = handle.histogram().family_snapshot();
    assert_eq!(family.unlabeled.count, 0);
    assert_eq!(family.series(&labels).unwrap().count, 1);
    assert_eq!(family.total_count(), 1);
}

#[test]
fn request_duration_scenario() {
    let registry = new_shared_registry(&RegistryConfig::default()).unwrap();
    let a = LabelSet::from([("route", "/a")]);
    let b = LabelSet::from([("route", "/b")]);

    for labels in [&a, &a, &b] {
        let handle = registry
            .create_or_get_handle("request_duration", "request latency", &["route"])
            .unwrap();
        handle.record_elapsed(Some(labels)).unwrap();
    }

    let hist = registry.get("request_duration").unwrap();
    assert_eq!(hist.series_snapshot(&a).unwrap().unwrap().count, 2);
    assert_eq!(hist.series_snapshot(&b).unwrap().unwrap().count, 1);
    assert_eq!(hist.family_snapshot().total_count(), 3);
}

#[test]
fn label_mismatch_records_nothing() {
    let registry = MetricRegistry::new();
    let handle = registry
        .create_or_get_handle("strict_labels", "s", &["route"])
        .unwrap();

    let wrong = LabelSet::from([("path", "/a")]);
    let err = handle.record(1.0, Some(&wrong)).expect_err("wrong key");
    assert_eq!(err.code().as_str(), "LABEL_MISMATCH");

    let err = handle.record(1.0, None).expect_err("labels required");
    assert_eq!(err.code().as_str(), "LABEL_MISMATCH");

    assert_eq!(handle.histogram().family_snapshot().total_count(), 0);
}

#[test]
fn nan_is_propagated() {
    let registry = MetricRegistry::new();
    let handle = registry.create_or_get_handle("nan", "n", &[]).unwrap();
    let err = handle.record(f64::NAN, None).expect_err("nan rejected");
    assert_eq!(err.code().as_str(), "INVALID_VALUE");
}

#[test]
fn reject_policy_surfaces_schema_conflict() {
    let registry = rejecting();
    registry.create_or_get_handle("conflict", "c", &["a"]).unwrap();

    let err = registry
        .create_or_get_handle("conflict", "c", &["b"])
        .expect_err("schema differs");
    assert_eq!(err.code().as_str(), "SCHEMA_CONFLICT");

    // same schema, different description is fine
    registry
        .create_or_get_handle("conflict", "changed help", &["a"])
        .unwrap();
    assert_eq!(registry.len(), 1);
}

#[test]
fn invalid_names_register_nothing() {
    let registry = MetricRegistry::new();

    let err = registry.create_or_get_handle("", "empty", &[]).expect_err("empty");
    assert_eq!(err.code().as_str(), "INVALID_NAME");

    let err = registry
        .create_or_get_handle("has-dash", "dash", &[])
        .expect_err("dash");
    assert_eq!(err.code().as_str(), "INVALID_NAME");

    let err = registry
        .create_or_get_handle("bucketed", "reserved label", &["le"])
        .expect_err("le is reserved");
    assert_eq!(err.code().as_str(), "INVALID_NAME");

    assert!(registry.is_empty());
}

#[test]
fn concurrent_first_registration_yields_one_histogram() {
    const THREADS: usize = 16;

    let registry = Arc::new(MetricRegistry::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let handle = registry.create_or_get_handle("x", "race", &[]).unwrap();
                handle.record(1.0, None).unwrap();
                handle.histogram().clone()
            })
        })
        .collect();

    let hists: Vec<Histogram> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert_eq!(registry.len(), 1);
    let registered = registry.get("x").unwrap();
    for h in &hists {
        assert!(Histogram::ptr_eq(h, &registered));
    }
    assert_eq!(registered.snapshot().count, THREADS as u64);
}

#[test]
fn registry_snapshot_is_sorted() {
    let registry = MetricRegistry::new();
    registry.create_or_get_handle("zeta", "z", &[]).unwrap();
    registry.create_or_get_handle("alpha", "a", &[]).unwrap();

    let names: Vec<String> = registry.snapshot().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["audius_dn_alpha", "audius_dn_zeta"]);

    let json = serde_json::to_string(&registry.snapshot()).unwrap();
    assert!(json.contains("audius_dn_alpha"));
}
