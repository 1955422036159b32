// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! End-to-end scenario: repeated commits of a modest tree stay within a
//! sane latency envelope, and the percentile ladder is well-formed.

use helios_engine::Engine;
use test_log::test;

#[test]
fn repeated_commits_report_finite_well_ordered_percentiles() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = Engine::open(dir.path()).expect("open");

    for path_index in 0..100 {
        engine
            .write_file(&format!("file_{path_index}.bin"), vec![0u8; 1024])
            .expect("write");
    }
    engine.commit(None).expect("initial commit");

    for round in 0..20 {
        for path_index in 0..100 {
            let mut bytes = vec![0u8; 1024];
            bytes[0] = round as u8;
            engine
                .write_file(&format!("file_{path_index}.bin"), bytes)
                .expect("write");
        }
        engine.commit(None).expect("commit");
    }

    let stats = engine.stats();
    assert!(stats.engine.p50 > 0, "p50 should be a recorded, non-zero microsecond value");
    assert!(stats.engine.p99 >= stats.engine.p50);
    assert!(
        stats.engine.p99 <= stats.engine.p50.saturating_mul(10) + 1,
        "p99 ({}) should stay within roughly one order of magnitude of p50 ({})",
        stats.engine.p99,
        stats.engine.p50
    );
}
