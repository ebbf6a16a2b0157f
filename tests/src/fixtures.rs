//! Runs every JSON fixture directory under `fixtures/` through the harness
//! loader and the rewriter, comparing against the expected images.

use reslot_cli::fixture::{apply_fixture, check_fixture};
use std::path::PathBuf;

fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn fixture_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(fixtures_root())
        .expect("fixtures directory exists")
        .map(|entry| entry.expect("readable entry").path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

#[test]
fn every_fixture_produces_its_expected_image() {
    let dirs = fixture_dirs();
    assert!(!dirs.is_empty(), "no fixture directories found");

    for dir in dirs {
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        match check_fixture(&dir) {
            Ok(None) => {}
            Ok(Some(diff)) => panic!("fixture {name}: {diff}"),
            Err(err) => panic!("fixture {name}: {err}"),
        }
    }
}

#[test]
fn fixture_results_contain_no_zero_slots() {
    for dir in fixture_dirs() {
        let backend = apply_fixture(&dir).expect("fixture applies");
        assert!(
            backend
                .image()
                .values()
                .all(|value| *value != alloy::primitives::B256::ZERO),
            "zero-valued slot leaked in {}",
            dir.display()
        );
    }
}
