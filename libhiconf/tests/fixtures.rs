//! Test harness for the source parsers against fixture files.
//!
//! Every file under test/fixtures/sources/ is parsed with the parser its
//! extension selects and compared against test/fixtures/expected/<stem>.json.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use libhiconf::{parse_file, FlatValue, HierarchicKey, Node, Provenance};

/// Root fixture directory.
fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("test")
        .join("fixtures")
}

/// All source fixtures, sorted.
fn source_files() -> Vec<PathBuf> {
    let pattern = fixtures_root().join("sources").join("*");
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .expect("valid glob pattern")
        .flatten()
        .collect();
    files.sort();
    files
}

/// Read the expected tree for a source fixture.
fn read_expected(source: &Path) -> Result<serde_json::Value, String> {
    let stem = source.file_stem().unwrap().to_string_lossy();
    let path = fixtures_root().join("expected").join(format!("{}.json", stem));
    let text = fs::read_to_string(&path)
        .map_err(|e| format!("{}: cannot read expectation: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

fn run_fixture(source: &Path) -> Result<Node, String> {
    let node = parse_file(source).map_err(|e| format!("{}: {}", source.display(), e))?;
    let expected = read_expected(source)?;
    let actual = node.to_json();
    if actual != expected {
        return Err(format!(
            "{}: mismatch\n    expected: {}\n    actual:   {}",
            source.display(),
            expected,
            actual
        ));
    }
    Ok(node)
}

/// Run `check` on every fixture, reporting all failures at once.
fn for_each_fixture(check: impl Fn(&Path) -> Result<(), String>) {
    let files = source_files();
    assert!(!files.is_empty(), "no fixtures under {}", fixtures_root().display());

    let errors: Vec<String> = files.iter().filter_map(|f| check(f).err()).collect();

    println!(
        "\nResults: {} passed, {} failed",
        files.len() - errors.len(),
        errors.len()
    );
    for error in &errors {
        println!("  - {}", error);
    }
    assert!(errors.is_empty(), "{} fixtures failed", errors.len());
}

#[test]
fn test_all_source_fixtures() {
    for_each_fixture(|source| run_fixture(source).map(|_| ()));
}

#[test]
fn test_every_expectation_has_a_source() {
    let stems: BTreeSet<String> = source_files()
        .iter()
        .map(|p| p.file_stem().unwrap().to_string_lossy().into_owned())
        .collect();
    let pattern = fixtures_root().join("expected").join("*.json");
    for expected in glob::glob(&pattern.to_string_lossy()).unwrap().flatten() {
        let stem = expected.file_stem().unwrap().to_string_lossy().into_owned();
        assert!(stems.contains(&stem), "orphan expectation {}", expected.display());
    }
}

#[test]
fn test_fixture_scalars_carry_file_provenance() {
    for_each_fixture(|source| {
        let node = run_fixture(source)?;
        let expected = Provenance::file(source);
        for (path, value) in node.implode() {
            if let FlatValue::Scalar(scalar) = value {
                if scalar.provenance != expected {
                    return Err(format!("{}: {} tagged {}", source.display(), path, scalar.provenance));
                }
            }
        }
        Ok(())
    });
}

#[test]
fn test_fixture_paths_round_trip() {
    for_each_fixture(|source| {
        let node = run_fixture(source)?;
        let enumerated: BTreeSet<String> =
            node.leaf_paths().map(|p| p.key().to_string()).collect();
        let imploded: BTreeSet<String> = node.implode().keys().cloned().collect();
        if enumerated != imploded {
            return Err(format!("{}: leaf paths and implode disagree", source.display()));
        }
        for path in &imploded {
            if node.lookup(&HierarchicKey::parse(path)).is_none() {
                return Err(format!("{}: {} does not resolve", source.display(), path));
            }
        }
        Ok(())
    });
}
