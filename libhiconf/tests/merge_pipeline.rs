//! End-to-end tests: several source files on disk merged into one tree.

use std::fs;
use std::path::PathBuf;

use libhiconf::{diff, merge_sources, remove_empty, ConfigError, MergeOptions, Provenance};
use serde_json::json;
use tempfile::TempDir;

/// Write `files` into a fresh directory and return their paths in order.
fn write_sources(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let paths = files
        .iter()
        .map(|(name, text)| {
            let path = dir.path().join(name);
            fs::write(&path, text).unwrap();
            path
        })
        .collect();
    (dir, paths)
}

#[test]
fn test_layers_across_formats() {
    let (_dir, paths) = write_sources(&[
        (
            "defaults.yml",
            "global:\n  ratio: auto\n  shaders: true\n  bezels: [a, b, c]\nsnes:\n  core: snes9x\n",
        ),
        ("system.json", r#"{"global": {"ratio": "4/3", "@+bezels": ["c", "d"]}}"#),
        ("user.conf", "global.shaders=\nsnes.core=bsnes\n"),
        ("es_settings.cfg", r#"<string name="Language" value="fr_FR" />"#),
    ]);

    let merged = merge_sources(&paths, &MergeOptions::default()).unwrap();
    assert_eq!(
        merged.to_json(),
        json!({
            "global": {"ratio": "4/3", "bezels": ["a", "b", "c", "d"]},
            "snes": {"core": "bsnes"},
            "Language": "fr_FR"
        })
    );

    let ratio = merged.get(&"global.ratio".into()).unwrap();
    assert_eq!(ratio.provenance(), Some(&Provenance::file(&paths[1])));
    let bezels = merged.get(&"global.bezels[0]".into()).unwrap();
    assert_eq!(bezels.provenance(), Some(&Provenance::file(&paths[0])));
}

#[test]
fn test_array_operators_from_files() {
    let (_dir, paths) = write_sources(&[
        ("base.yml", "arr: [2, 3, 4, 5, 6]\n"),
        ("update.json", r#"{"@+arr": ["A", 5, 7, 8], "@-arr": [3, 7]}"#),
    ]);
    let merged = merge_sources(&paths, &MergeOptions::default()).unwrap();
    assert_eq!(merged.to_json(), json!({"arr": [2, 4, 5, 6, "A", 8]}));
}

#[test]
fn test_missing_sources_are_skipped_by_default() {
    let (dir, mut paths) = write_sources(&[("a.conf", "x=1\n")]);
    paths.insert(0, dir.path().join("absent.yml"));
    let merged = merge_sources(&paths, &MergeOptions::default()).unwrap();
    assert_eq!(merged.to_json(), json!({"x": 1}));
}

#[test]
fn test_missing_sources_fail_in_strict_mode() {
    let (dir, mut paths) = write_sources(&[("a.conf", "x=1\n")]);
    let absent = dir.path().join("absent.yml");
    paths.push(absent.clone());
    let options = MergeOptions {
        strict_missing: true,
        ..MergeOptions::default()
    };
    match merge_sources(&paths, &options) {
        Err(ConfigError::MissingSource { path }) => assert_eq!(path, absent),
        other => panic!("expected a missing source error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_extension_is_an_error() {
    let (_dir, paths) = write_sources(&[("notes.txt", "x=1\n")]);
    let err = merge_sources(&paths, &MergeOptions::default()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn test_keep_empty_preserves_empty_maps() {
    let (_dir, paths) = write_sources(&[
        ("a.json", r#"{"section": {"k": 1}}"#),
        ("b.json", r#"{"section": {}, "fresh": {}}"#),
    ]);
    let dropped = merge_sources(&paths, &MergeOptions::default()).unwrap();
    assert_eq!(dropped.to_json(), json!({}));

    let options = MergeOptions {
        keep_empty: true,
        ..MergeOptions::default()
    };
    let kept = merge_sources(&paths, &options).unwrap();
    assert_eq!(kept.to_json(), json!({"section": {"k": 1}, "fresh": {}}));
    assert!(remove_empty(&kept).is_some());
    assert_eq!(remove_empty(&kept).unwrap().to_json(), json!({"section": {"k": 1}}));
}

#[test]
fn test_diff_of_layers() {
    let (_dir, paths) = write_sources(&[
        ("base.yml", "a:\n  b: 1\n  c: 2\n"),
        ("user.conf", "a.c=3\nd=new\n"),
    ]);
    let base = merge_sources(&paths[..1], &MergeOptions::default()).unwrap();
    let full = merge_sources(&paths, &MergeOptions::default()).unwrap();
    assert_eq!(diff(&base, &full).unwrap().to_json(), json!({"a": {"c": 3}, "d": "new"}));
}
