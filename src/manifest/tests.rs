use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use crate::graph::DependencyGraph;
use crate::hashing::Fingerprint;
use crate::index::{ArtifactIndex, ArtifactKind, StoredArtifact};
use crate::logging::Logger;
use crate::manifest::{
    ArtifactRecord, FileRecord, MANIFEST_FILE, MANIFEST_VERSION, ManifestData, clean_manifest,
    load_manifest, load_manifest_inner, manifest_path, save_manifest,
};
use crate::path::SourcePath;
use crate::value::Value;

const TOOLCHAIN: &str = "0.1.0";

fn quiet() -> Logger {
    Logger::new(0, true)
}

fn src(name: &str) -> SourcePath {
    SourcePath::new(format!("/project/{name}.rb")).unwrap()
}

fn sample_state() -> (ArtifactIndex, DependencyGraph) {
    let mut index = ArtifactIndex::new();
    index.insert(
        src("main"),
        ArtifactKind::Ast,
        StoredArtifact {
            fingerprint: Fingerprint::of_bytes(b"main v1"),
            payload: Arc::new(Value::hash([("type", Value::symbol("program"))])),
        },
    );
    index.insert(
        src("main"),
        ArtifactKind::Types,
        StoredArtifact {
            fingerprint: Fingerprint::of_bytes(b"main v0"),
            payload: Arc::new(Value::hash([("foo", Value::symbol("Integer"))])),
        },
    );

    let mut graph = DependencyGraph::new();
    graph.add_dependency(src("main"), src("util"));
    (index, graph)
}

#[test]
fn test_save_and_load_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let path = manifest_path(temp_dir.path());
    let (index, graph) = sample_state();

    save_manifest(&ManifestData::capture(TOOLCHAIN, &index, &graph), &path).unwrap();
    assert!(path.exists());

    let loaded = load_manifest(&path, TOOLCHAIN, &quiet());
    assert_eq!(loaded.version, MANIFEST_VERSION);
    assert_eq!(loaded.len(), 1);

    let (restored_index, restored_graph) = loaded.restore(&quiet()).unwrap();
    assert_eq!(restored_index.artifact_count(), 2);
    let ast = restored_index.get(&src("main"), ArtifactKind::Ast).unwrap();
    assert_eq!(ast.fingerprint, Fingerprint::of_bytes(b"main v1"));
    assert_eq!(ast.payload.get("type"), Some(&Value::symbol("program")));
    let types = restored_index.get(&src("main"), ArtifactKind::Types).unwrap();
    assert_eq!(types.fingerprint, Fingerprint::of_bytes(b"main v0"));
    assert!(restored_graph.has_dependencies(&src("main")));
    assert!(restored_graph.direct_dependents(&src("util")).contains(&src("main")));
}

#[test]
fn test_load_nonexistent_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let path = manifest_path(temp_dir.path());

    assert!(load_manifest_inner(&path).unwrap().is_none());
    assert!(load_manifest(&path, TOOLCHAIN, &quiet()).is_empty());
}

#[test]
fn test_load_empty_file_is_cold() {
    let temp_dir = TempDir::new().unwrap();
    let path = manifest_path(temp_dir.path());
    fs::write(&path, b"").unwrap();

    assert!(load_manifest_inner(&path).unwrap().is_none());
}

#[test]
fn test_corrupt_manifest_recovery() {
    let temp_dir = TempDir::new().unwrap();
    let path = manifest_path(temp_dir.path());
    let invalid_data = b"this is not valid rkyv data and should cause deserialization to fail";
    fs::write(&path, invalid_data).unwrap();

    let manifest = load_manifest(&path, TOOLCHAIN, &quiet());
    assert!(manifest.is_empty());
    assert_eq!(manifest.version, MANIFEST_VERSION);

    // The corrupt file is removed during recovery
    assert!(!path.exists());
}

#[test]
fn test_truncated_manifest_recovery() {
    let temp_dir = TempDir::new().unwrap();
    let path = manifest_path(temp_dir.path());
    let (index, graph) = sample_state();
    save_manifest(&ManifestData::capture(TOOLCHAIN, &index, &graph), &path).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    assert!(load_manifest(&path, TOOLCHAIN, &quiet()).is_empty());
}

#[test]
fn test_other_toolchain_version_is_cold() {
    let temp_dir = TempDir::new().unwrap();
    let path = manifest_path(temp_dir.path());
    let (index, graph) = sample_state();
    save_manifest(&ManifestData::capture("0.0.9", &index, &graph), &path).unwrap();

    let manifest = load_manifest(&path, TOOLCHAIN, &quiet());
    assert!(manifest.is_empty());
    assert_eq!(manifest.toolchain_version, TOOLCHAIN);
    // Left in place; the next save replaces it
    assert!(path.exists());
}

#[test]
fn test_future_format_version_is_cold() {
    let temp_dir = TempDir::new().unwrap();
    let path = manifest_path(temp_dir.path());
    let mut future = ManifestData::new(TOOLCHAIN);
    future.version = MANIFEST_VERSION + 1;
    future.files.insert(src("a").as_str().to_string(), FileRecord::default());
    save_manifest(&future, &path).unwrap();

    assert!(load_manifest(&path, TOOLCHAIN, &quiet()).is_empty());
}

#[test]
fn test_malformed_fingerprint_is_dropped_on_restore() {
    let mut manifest = ManifestData::new(TOOLCHAIN);
    manifest.files.insert(
        src("a").as_str().to_string(),
        FileRecord {
            artifacts: vec![
                ArtifactRecord {
                    kind: ArtifactKind::Ast,
                    fingerprint: "not-a-digest".to_string(),
                    payload: Value::Nil,
                },
                ArtifactRecord {
                    kind: ArtifactKind::Types,
                    fingerprint: Fingerprint::of_bytes(b"a").as_str().to_string(),
                    payload: Value::Nil,
                },
            ],
        },
    );

    let (index, _) = manifest.restore(&quiet()).unwrap();
    assert!(index.get(&src("a"), ArtifactKind::Ast).is_none());
    assert!(index.get(&src("a"), ArtifactKind::Types).is_some());
}

#[test]
fn test_atomic_save_leaves_no_temp_files() {
    let temp_dir = TempDir::new().unwrap();
    let path = manifest_path(temp_dir.path());

    save_manifest(&ManifestData::new(TOOLCHAIN), &path).unwrap();
    save_manifest(&ManifestData::new(TOOLCHAIN), &path).unwrap();

    let names: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![MANIFEST_FILE.to_string()]);
}

#[test]
fn test_save_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("deeply").join("nested").join("cache");
    let path = manifest_path(&nested);

    save_manifest(&ManifestData::new(TOOLCHAIN), &path).unwrap();
    assert!(path.exists());
}

#[test]
#[cfg(unix)]
fn test_save_into_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    fs::write(&blocker, "file in the way").unwrap();

    let result = save_manifest(&ManifestData::new(TOOLCHAIN), &manifest_path(&blocker));
    assert!(result.is_err());
}

#[test]
fn test_clean_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let path = manifest_path(temp_dir.path());
    save_manifest(&ManifestData::new(TOOLCHAIN), &path).unwrap();
    let leftover = temp_dir.path().join(format!("{MANIFEST_FILE}.999.0.tmp"));
    fs::write(&leftover, "partial").unwrap();
    let unrelated = temp_dir.path().join("keep.txt");
    fs::write(&unrelated, "keep").unwrap();

    clean_manifest(&path).unwrap();
    assert!(!path.exists());
    assert!(!leftover.exists());
    assert!(unrelated.exists());

    // Cleaning again should not error
    clean_manifest(&path).unwrap();
}
