use std::sync::Arc;

use crate::hashing::Fingerprint;
use crate::index::{ArtifactIndex, ArtifactKind, StoredArtifact};
use crate::path::SourcePath;
use crate::value::Value;

fn src(name: &str) -> SourcePath {
    SourcePath::new(format!("/project/{name}.rb")).unwrap()
}

fn artifact(content: &[u8], payload: Value) -> StoredArtifact {
    StoredArtifact {
        fingerprint: Fingerprint::of_bytes(content),
        payload: Arc::new(payload),
    }
}

#[test]
fn test_index_operations() {
    let mut index = ArtifactIndex::new();
    assert!(index.is_empty());

    index.insert(src("main"), ArtifactKind::Ast, artifact(b"v1", Value::symbol("program")));
    index.insert(src("main"), ArtifactKind::Types, artifact(b"v1", Value::symbol("int")));
    index.insert(src("util"), ArtifactKind::Ast, artifact(b"u1", Value::Nil));

    assert_eq!(index.len(), 2);
    assert_eq!(index.artifact_count(), 3);
    assert!(index.contains(&src("main")));

    let stored = index.get(&src("main"), ArtifactKind::Types).unwrap();
    assert_eq!(*stored.payload, Value::symbol("int"));
    assert!(index.get(&src("util"), ArtifactKind::Types).is_none());
}

#[test]
fn test_insert_overwrites_same_kind() {
    let mut index = ArtifactIndex::new();
    index.insert(src("main"), ArtifactKind::Ast, artifact(b"v1", Value::from(1_i64)));
    index.insert(src("main"), ArtifactKind::Ast, artifact(b"v2", Value::from(2_i64)));

    let stored = index.get(&src("main"), ArtifactKind::Ast).unwrap();
    assert_eq!(stored.fingerprint, Fingerprint::of_bytes(b"v2"));
    assert_eq!(*stored.payload, Value::from(2_i64));
    assert_eq!(index.artifact_count(), 1);
}

#[test]
fn test_evicting_last_kind_drops_file() {
    let mut index = ArtifactIndex::new();
    index.insert(src("main"), ArtifactKind::Ast, artifact(b"v1", Value::Nil));
    index.insert(src("main"), ArtifactKind::Types, artifact(b"v1", Value::Nil));

    assert!(index.evict(&src("main"), ArtifactKind::Ast).is_some());
    assert!(index.contains(&src("main")));
    assert!(index.evict(&src("main"), ArtifactKind::Types).is_some());
    assert!(!index.contains(&src("main")));
    assert!(index.evict(&src("main"), ArtifactKind::Types).is_none());
}

#[test]
fn test_evict_if_stale_requires_matching_fingerprint() {
    let mut index = ArtifactIndex::new();
    index.insert(src("main"), ArtifactKind::Ast, artifact(b"fresh", Value::Nil));

    assert!(!index.evict_if_stale(&src("main"), ArtifactKind::Ast, &Fingerprint::of_bytes(b"old")));
    assert!(index.contains(&src("main")));

    assert!(index.evict_if_stale(&src("main"), ArtifactKind::Ast, &Fingerprint::of_bytes(b"fresh")));
    assert!(!index.contains(&src("main")));
}

#[test]
fn test_evict_all_and_clear() {
    let mut index = ArtifactIndex::new();
    index.insert(src("a"), ArtifactKind::Ast, artifact(b"a", Value::Nil));
    index.insert(src("a"), ArtifactKind::Types, artifact(b"a", Value::Nil));
    index.insert(src("b"), ArtifactKind::Ast, artifact(b"b", Value::Nil));

    assert!(index.evict_all(&src("a")));
    assert!(!index.evict_all(&src("a")));
    assert_eq!(index.files().into_iter().collect::<Vec<_>>(), vec![src("b")]);

    index.clear();
    assert!(index.is_empty());
    assert_eq!(index.iter().count(), 0);
}

#[test]
fn test_kind_names() {
    assert_eq!(ArtifactKind::Ast.to_string(), "ast");
    assert_eq!(ArtifactKind::Types.as_str(), "types");
    assert_eq!(ArtifactKind::ALL.len(), 2);
}
