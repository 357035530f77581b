use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::*;
use crate::cache::CacheConfig;
use crate::commands::status::format_size;
use crate::value::Value;

fn quiet() -> Logger {
    Logger::new(0, true)
}

fn open(dir: &Path) -> CacheManager {
    CacheManager::open(
        CacheConfig::builder()
            .cache_dir(dir.join("cache"))
            .quiet(true)
            .build()
            .unwrap(),
    )
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Simulates a finished build session: two files parsed, one edge, saved.
fn warm_cache(dir: &Path) -> (PathBuf, PathBuf) {
    let main = write(dir, "main.rb", "require 'util'");
    let util = write(dir, "util.rb", "def helper; end");

    let cache = open(dir);
    cache.put_ast(&main, Value::symbol("program")).unwrap();
    cache.put_ast(&util, Value::symbol("program")).unwrap();
    cache.add_dependency(&main, &util).unwrap();
    cache.save_manifest().unwrap();

    (main, util)
}

#[test]
fn test_status_cold() {
    let temp_dir = TempDir::new().unwrap();
    let stats = status(&open(temp_dir.path()), &quiet()).unwrap();

    assert_eq!(stats.cached_files, 0);
    assert_eq!(stats.manifest_bytes, None);
}

#[test]
fn test_status_warm() {
    let temp_dir = TempDir::new().unwrap();
    warm_cache(temp_dir.path());

    let stats = status(&open(temp_dir.path()), &quiet()).unwrap();

    assert_eq!(stats.cached_files, 2);
    assert_eq!(stats.artifacts, 2);
    assert_eq!(stats.dependency_edges, 1);
    assert!(stats.manifest_bytes.is_some());
}

#[test]
fn test_check_command() {
    let temp_dir = TempDir::new().unwrap();
    let (main, util) = warm_cache(temp_dir.path());
    write(temp_dir.path(), "util.rb", "def helper; 1; end");
    let fresh = write(temp_dir.path(), "fresh.rb", "puts 1");

    let changes = check(&open(temp_dir.path()), &[main, util, fresh], &quiet()).unwrap();

    assert_eq!(changes.unchanged_files.len(), 1);
    assert_eq!(changes.modified_files.len(), 1);
    assert_eq!(changes.new_files.len(), 1);
    assert!(changes.missing_files.is_empty());
}

#[test]
fn test_order_command() {
    let temp_dir = TempDir::new().unwrap();
    let (main, util) = warm_cache(temp_dir.path());

    let order = order(&open(temp_dir.path()), &[util.clone()], &quiet()).unwrap();

    assert_eq!(order.len(), 2);
    assert!(order[0] == util);
    assert!(order[1] == main);
}

#[test]
fn test_order_without_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("lonely.rb");

    let order = order(&open(temp_dir.path()), &[file.clone()], &quiet()).unwrap();

    assert_eq!(order.len(), 1);
    assert!(order[0] == file);
}

#[test]
fn test_clean_command() {
    let temp_dir = TempDir::new().unwrap();
    warm_cache(temp_dir.path());

    let cache = open(temp_dir.path());
    assert!(cache.cache_exists());

    clean(&cache, &quiet()).unwrap();
    assert!(!cache.cache_exists());
    assert!(cache.cached_files().is_empty());

    // Nothing left to clean
    clean(&cache, &quiet()).unwrap();
    assert!(temp_dir.path().join("cache").exists());
}

#[test]
fn test_execute_dispatch() {
    let temp_dir = TempDir::new().unwrap();
    warm_cache(temp_dir.path());
    let cache_dir = temp_dir.path().join("cache");

    let cli = Cli::builder()
        .cache_dir(&cache_dir)
        .quiet(true)
        .command(Commands::Status)
        .build()
        .unwrap();
    execute(&cli).unwrap();

    let cli = Cli::builder()
        .cache_dir(&cache_dir)
        .quiet(true)
        .command(Commands::Clean)
        .build()
        .unwrap();
    execute(&cli).unwrap();

    assert!(!cache_dir.join("manifest.bin").exists());
}

#[test]
fn test_execute_rejects_empty_cache_dir() {
    let cli = Cli::builder()
        .cache_dir("")
        .quiet(true)
        .command(Commands::Status)
        .build()
        .unwrap();
    assert!(execute(&cli).is_err());
}

#[test]
fn test_format_size() {
    assert_eq!(format_size(0), "0 B");
    assert_eq!(format_size(1023), "1023 B");
    assert_eq!(format_size(1024), "1.0 KiB");
    assert_eq!(format_size(1536), "1.5 KiB");
    assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
}
