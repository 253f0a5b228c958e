//! Tests for cache backends

use fanout_executor::infra::{Cache, FileCache, MemoryCache};
use fanout_executor::util::TenantContext;
use std::path::PathBuf;
use std::time::Duration;

fn temp_cache_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("fanout-cache-{}", uuid::Uuid::new_v4()))
        .join("budgets.json")
}

#[test]
fn test_memory_cache_roundtrip_and_invalidate() {
    let cache: MemoryCache<Vec<u32>> = MemoryCache::new();
    assert!(cache.get("acme:budgets").is_none());

    cache.set("acme:budgets", vec![1, 2]).unwrap();
    let cached = cache.get("acme:budgets").unwrap();
    assert_eq!(cached.value, vec![1, 2]);
    assert!(!cached.is_stale);
    assert_eq!(cache.len(), 1);

    cache.invalidate("acme:budgets").unwrap();
    assert!(cache.get("acme:budgets").is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_memory_cache_marks_expired_entries_stale() {
    let cache = MemoryCache::with_ttl(Duration::from_millis(20));
    cache.set("k", "v".to_string()).unwrap();
    std::thread::sleep(Duration::from_millis(40));
    let cached = cache.get("k").unwrap();
    assert_eq!(cached.value, "v");
    assert!(cached.is_stale);
}

#[test]
fn test_file_cache_persists_across_instances() {
    let path = temp_cache_path();
    let tenant = TenantContext::new("ACME");
    let key = tenant.scoped_key("budgets");

    let cache: FileCache<Vec<String>> = FileCache::new(&path);
    cache.set(&key, vec!["b1".to_string(), "b2".to_string()]).unwrap();
    assert!(path.is_file());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened: FileCache<Vec<String>> = FileCache::new(&path);
    let cached = reopened.get(&key).unwrap();
    assert_eq!(cached.value, vec!["b1", "b2"]);
    assert!(!cached.is_stale);
    assert!(reopened.get("default:budgets").is_none());

    reopened.invalidate(&key).unwrap();
    assert!(cache.get(&key).is_none());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_file_cache_treats_corrupt_file_as_empty() {
    let path = temp_cache_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{not json").unwrap();

    let cache: FileCache<u32> = FileCache::new(&path);
    assert!(cache.get("k").is_none());
    cache.set("k", 7).unwrap();
    assert_eq!(cache.get("k").unwrap().value, 7);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_file_cache_ttl_marks_stale() {
    let path = temp_cache_path();
    let cache: FileCache<u32> = FileCache::new(&path).with_ttl(Duration::ZERO);
    cache.set("k", 1).unwrap();
    assert!(cache.get("k").unwrap().is_stale);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
