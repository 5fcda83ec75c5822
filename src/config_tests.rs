//! Tests for configuration types.

use super::*;

#[test]
fn test_default_config_uses_in_memory_storage() {
    let config = MultiQueueConfig::default();

    assert!(matches!(config.storage, StorageConfig::InMemory(_)));
    assert_eq!(config.restriction_mode, RestrictionMode::None);
}

#[test]
fn test_default_in_memory_capacity() {
    let config = InMemoryConfig::default();
    assert_eq!(config.max_sub_queue_size, 10_000);
}

#[test]
fn test_config_serde_round_trip() {
    let config = MultiQueueConfig {
        storage: StorageConfig::InMemory(InMemoryConfig {
            max_sub_queue_size: 500,
        }),
        restriction_mode: RestrictionMode::Hybrid,
    };

    let encoded = serde_json::to_string(&config).unwrap();
    let decoded: MultiQueueConfig = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded.restriction_mode, RestrictionMode::Hybrid);
    let StorageConfig::InMemory(memory) = decoded.storage;
    assert_eq!(memory.max_sub_queue_size, 500);
}
