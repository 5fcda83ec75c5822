//! Tests for the multiqueue-runtime library module.

use super::*;
use serde_json::json;

#[test]
fn test_sub_queue_name_validation() {
    // Valid names
    assert!(SubQueueName::new("orders".to_string()).is_ok());
    assert!(SubQueueName::new("queue_123".to_string()).is_ok());
    assert!(SubQueueName::new("a".to_string()).is_ok());

    // Invalid names
    assert!(SubQueueName::new("".to_string()).is_err());
    assert!(SubQueueName::new("-leading-hyphen".to_string()).is_err());
    assert!(SubQueueName::new("trailing-hyphen-".to_string()).is_err());
    assert!(SubQueueName::new("double--hyphen".to_string()).is_err());
    assert!(SubQueueName::new("special@chars".to_string()).is_err());
}

#[test]
fn test_message_uuid_generation() {
    let uuid1 = MessageUuid::new();
    let uuid2 = MessageUuid::new();
    assert_ne!(uuid1, uuid2);
    assert!(!uuid1.as_str().is_empty());
}

#[test]
fn test_storage_capabilities() {
    assert!(!StorageType::InMemory.assigns_own_indexes());
}

#[test]
fn test_error_classification() {
    assert!(MultiQueueError::DuplicateMessage {
        uuid: "abc".to_string(),
        existing_sub_queue: "orders".to_string(),
    }
    .is_client_error());

    assert!(!MultiQueueError::Storage {
        backend: "InMemory".to_string(),
        message: "unavailable".to_string(),
    }
    .is_client_error());
}

#[tokio::test]
async fn test_factory_builds_working_engine() {
    let engine = MultiQueueFactory::create_test_engine();
    let sub_queue = SubQueueName::new("orders".to_string()).unwrap();

    let stored = engine
        .add(QueueMessage::new(sub_queue.clone(), json!({"item": 1})))
        .await
        .unwrap();

    assert_eq!(stored.index, Some(1));
    assert_eq!(engine.size().await.unwrap(), 1);
    assert!(engine.perform_health_check().await.is_ok());
    assert_eq!(
        engine.authority().restriction_mode(),
        RestrictionMode::None
    );
}
